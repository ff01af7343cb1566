//! Payload codec: typed operation <-> record with JSON `data`.
//!
//! The type tag is checked before the payload is touched, so a record of
//! one kind is never parsed as the payload of another.

use opstore_core::{OperationData, TypedOperation};

use super::mapper;
use super::record::OperationRecord;
use crate::error::StoreError;

/// Converts a typed operation into its record, serializing the payload.
///
/// # Errors
///
/// - [`StoreError::TypeMismatch`] if the envelope's type tag is not `D::TYPE`.
/// - [`StoreError::InvalidOperation`] if the orchestration id is missing for
///   an orchestrated kind, or present for one that is not.
/// - [`StoreError::Codec`] if the payload cannot be serialized.
pub fn encode<D: OperationData>(
    operation: &TypedOperation<D>,
) -> Result<OperationRecord, StoreError> {
    let envelope = &operation.operation;
    if envelope.operation_type != D::TYPE {
        return Err(StoreError::TypeMismatch {
            id: envelope.id.clone(),
            expected: D::TYPE,
            actual: envelope.operation_type,
        });
    }
    match (D::ORCHESTRATED, envelope.orchestration_id.is_some()) {
        (true, false) => {
            return Err(StoreError::InvalidOperation {
                id: envelope.id.clone(),
                reason: format!("{} operations require an orchestration id", D::TYPE),
            });
        }
        (false, true) => {
            return Err(StoreError::InvalidOperation {
                id: envelope.id.clone(),
                reason: format!("{} operations do not belong to an orchestration", D::TYPE),
            });
        }
        _ => {}
    }

    let data = serde_json::to_string(&operation.data).map_err(|err| StoreError::Codec {
        id: envelope.id.clone(),
        reason: format!("while serializing {} data: {err}", D::TYPE),
    })?;

    let mut record = mapper::to_record(envelope);
    record.operation_type = D::TYPE;
    record.data = data;
    Ok(record)
}

/// Converts a record back into a typed operation of kind `D`.
///
/// # Errors
///
/// - [`StoreError::TypeMismatch`] if the record's type tag is not `D::TYPE`.
/// - [`StoreError::Codec`] if `data` does not parse as `D`, or the stored
///   state is unknown.
pub fn decode<D: OperationData>(
    record: &OperationRecord,
) -> Result<TypedOperation<D>, StoreError> {
    if record.operation_type != D::TYPE {
        return Err(StoreError::TypeMismatch {
            id: record.id.clone(),
            expected: D::TYPE,
            actual: record.operation_type,
        });
    }

    let mut data: D = serde_json::from_str(&record.data).map_err(|err| StoreError::Codec {
        id: record.id.clone(),
        reason: format!("unable to unmarshal {} data: {err}", D::TYPE),
    })?;
    let operation = mapper::from_record(record)?;
    data.attach(&operation);

    Ok(TypedOperation { operation, data })
}

/// Decodes every record as kind `D`, failing on the first that does not fit.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_all<D: OperationData>(
    records: &[OperationRecord],
) -> Result<Vec<TypedOperation<D>>, StoreError> {
    records.iter().map(decode).collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use opstore_core::{
        DeprovisioningData, OperationState, OperationType, ProvisioningData,
        ProvisioningParameters, RuntimeOperation, UpgradeKymaData,
    };
    use proptest::prelude::*;

    use super::*;
    use crate::error::ErrorKind;

    fn provisioning() -> TypedOperation<ProvisioningData> {
        TypedOperation::new(
            "op-1",
            "inst-1",
            ProvisioningData {
                parameters: ProvisioningParameters {
                    plan_id: "azure".to_string(),
                    name: "my-runtime".to_string(),
                    ..ProvisioningParameters::default()
                },
                ..ProvisioningData::default()
            },
        )
    }

    #[test]
    fn encode_stamps_type_and_payload() {
        let record = encode(&provisioning()).unwrap();
        assert_eq!(record.operation_type, OperationType::Provision);
        let json: serde_json::Value = serde_json::from_str(&record.data).unwrap();
        assert_eq!(json["parameters"]["planId"], "azure");
    }

    #[test]
    fn decode_rejects_other_kind() {
        let record = encode(&provisioning()).unwrap();
        let err = decode::<DeprovisioningData>(&record).unwrap_err();
        assert!(matches!(
            err,
            StoreError::TypeMismatch {
                expected: OperationType::Deprovision,
                actual: OperationType::Provision,
                ..
            }
        ));
    }

    #[test]
    fn decode_checks_type_before_data() {
        let mut record = encode(&provisioning()).unwrap();
        record.data = "not json".to_string();
        let err = decode::<UpgradeKymaData>(&record).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn unparseable_data_is_codec_error() {
        let mut record = encode(&provisioning()).unwrap();
        record.data = "{\"parameters\": 42}".to_string();
        let err = decode::<ProvisioningData>(&record).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Codec);
        assert!(err.to_string().contains("op-1"));
    }

    #[test]
    fn encode_rejects_envelope_of_other_kind() {
        let mut op = provisioning();
        op.operation_type = OperationType::Deprovision;
        let err = encode(&op).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn upgrade_requires_orchestration() {
        let op = TypedOperation::new("op-1", "inst-1", UpgradeKymaData::default());
        let err = encode(&op).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);

        let op = op.with_orchestration_id("orch-1");
        let record = encode(&op).unwrap();
        assert_eq!(record.orchestration_id.as_deref(), Some("orch-1"));
    }

    #[test]
    fn provisioning_rejects_orchestration() {
        let op = provisioning().with_orchestration_id("orch-1");
        let err = encode(&op).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn upgrade_decode_rederives_runtime_operation_id() {
        let op = TypedOperation::new("op-9", "inst-1", UpgradeKymaData::default())
            .with_orchestration_id("orch-1");
        let record = encode(&op).unwrap();
        let decoded = decode::<UpgradeKymaData>(&record).unwrap();
        assert_eq!(decoded.data.runtime_operation.id, "op-9");
    }

    #[test]
    fn decode_all_fails_on_first_mismatch() {
        let upgrade = TypedOperation::new("op-2", "inst-1", UpgradeKymaData::default())
            .with_orchestration_id("orch-1");
        let records = vec![encode(&upgrade).unwrap(), encode(&provisioning()).unwrap()];
        let err = decode_all::<UpgradeKymaData>(&records).unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch { ref id, .. } if id == "op-1"));
    }

    fn arb_state() -> impl Strategy<Value = OperationState> {
        prop::sample::select(OperationState::ALL.to_vec())
    }

    fn arb_parameters() -> impl Strategy<Value = ProvisioningParameters> {
        (
            any::<String>(),
            any::<String>(),
            any::<String>(),
            any::<String>(),
            proptest::option::of(any::<String>()),
            any::<String>(),
            proptest::option::of(any::<String>()),
        )
            .prop_map(
                |(
                    plan_id,
                    service_id,
                    global_account_id,
                    sub_account_id,
                    platform_region,
                    name,
                    kyma_version,
                )| ProvisioningParameters {
                    plan_id,
                    service_id,
                    global_account_id,
                    sub_account_id,
                    platform_region,
                    name,
                    kyma_version,
                },
            )
    }

    fn with_envelope<D: OperationData>(
        mut op: TypedOperation<D>,
        state: OperationState,
        description: String,
        target: Option<String>,
        version: i64,
        created_secs: i64,
    ) -> TypedOperation<D> {
        let created = Utc.timestamp_opt(created_secs, 0).unwrap();
        op.state = state;
        op.description = description;
        op.target_operation_id = target;
        op.version = version;
        op.created_at = created;
        op.updated_at = created;
        op
    }

    proptest! {
        #[test]
        fn provisioning_round_trip(
            id in "[a-z0-9-]{1,36}",
            parameters in arb_parameters(),
            runtime_id in proptest::option::of(any::<String>()),
            dashboard_url in proptest::option::of(any::<String>()),
            state in arb_state(),
            description in any::<String>(),
            target in proptest::option::of("[a-z0-9-]{1,36}"),
            version in 0i64..1_000_000,
            created_secs in 0i64..4_000_000_000,
        ) {
            let data = ProvisioningData { parameters, runtime_id, dashboard_url };
            let op = with_envelope(
                TypedOperation::new(id, "inst", data),
                state, description, target, version, created_secs,
            );
            let decoded = decode::<ProvisioningData>(&encode(&op).unwrap()).unwrap();
            prop_assert_eq!(decoded, op);
        }

        #[test]
        fn deprovisioning_round_trip(
            id in "[a-z0-9-]{1,36}",
            parameters in arb_parameters(),
            runtime_id in proptest::option::of(any::<String>()),
            sub_account_id in any::<String>(),
            temporary in any::<bool>(),
            state in arb_state(),
            version in 0i64..1_000_000,
        ) {
            let data = DeprovisioningData { parameters, runtime_id, sub_account_id, temporary };
            let op = with_envelope(
                TypedOperation::new(id, "inst", data),
                state, String::new(), None, version, 1_700_000_000,
            );
            let decoded = decode::<DeprovisioningData>(&encode(&op).unwrap()).unwrap();
            prop_assert_eq!(decoded, op);
        }

        #[test]
        fn upgrade_kyma_round_trip(
            id in "[a-z0-9-]{1,36}",
            orchestration_id in any::<String>(),
            runtime_id in any::<String>(),
            shoot_name in proptest::option::of(any::<String>()),
            window in proptest::option::of(("[0-9]{6}\\+0000", "[0-9]{6}\\+0000")),
            kyma_version in proptest::option::of("[0-9]\\.[0-9]{1,2}\\.[0-9]{1,2}"),
            dry_run in any::<bool>(),
            state in arb_state(),
        ) {
            let (maintenance_window_begin, maintenance_window_end) = window.unzip();
            let data = UpgradeKymaData {
                runtime_operation: RuntimeOperation {
                    id: id.clone(),
                    runtime_id,
                    global_account_id: "ga".to_string(),
                    sub_account_id: "sa".to_string(),
                    shoot_name,
                    maintenance_window_begin,
                    maintenance_window_end,
                },
                kyma_version,
                dry_run,
            };
            let op = with_envelope(
                TypedOperation::new(id, "inst", data).with_orchestration_id(orchestration_id),
                state, String::new(), None, 0, 1_700_000_000,
            );
            let decoded = decode::<UpgradeKymaData>(&encode(&op).unwrap()).unwrap();
            prop_assert_eq!(decoded, op);
        }
    }
}
