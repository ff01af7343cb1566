//! Operation store: typed persistence of long-running broker operations
//! with optimistic locking and bounded retries over a pluggable session.

pub mod config;
pub mod error;
pub mod retry;
pub mod storage;
pub mod telemetry;

pub use config::{StoreArgs, StoreConfig};
pub use error::{ErrorKind, SessionError, SessionErrorKind, StoreError};
pub use retry::{Outcome, RetryPolicy};
pub use storage::{
    MemorySessionFactory, OperationRecord, OperationStore, ReadSession, SessionFactory,
    WriteSession,
};
pub use telemetry::{init_tracing, LogArgs, LogConfig, LogFormat};
