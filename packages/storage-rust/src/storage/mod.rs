//! Operation persistence.
//!
//! Layered bottom-up: [`record`] is the persisted row shape, [`session`] the
//! contract a backend implements, [`mapper`] and [`codec`] convert between
//! rows and domain operations, and [`OperationStore`] ties them together
//! with retries and optimistic locking.

pub mod codec;
pub mod mapper;
pub mod operation_store;
pub mod record;
pub mod session;
pub mod sessions;

pub use operation_store::OperationStore;
pub use record::*;
pub use session::{ReadSession, SessionFactory, WriteSession};
pub use sessions::MemorySessionFactory;

// ---------------------------------------------------------------------------
// Integration tests
// ---------------------------------------------------------------------------
