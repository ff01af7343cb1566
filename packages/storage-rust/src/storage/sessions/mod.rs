//! Session contract implementations.
//!
//! Currently includes [`MemorySessionFactory`] for tests and embedding.
//! Database-backed sessions live with the service that owns the schema.

mod memory;

pub use memory::MemorySessionFactory;
