//! Document store layer
//!
//! - [`store`]: the store capability and document addressing
//! - [`value`]: native field values and ISO-8601 conversion at the boundary
//! - [`memory`]: concurrent in-memory store
//! - [`write`]: the write reliability wrapper
//! - [`schemas`]: collection names and typed documents
//! - [`seed`]: seed data loading

pub mod memory;
pub mod schemas;
pub mod seed;
pub mod store;
pub mod value;
pub mod write;

pub use memory::{MemoryStore, StoreOp};
pub use store::{DocumentPath, DocumentStore, SetMode, StoreError};
pub use value::{Document, FieldValue, Fields};
pub use write::{Mutation, ReliableWriter, WriteOperation};
