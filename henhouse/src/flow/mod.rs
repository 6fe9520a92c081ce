//! Flow contract
//!
//! Provides:
//! - Flow definitions (schemas, privilege, handler-error policy, handler)
//! - The registry of named flows
//! - The runner enforcing validation and authorization around handlers

pub mod definition;
pub mod error;
pub mod registry;
pub mod runner;

pub use definition::{
    handler_fn, FlowContext, FlowDefinition, FlowHandler, HandlerErrorPolicy, Privilege, Services,
    REQUESTER_FIELD,
};
pub use error::{FlowError, FlowErrorKind, HandlerError};
pub use registry::{FlowRegistry, RegistryError};
pub use runner::FlowRunner;
