//! Henhouse - flow contracts and write reliability for the Henhouse farm platform
//!
//! Farmers, dealers and administrators reach the platform through named
//! flows. Each invocation is validated on the way in and on the way out,
//! privileged flows are authorized before any data is touched, and every
//! store mutation is awaited and, on failure, both returned and published.
//!
//! ## Components
//!
//! - **Schema**: JSON Schema validation with coercion and unknown-field policy
//! - **Events**: the `permission-error` channel for detached observers
//! - **Auth**: identity resolution and the admin allowlist guard
//! - **DB**: store capability, in-memory store, reliable writer
//! - **Audit**: append-only log of administrative actions
//! - **Flow**: definitions, registry and runner
//! - **Flows**: the built-in advisory, health, admin and onboarding flows

pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod events;
pub mod flow;
pub mod flows;
pub mod schema;

pub use config::{Args, HenhouseConfig};
pub use events::{ErrorEvent, ErrorEventChannel, EventName, PermissionError};
pub use flow::{FlowError, FlowRegistry, FlowRunner, Services};
