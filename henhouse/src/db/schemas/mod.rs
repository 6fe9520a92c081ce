//! Document schemas for Henhouse
//!
//! Collection names, typed documents and their outbound JSON schemas.

mod audit_log;
mod order;
mod user;

pub use audit_log::{audit_entry_schema, AuditLogEntry, AUDIT_LOG_COLLECTION};
pub use order::{order_schema, Order, OrderStatus, ORDER_COLLECTION};
pub use user::{
    derive_role_id, profile_schema, PlanType, UserProfile, UserRole, UserStatus, USER_COLLECTION,
};
