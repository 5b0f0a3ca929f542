//! AWS-oriented adapters and handlers for authorizer remediation.
//!
//! This crate owns runtime integration details (the Lambda handler and the
//! API Gateway management-plane adapter) and exposes a single runtime module
//! boundary for the contract and patch primitives.

pub mod adapters;
pub mod handlers;
pub mod runtime;
