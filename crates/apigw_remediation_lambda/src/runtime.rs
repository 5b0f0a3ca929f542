//! Runtime-facing re-exports of the deterministic remediation primitives.

pub use apigw_remediation_core::{contract, patch};
