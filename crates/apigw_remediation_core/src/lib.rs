//! Shared authorizer-remediation domain primitives.
//!
//! This crate owns the deterministic parts of the remediation flow: the
//! invocation event contract, REST API id extraction, and method patch
//! construction. It intentionally excludes AWS SDK and Lambda runtime
//! concerns.

pub mod contract;
pub mod patch;
