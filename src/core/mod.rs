//! Core business logic - framework-agnostic code generation, redemption, and reporting.
//!
//! Every write goes through exactly one database transaction per call. No state is kept
//! in memory between calls; concurrent callers coordinate only through the store.

/// Campaign creation with its code batch
pub mod campaign;
/// Pure token generation
pub mod codegen;
/// Exactly-once code redemption
pub mod redemption;
/// Read-side campaign and code views
pub mod report;
