//! Core types and error definitions for the Conductor orchestration engine.
//!
//! This crate provides the foundational types shared across all Conductor
//! crates: the unified error enum and the worker snapshot model that
//! discovery backends produce and the orchestrator consumes.
//!
//! # Main types
//!
//! - [`ConductorError`]: Unified error enum for all Conductor subsystems.
//! - [`ConductorResult`]: Convenience alias for `Result<T, ConductorError>`.
//! - [`Worker`]: Read-only snapshot of an external execution unit.
//! - [`CertificationTier`]: Ordered worker tier (bronze < silver < gold).

/// Unified error type.
pub mod error;
/// Worker snapshot model.
pub mod worker;

pub use error::{ConductorError, ConductorResult};
pub use worker::{CertificationTier, PerformanceMetrics, Worker, WorkerStatus};
