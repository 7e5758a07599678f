//! huddle-distribute library.
//!
//! Hands a pool of collected items out to session participants under one of
//! four policies, and checks a run for feasibility before it is committed.
//!
//! # Conventions
//!
//! - **Errors**: infeasible configs are reported through
//!   [`ValidationResult`], never raised.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod policy;
pub mod validate;

pub use policy::{distribute, distribute_with_rng};
pub use validate::{ValidationResult, validate};
