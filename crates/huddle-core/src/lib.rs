//! huddle-core library.
//!
//! Plain-data engine behind a live slide session: snapshot layout guards,
//! reference resolution with transformer views, display formatting,
//! slide aggregation and the preview session orchestrator.
//!
//! # Conventions
//!
//! - **Errors**: expected runtime misses resolve to empty values; `Result` is
//!   reserved for parse failures and config I/O (`anyhow::Result` there).
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod aggregate;
pub mod config;
pub mod display;
pub mod error;
pub mod model;
pub mod resolve;
pub mod session;
pub mod state;
pub mod transform;

pub use aggregate::{ParticipantLocalState, SlideSummary, analyze, merge_participant_states};
pub use display::{UNRESOLVED_MARKER, format_value};
pub use model::{
    AssignmentMap, DistributionConfig, DistributionMode, Item, MismatchHandling, Participant,
};
pub use resolve::{DataReference, ResolveContext, Resolver, StructuredReference};
pub use session::{Notification, PreviewSession, SessionEvent};
pub use state::{Accessor, Snapshot, StateLayout};
pub use transform::Transformer;
