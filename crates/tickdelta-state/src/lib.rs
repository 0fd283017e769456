//! Tickdelta State -- per-tick delta aggregation for remote viewers.
//!
//! The simulation reports every change to the shared world model (entity
//! lifecycle, placement, appearance, grid cells, viewer cameras) to the
//! current tick's [`DeltaState`](delta::DeltaState). At tick end the state is
//! closed and handed to a serializer, which turns it into one network update.
//!
//! # Modules
//!
//! - [`delta`]: the aggregator and its record types.
//! - [`keyed`]: insertion-ordered record storage with a hash index.
//! - [`sequence`]: sequence IDs and the counter that issues them.
//! - [`pipeline`]: begin/end tick lifecycle and read-only closed deltas.
//! - [`config`]: pipeline configuration.

#![deny(unsafe_code)]

pub mod config;
pub mod delta;
pub mod keyed;
pub mod pipeline;
pub mod sequence;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced around the aggregator.
///
/// Recording a change never fails; these come from the tick lifecycle,
/// configuration and serialization.
#[derive(Debug, thiserror::Error)]
pub enum DeltaError {
    /// Every `u32` sequence ID has been handed out.
    #[error("sequence IDs exhausted after {last}")]
    SequenceExhausted { last: sequence::SequenceId },

    /// `begin_tick` was called while a tick was still open.
    #[error("tick {sequence} is still open; end it before beginning another")]
    TickAlreadyOpen { sequence: sequence::SequenceId },

    /// `end_tick` was called with no tick open.
    #[error("no tick is open")]
    NoOpenTick,

    /// A configuration field is out of range.
    #[error("invalid pipeline config: {details}")]
    InvalidConfig { details: String },

    /// JSON encoding or decoding failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::delta::{
        CellDelta, DeltaState, EntityCreation, LocationDelta, PropertyDelta, ViewerDelta,
    };
    pub use crate::pipeline::{ClosedDelta, DeltaPipeline};
    pub use crate::sequence::{SequenceCounter, SequenceId};
    pub use crate::DeltaError;
    pub use tickdelta_model::prelude::*;
}
