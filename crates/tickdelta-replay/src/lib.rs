//! Tickdelta Replay -- recorded mutation logs and deterministic replay.
//!
//! This crate builds on [`tickdelta_state`] to capture the record calls of a
//! run as data and replay them later:
//!
//! - [`mutation`]: [`Mutation`](mutation::Mutation), one serializable record
//!   call, and [`apply`](mutation::apply).
//! - [`replay`]: [`MutationLog`](replay::MutationLog), the recorder, and the
//!   replay function that verifies BLAKE3 checkpoints.
//!
//! The `delta-replay` binary replays a log file and prints the closed deltas.

#![deny(unsafe_code)]

use std::path::PathBuf;

pub mod mutation;
pub mod replay;

/// Re-export the state crate for convenience.
pub use tickdelta_state;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while recording, loading or replaying a mutation log.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// The log contains no ticks.
    #[error("mutation log contains no ticks")]
    EmptyLog,

    /// `finish` was called while a tick was still open.
    #[error("cannot finish recording while a tick is open")]
    TickInProgress,

    /// The underlying pipeline refused an operation.
    #[error(transparent)]
    Pipeline(#[from] tickdelta_state::DeltaError),

    /// The log file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Encoding or decoding a [`MutationLog`](replay::MutationLog) failed.
    #[error("mutation log JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common replay usage.
pub mod prelude {
    pub use tickdelta_state::prelude::*;

    pub use crate::mutation::{apply, Mutation};
    pub use crate::replay::{
        replay, MutationLog, MutationRecorder, ReplayDivergence, ReplayOutcome, TickMutations,
    };
    pub use crate::ReplayError;
}
