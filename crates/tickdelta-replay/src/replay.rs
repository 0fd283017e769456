//! Mutation logs and deterministic replay with hash checkpoints.
//!
//! The replay system records every [`Mutation`] reported during a run,
//! tick by tick, together with periodic BLAKE3 checkpoints of the closed
//! deltas, producing a [`MutationLog`]. The log can then be replayed through
//! a fresh [`DeltaPipeline`] to verify that the aggregator collapses the
//! same calls into the same deltas.
//!
//! # Recording
//!
//! ```
//! use tickdelta_model::prelude::*;
//! use tickdelta_replay::mutation::Mutation;
//! use tickdelta_replay::replay::{replay, MutationRecorder};
//! use tickdelta_state::config::PipelineConfig;
//!
//! let mut recorder = MutationRecorder::new(PipelineConfig::default(), 1).unwrap();
//!
//! recorder.begin_tick().unwrap();
//! recorder
//!     .record(Mutation::CellOccupant { x: 3, y: 4, occupant: EntityId(56) })
//!     .unwrap();
//! let closed = recorder.end_tick().unwrap().expect("tick had changes");
//! assert_eq!(closed.cell_deltas().len(), 1);
//!
//! let log = recorder.finish().unwrap();
//! let outcome = replay(&log).unwrap();
//! assert!(outcome.completed);
//! assert!(outcome.first_divergence.is_none());
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tickdelta_state::config::PipelineConfig;
use tickdelta_state::pipeline::{ClosedDelta, DeltaPipeline};
use tickdelta_state::sequence::SequenceId;
use tickdelta_state::DeltaError;

use crate::mutation::{self, Mutation};
use crate::ReplayError;

// ---------------------------------------------------------------------------
// MutationLog
// ---------------------------------------------------------------------------

/// The record calls of one tick, plus an optional checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickMutations {
    /// Calls in the order they were made.
    pub mutations: Vec<Mutation>,
    /// BLAKE3 hex digest of the closed delta. `None` means no checkpoint, or
    /// that the tick was dropped as empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_hash: Option<String>,
}

/// A complete recording: the pipeline config plus every tick's calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationLog {
    /// Config the recording pipeline ran with.
    #[serde(default)]
    pub config: PipelineConfig,
    /// Recorded ticks in order.
    pub ticks: Vec<TickMutations>,
}

impl MutationLog {
    /// Parse a log from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a log from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let text = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Serialize the log to indented JSON.
    pub fn to_json_pretty(&self) -> Result<String, ReplayError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ---------------------------------------------------------------------------
// ReplayOutcome
// ---------------------------------------------------------------------------

/// Where a replayed delta stopped matching its recorded checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayDivergence {
    /// Index of the tick within [`MutationLog::ticks`].
    pub tick_index: usize,
    /// Sequence ID the replayed tick was stamped with.
    pub sequence: SequenceId,
    /// Hash stored in the log.
    pub expected_hash: String,
    /// `None` if the replayed tick closed empty and was dropped.
    pub actual_hash: Option<String>,
}

/// The result of [`replay`].
#[derive(Debug)]
pub struct ReplayOutcome {
    /// `true` if every tick was replayed without a divergence.
    pub completed: bool,
    /// Ticks replayed, including the diverging one.
    pub ticks_replayed: usize,
    /// Closed deltas in tick order (dropped empty ticks are absent).
    pub deltas: Vec<ClosedDelta>,
    /// The checkpoint that did not match, if any.
    pub first_divergence: Option<ReplayDivergence>,
}

// ---------------------------------------------------------------------------
// MutationRecorder
// ---------------------------------------------------------------------------

/// Drives a live [`DeltaPipeline`] and records every call into a
/// [`MutationLog`].
///
/// A checkpoint hash is stored every `checkpoint_interval` ticks (counting
/// from the first). An interval of 0 disables checkpoints.
#[derive(Debug)]
pub struct MutationRecorder {
    pipeline: DeltaPipeline,
    log: MutationLog,
    current: Option<Vec<Mutation>>,
    checkpoint_interval: usize,
}

impl MutationRecorder {
    /// Create a recorder around a fresh pipeline built from `config`.
    pub fn new(config: PipelineConfig, checkpoint_interval: usize) -> Result<Self, ReplayError> {
        Ok(Self {
            pipeline: DeltaPipeline::new(config.clone())?,
            log: MutationLog {
                config,
                ticks: Vec::new(),
            },
            current: None,
            checkpoint_interval,
        })
    }

    /// Open the next tick and return its sequence ID.
    pub fn begin_tick(&mut self) -> Result<SequenceId, ReplayError> {
        let sequence = self.pipeline.begin_tick()?.sequence();
        self.current = Some(Vec::new());
        Ok(sequence)
    }

    /// Apply `mutation` to the open tick and record it.
    pub fn record(&mut self, mutation: Mutation) -> Result<(), ReplayError> {
        let (Some(delta), Some(calls)) = (self.pipeline.current(), self.current.as_mut()) else {
            return Err(ReplayError::Pipeline(DeltaError::NoOpenTick));
        };
        mutation::apply(delta, &mutation);
        calls.push(mutation);
        Ok(())
    }

    /// Close the open tick, storing its calls and (on checkpoint ticks) the
    /// hash of the closed delta.
    pub fn end_tick(&mut self) -> Result<Option<ClosedDelta>, ReplayError> {
        let closed = self.pipeline.end_tick()?;
        let mutations = self.current.take().unwrap_or_default();

        let tick_index = self.log.ticks.len();
        let checkpoint =
            self.checkpoint_interval != 0 && tick_index % self.checkpoint_interval == 0;
        let expected_hash = match &closed {
            Some(delta) if checkpoint => Some(delta.content_hash()),
            _ => None,
        };

        self.log.ticks.push(TickMutations {
            mutations,
            expected_hash,
        });
        Ok(closed)
    }

    /// Consume the recorder and return the log.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::TickInProgress`] if a tick is still open.
    pub fn finish(self) -> Result<MutationLog, ReplayError> {
        if self.pipeline.is_tick_open() {
            return Err(ReplayError::TickInProgress);
        }
        Ok(self.log)
    }
}

// ---------------------------------------------------------------------------
// replay()
// ---------------------------------------------------------------------------

/// Replay `log` through a fresh pipeline built from its own config.
///
/// Replay stops at the first checkpoint whose hash does not match; the
/// outcome then carries the deltas closed up to and including that tick.
///
/// # Errors
///
/// Returns [`ReplayError::EmptyLog`] for a log with no ticks and
/// [`ReplayError::Pipeline`] if the config is invalid or the sequence
/// counter runs out.
pub fn replay(log: &MutationLog) -> Result<ReplayOutcome, ReplayError> {
    if log.ticks.is_empty() {
        return Err(ReplayError::EmptyLog);
    }

    let mut pipeline = DeltaPipeline::new(log.config.clone())?;
    let mut deltas = Vec::new();

    for (tick_index, tick) in log.ticks.iter().enumerate() {
        let delta = pipeline.begin_tick()?;
        let sequence = delta.sequence();
        for m in &tick.mutations {
            mutation::apply(delta, m);
        }
        let closed = pipeline.end_tick()?;
        let actual_hash = closed.as_ref().map(|d| d.content_hash());

        if let Some(delta) = closed {
            deltas.push(delta);
        }

        if let Some(expected) = &tick.expected_hash {
            if actual_hash.as_ref() != Some(expected) {
                tracing::warn!(
                    tick_index,
                    sequence = %sequence,
                    expected = %expected,
                    actual = ?actual_hash,
                    "replay diverged from recorded checkpoint"
                );
                return Ok(ReplayOutcome {
                    completed: false,
                    ticks_replayed: tick_index + 1,
                    deltas,
                    first_divergence: Some(ReplayDivergence {
                        tick_index,
                        sequence,
                        expected_hash: expected.clone(),
                        actual_hash,
                    }),
                });
            }
        }
    }

    tracing::debug!(
        ticks = log.ticks.len(),
        deltas = pipeline.emitted(),
        last_sequence = ?pipeline.last_sequence(),
        "replay completed"
    );

    Ok(ReplayOutcome {
        completed: true,
        ticks_replayed: log.ticks.len(),
        deltas,
        first_divergence: None,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tickdelta_model::prelude::*;

    fn record_two_ticks(interval: usize) -> MutationLog {
        let mut recorder = MutationRecorder::new(PipelineConfig::default(), interval).unwrap();

        recorder.begin_tick().unwrap();
        recorder
            .record(Mutation::Create {
                entity: EntityId(7),
                base: BaseId(100),
            })
            .unwrap();
        recorder
            .record(Mutation::Move {
                entity: EntityId(7),
                location: LocationId(42),
            })
            .unwrap();
        recorder.end_tick().unwrap();

        recorder.begin_tick().unwrap();
        recorder
            .record(Mutation::IconState {
                entity: EntityId(7),
                state: "walk".to_owned(),
            })
            .unwrap();
        recorder.end_tick().unwrap();

        recorder.finish().unwrap()
    }

    #[test]
    fn checkpoint_interval_controls_hashes() {
        let every = record_two_ticks(1);
        assert!(every.ticks.iter().all(|t| t.expected_hash.is_some()));

        let none = record_two_ticks(0);
        assert!(none.ticks.iter().all(|t| t.expected_hash.is_none()));

        let alternate = record_two_ticks(2);
        assert!(alternate.ticks[0].expected_hash.is_some());
        assert!(alternate.ticks[1].expected_hash.is_none());
    }

    #[test]
    fn replay_of_recording_matches() {
        let log = record_two_ticks(1);
        let outcome = replay(&log).unwrap();

        assert!(outcome.completed);
        assert_eq!(outcome.ticks_replayed, 2);
        assert_eq!(outcome.deltas.len(), 2);
        assert_eq!(outcome.deltas[0].creations()[0].location, LocationId(42));
        assert_eq!(outcome.deltas[1].property_deltas().len(), 1);
    }

    #[test]
    fn tampered_log_reports_divergence() {
        let mut log = record_two_ticks(1);
        log.ticks[1].mutations.push(Mutation::Delete {
            entity: EntityId(7),
        });

        let outcome = replay(&log).unwrap();
        assert!(!outcome.completed);
        let divergence = outcome.first_divergence.unwrap();
        assert_eq!(divergence.tick_index, 1);
        assert_eq!(divergence.sequence, SequenceId(2));
        assert!(divergence.actual_hash.is_some());
    }

    #[test]
    fn record_without_open_tick_fails() {
        let mut recorder = MutationRecorder::new(PipelineConfig::default(), 1).unwrap();
        let err = recorder
            .record(Mutation::Delete {
                entity: EntityId(1),
            })
            .unwrap_err();
        assert!(matches!(err, ReplayError::Pipeline(DeltaError::NoOpenTick)));
    }

    #[test]
    fn finish_with_open_tick_fails() {
        let mut recorder = MutationRecorder::new(PipelineConfig::default(), 1).unwrap();
        recorder.begin_tick().unwrap();
        assert!(matches!(
            recorder.finish(),
            Err(ReplayError::TickInProgress)
        ));
    }

    #[test]
    fn empty_log_is_rejected() {
        assert!(matches!(
            replay(&MutationLog::default()),
            Err(ReplayError::EmptyLog)
        ));
    }

    #[test]
    fn log_json_roundtrip() {
        let log = record_two_ticks(1);
        let json = log.to_json_pretty().unwrap();
        let back = MutationLog::from_json_str(&json).unwrap();
        assert_eq!(back, log);
    }
}
