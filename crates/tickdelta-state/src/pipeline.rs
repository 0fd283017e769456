//! Tick lifecycle around the delta aggregator.
//!
//! The [`DeltaPipeline`] owns the [`SequenceCounter`] and at most one open
//! [`DeltaState`]. Each tick follows this flow:
//!
//! 1. [`DeltaPipeline::begin_tick`] -- draw the next sequence ID and open a
//!    fresh aggregator.
//! 2. The simulation reports changes through the `record_*` methods of the
//!    open aggregator ([`DeltaPipeline::current`]).
//! 3. [`DeltaPipeline::end_tick`] -- close the aggregator and hand it to the
//!    serializer as a [`ClosedDelta`].
//!
//! A [`ClosedDelta`] only gives out shared references to its contents, so a
//! delta cannot be amended after its tick ended.
//!
//! # Example
//!
//! ```
//! use tickdelta_model::prelude::*;
//! use tickdelta_state::config::PipelineConfig;
//! use tickdelta_state::pipeline::DeltaPipeline;
//!
//! let mut pipeline = DeltaPipeline::new(PipelineConfig::default()).unwrap();
//!
//! let delta = pipeline.begin_tick().unwrap();
//! delta.record_cell_occupant(3, 4, EntityId(56));
//!
//! let closed = pipeline.end_tick().unwrap().expect("tick had changes");
//! assert_eq!(closed.sequence().0, 1);
//! assert_eq!(closed.cell_deltas().len(), 1);
//!
//! // Ticks without changes are dropped by default.
//! pipeline.begin_tick().unwrap();
//! assert!(pipeline.end_tick().unwrap().is_none());
//! ```

use std::ops::Deref;

use crate::config::PipelineConfig;
use crate::delta::DeltaState;
use crate::sequence::{SequenceCounter, SequenceId};
use crate::DeltaError;

// ---------------------------------------------------------------------------
// ClosedDelta
// ---------------------------------------------------------------------------

/// A finished, read-only delta.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedDelta {
    inner: DeltaState,
}

impl ClosedDelta {
    /// Serialize to compact JSON.
    pub fn to_json(&self) -> Result<String, DeltaError> {
        Ok(serde_json::to_string(&self.inner)?)
    }

    /// Serialize to indented JSON.
    pub fn to_json_pretty(&self) -> Result<String, DeltaError> {
        Ok(serde_json::to_string_pretty(&self.inner)?)
    }
}

impl Deref for ClosedDelta {
    type Target = DeltaState;

    fn deref(&self) -> &DeltaState {
        &self.inner
    }
}

impl serde::Serialize for ClosedDelta {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// DeltaPipeline
// ---------------------------------------------------------------------------

/// Opens and closes one [`DeltaState`] per tick.
#[derive(Debug)]
pub struct DeltaPipeline {
    config: PipelineConfig,
    counter: SequenceCounter,
    open: Option<DeltaState>,
    /// Closed ticks handed out so far (empty ticks that were dropped excluded).
    emitted: u64,
}

impl DeltaPipeline {
    /// Create a pipeline from a validated config.
    ///
    /// # Errors
    ///
    /// Returns [`DeltaError::InvalidConfig`] if the config fails validation.
    pub fn new(config: PipelineConfig) -> Result<Self, DeltaError> {
        config.validate()?;
        Ok(Self {
            counter: SequenceCounter::starting_at(config.first_sequence),
            config,
            open: None,
            emitted: 0,
        })
    }

    /// Open the next tick's aggregator.
    ///
    /// # Errors
    ///
    /// - [`DeltaError::TickAlreadyOpen`] if the previous tick was not ended.
    /// - [`DeltaError::SequenceExhausted`] if no sequence IDs are left.
    pub fn begin_tick(&mut self) -> Result<&mut DeltaState, DeltaError> {
        if let Some(open) = &self.open {
            return Err(DeltaError::TickAlreadyOpen {
                sequence: open.sequence(),
            });
        }
        let sequence = self.counter.next()?;
        tracing::trace!(sequence = %sequence, "delta tick opened");
        Ok(self.open.insert(DeltaState::new(sequence)))
    }

    /// The open aggregator, if a tick is in progress.
    pub fn current(&mut self) -> Option<&mut DeltaState> {
        self.open.as_mut()
    }

    /// Returns `true` between `begin_tick` and `end_tick`.
    pub fn is_tick_open(&self) -> bool {
        self.open.is_some()
    }

    /// Close the open tick.
    ///
    /// Returns `Ok(None)` if the tick recorded nothing and
    /// [`PipelineConfig::emit_empty`] is off. The sequence ID drawn for a
    /// dropped tick is not reused.
    ///
    /// # Errors
    ///
    /// Returns [`DeltaError::NoOpenTick`] if no tick is open.
    pub fn end_tick(&mut self) -> Result<Option<ClosedDelta>, DeltaError> {
        let delta = self.open.take().ok_or(DeltaError::NoOpenTick)?;

        if !delta.has_changes() && !self.config.emit_empty {
            tracing::trace!(sequence = %delta.sequence(), "empty delta dropped");
            return Ok(None);
        }

        tracing::debug!(
            sequence = %delta.sequence(),
            creations = delta.creations().len(),
            deletions = delta.deletions().len(),
            location_deltas = delta.location_deltas().len(),
            property_deltas = delta.property_deltas().len(),
            cell_deltas = delta.cell_deltas().len(),
            viewer_deltas = delta.viewer_deltas().count(),
            "delta tick closed"
        );

        self.emitted += 1;
        Ok(Some(ClosedDelta { inner: delta }))
    }

    /// Sequence ID of the most recently opened tick.
    pub fn last_sequence(&self) -> Option<SequenceId> {
        self.counter.last_issued()
    }

    /// Number of deltas handed out by [`end_tick`](Self::end_tick).
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// The validated config this pipeline runs with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
