//! Per-tick delta state aggregator.
//!
//! A [`DeltaState`] collects every change to the shared world model that the
//! simulation reports during one tick and collapses them into the smallest
//! set of records a viewer needs to catch up:
//!
//! - [`EntityCreation`]: entities that came into existence this tick, with
//!   their full initial appearance.
//! - deletions: entities that ceased to exist.
//! - [`LocationDelta`]: pre-existing entities that moved.
//! - [`PropertyDelta`]: pre-existing entities whose appearance changed.
//! - [`CellDelta`]: grid cells whose occupying entity changed.
//! - [`ViewerDelta`]: per-viewer camera changes, keyed by viewer identity.
//!
//! # Routing
//!
//! Each entity resolves to exactly one record per tick. Once an entity has a
//! creation record, every later location, icon-state, direction, overlay,
//! screen-location and appearance change for it is folded straight into that
//! record; no location or property delta is ever produced for it. Entities
//! without a creation record are treated as pre-existing, and their changes
//! accumulate into a single property delta (or a single location delta).
//! If a creation arrives after such deltas, they are folded into it.
//!
//! Scalar fields are last-write-wins. Overlay additions are keyed by slot and
//! last-write-wins per slot.
//!
//! # Example
//!
//! ```
//! use tickdelta_model::prelude::*;
//! use tickdelta_state::delta::DeltaState;
//! use tickdelta_state::sequence::SequenceId;
//!
//! let mut delta = DeltaState::new(SequenceId(1));
//! assert!(!delta.has_changes());
//!
//! delta.record_creation(EntityId(7), BaseId(100));
//! delta.record_location_change(EntityId(7), LocationId(42));
//! delta.record_icon_state_change(EntityId(9), "walk");
//!
//! assert_eq!(delta.creations().len(), 1);
//! assert_eq!(delta.creations()[0].location, LocationId(42));
//! assert!(delta.location_deltas().is_empty());
//! assert_eq!(delta.property_deltas().len(), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tickdelta_model::ids::{BaseId, EntityId, LocationId, OverlayId};
use tickdelta_model::visual::{Direction, ScreenPoint, VisualProperties};

use crate::keyed::{Keyed, KeyedLog};
use crate::sequence::SequenceId;

// ---------------------------------------------------------------------------
// EntityCreation
// ---------------------------------------------------------------------------

/// An entity that came into existence during the tick.
///
/// Carries the entity's complete initial state as of the end of the tick:
/// later changes in the same tick are applied to this record in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityCreation {
    /// The entity that was created.
    pub entity: EntityId,
    /// Template the entity was instantiated from.
    pub base: BaseId,
    /// [`LocationId::UNSET`] until the entity is placed.
    pub location: LocationId,
    /// Appearance as of the end of the tick.
    pub visual: VisualProperties,
    /// Overlays by slot as of the end of the tick.
    pub overlays: BTreeMap<OverlayId, VisualProperties>,
    /// Anchor for screen-space entities, `None` for world-space ones.
    pub screen_location: Option<ScreenPoint>,
}

impl EntityCreation {
    fn new(entity: EntityId, base: BaseId) -> Self {
        Self {
            entity,
            base,
            location: LocationId::UNSET,
            visual: VisualProperties::default(),
            overlays: BTreeMap::new(),
            screen_location: None,
        }
    }

    /// Apply a property delta recorded before the creation.
    ///
    /// Removals are applied after additions, except at slots whose last
    /// reported change was an addition.
    fn absorb(&mut self, pending: PropertyDelta) {
        self.visual.merge_from(&pending.changed);
        self.overlays.extend(pending.overlay_additions);
        for slot in &pending.overlay_removals {
            if !pending.readded.contains(slot) {
                self.overlays.remove(slot);
            }
        }
        if pending.screen_location.is_some() {
            self.screen_location = pending.screen_location;
        }
    }
}

impl Keyed for EntityCreation {
    type Key = EntityId;

    fn key(&self) -> EntityId {
        self.entity
    }
}

// ---------------------------------------------------------------------------
// LocationDelta
// ---------------------------------------------------------------------------

/// A pre-existing entity moved to a new location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationDelta {
    /// The entity that moved.
    pub entity: EntityId,
    /// Where it is now.
    pub location: LocationId,
}

impl Keyed for LocationDelta {
    type Key = EntityId;

    fn key(&self) -> EntityId {
        self.entity
    }
}

// ---------------------------------------------------------------------------
// PropertyDelta
// ---------------------------------------------------------------------------

/// Appearance changes to a pre-existing entity.
///
/// Only the touched fields of [`changed`](Self::changed) are meaningful.
/// Removals are listed in the order they were reported and are not
/// reconciled against [`overlay_additions`](Self::overlay_additions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDelta {
    /// The entity whose appearance changed.
    pub entity: EntityId,
    /// Touched appearance fields, last write wins per field.
    pub changed: VisualProperties,
    /// Overlays added or replaced, by slot.
    pub overlay_additions: BTreeMap<OverlayId, VisualProperties>,
    /// Overlay slots removed, in report order.
    pub overlay_removals: Vec<OverlayId>,
    /// `Some` if the screen anchor changed this tick.
    pub screen_location: Option<ScreenPoint>,
    /// Removed slots that were added again afterwards. Only consulted when
    /// the delta is folded into a creation; never serialized.
    #[serde(skip)]
    readded: BTreeSet<OverlayId>,
}

impl PropertyDelta {
    fn new(entity: EntityId) -> Self {
        Self {
            entity,
            changed: VisualProperties::default(),
            overlay_additions: BTreeMap::new(),
            overlay_removals: Vec::new(),
            screen_location: None,
            readded: BTreeSet::new(),
        }
    }

    fn add_overlay(&mut self, slot: OverlayId, props: VisualProperties) {
        if self.overlay_removals.contains(&slot) {
            self.readded.insert(slot);
        }
        self.overlay_additions.insert(slot, props);
    }

    fn remove_overlay(&mut self, slot: OverlayId) {
        self.readded.remove(&slot);
        self.overlay_removals.push(slot);
    }

    /// Returns `true` if the screen anchor changed this tick.
    pub fn has_changed_screen_location(&self) -> bool {
        self.screen_location.is_some()
    }
}

// Equality covers the serialized fields only.
impl PartialEq for PropertyDelta {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
            && self.changed == other.changed
            && self.overlay_additions == other.overlay_additions
            && self.overlay_removals == other.overlay_removals
            && self.screen_location == other.screen_location
    }
}

impl Keyed for PropertyDelta {
    type Key = EntityId;

    fn key(&self) -> EntityId {
        self.entity
    }
}

// ---------------------------------------------------------------------------
// CellDelta
// ---------------------------------------------------------------------------

/// A grid cell is now occupied by a different entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellDelta {
    /// Cell column.
    pub x: i32,
    /// Cell row.
    pub y: i32,
    /// The entity now occupying the cell.
    pub occupant: EntityId,
}

impl Keyed for CellDelta {
    type Key = (i32, i32);

    fn key(&self) -> (i32, i32) {
        (self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// ViewerDelta
// ---------------------------------------------------------------------------

/// Camera changes for one viewer.
///
/// A viewer record with no fields set still counts as a change: it tells the
/// serializer that the viewer joined during this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerDelta {
    /// New eye entity, if it changed.
    pub eye: Option<EntityId>,
}

// ---------------------------------------------------------------------------
// DeltaState
// ---------------------------------------------------------------------------

/// Every change reported during one tick, collapsed to one record per entity
/// or cell.
///
/// Serialized fields appear in serializer traversal order: creations,
/// deletions, location deltas, property deltas, cell deltas, viewer deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaState {
    sequence: SequenceId,
    creations: KeyedLog<EntityCreation>,
    deletions: Vec<EntityId>,
    location_deltas: KeyedLog<LocationDelta>,
    property_deltas: KeyedLog<PropertyDelta>,
    cell_deltas: KeyedLog<CellDelta>,
    viewer_deltas: BTreeMap<String, ViewerDelta>,
}

/// Where an appearance change for an entity lands.
enum Target<'a> {
    Created(&'a mut EntityCreation),
    Existing(&'a mut PropertyDelta),
}

impl DeltaState {
    /// Create an empty delta for the tick stamped `sequence`.
    pub fn new(sequence: SequenceId) -> Self {
        Self {
            sequence,
            creations: KeyedLog::new(),
            deletions: Vec::new(),
            location_deltas: KeyedLog::new(),
            property_deltas: KeyedLog::new(),
            cell_deltas: KeyedLog::new(),
            viewer_deltas: BTreeMap::new(),
        }
    }

    // -- recording ----------------------------------------------------------

    /// Record that `entity` was created from template `base`.
    ///
    /// The creation starts unplaced, with an empty appearance and no overlays.
    /// Changes already recorded for the entity earlier in the tick are folded
    /// into it, so the entity never has both a creation and a property or
    /// location delta.
    ///
    /// If the entity was deleted earlier in the tick, its ID is being reused:
    /// the pending changes described the deleted entity and are discarded
    /// instead of folded.
    ///
    /// Recording the same entity twice in one tick is a caller bug: a second
    /// record is stored, but later changes are routed to the first one.
    pub fn record_creation(&mut self, entity: EntityId, base: BaseId) {
        let mut creation = EntityCreation::new(entity, base);

        if !self.creations.contains(entity) {
            let reused = self.deletions.contains(&entity);
            if let Some(pending) = self.property_deltas.remove(entity) {
                if reused {
                    tracing::trace!(entity = %entity, "property delta of deleted entity discarded");
                } else {
                    creation.absorb(pending);
                    tracing::trace!(entity = %entity, "property delta folded into creation");
                }
            }
            if let Some(pending) = self.location_deltas.remove(entity) {
                if reused {
                    tracing::trace!(entity = %entity, "location delta of deleted entity discarded");
                } else {
                    creation.location = pending.location;
                    tracing::trace!(entity = %entity, "location delta folded into creation");
                }
            }
        }

        if !self.creations.push(creation) {
            tracing::warn!(
                sequence = %self.sequence,
                entity = %entity,
                base = %base,
                "entity created twice in one tick; later changes go to the first creation"
            );
        }
    }

    /// Record that `entity` ceased to exist.
    pub fn record_deletion(&mut self, entity: EntityId) {
        self.deletions.push(entity);
    }

    /// Record that `entity` moved to `location`.
    ///
    /// Overwrites the location of a same-tick creation; otherwise replaces
    /// any earlier location delta for the entity.
    pub fn record_location_change(&mut self, entity: EntityId, location: LocationId) {
        if let Some(creation) = self.creations.get_mut(entity) {
            creation.location = location;
            return;
        }

        let displaced = self
            .location_deltas
            .replace(LocationDelta { entity, location });
        if let Some(previous) = displaced {
            tracing::trace!(
                entity = %entity,
                from = %previous.location,
                to = %location,
                "location delta replaced"
            );
        }
    }

    /// Record that the icon state of `entity` is now `state`.
    pub fn record_icon_state_change(&mut self, entity: EntityId, state: impl Into<String>) {
        let state = state.into();
        match self.target(entity) {
            Target::Created(creation) => creation.visual.set_icon_state(state),
            Target::Existing(delta) => delta.changed.set_icon_state(state),
        }
    }

    /// Record that `entity` now faces `direction`.
    pub fn record_direction_change(&mut self, entity: EntityId, direction: Direction) {
        match self.target(entity) {
            Target::Created(creation) => creation.visual.set_direction(direction),
            Target::Existing(delta) => delta.changed.set_direction(direction),
        }
    }

    /// Merge every touched field of `props` into the entity's appearance.
    pub fn record_visual_change(&mut self, entity: EntityId, props: &VisualProperties) {
        match self.target(entity) {
            Target::Created(creation) => creation.visual.merge_from(props),
            Target::Existing(delta) => delta.changed.merge_from(props),
        }
    }

    /// Record that the screen anchor of `entity` moved to `point`.
    pub fn record_screen_location_change(&mut self, entity: EntityId, point: ScreenPoint) {
        match self.target(entity) {
            Target::Created(creation) => creation.screen_location = Some(point),
            Target::Existing(delta) => delta.screen_location = Some(point),
        }
    }

    /// Record that overlay `slot` on `entity` now shows `props`.
    pub fn record_overlay_add(
        &mut self,
        entity: EntityId,
        slot: OverlayId,
        props: VisualProperties,
    ) {
        match self.target(entity) {
            Target::Created(creation) => {
                creation.overlays.insert(slot, props);
            }
            Target::Existing(delta) => delta.add_overlay(slot, props),
        }
    }

    /// Record that overlay `slot` was removed from `entity`.
    ///
    /// For a same-tick creation the slot is simply dropped from its overlays.
    /// For a pre-existing entity the removal is appended to its property
    /// delta; an addition at the same slot earlier in the tick is kept.
    pub fn record_overlay_remove(&mut self, entity: EntityId, slot: OverlayId) {
        match self.target(entity) {
            Target::Created(creation) => {
                creation.overlays.remove(&slot);
            }
            Target::Existing(delta) => delta.remove_overlay(slot),
        }
    }

    /// Record that cell `(x, y)` is now occupied by `occupant`.
    pub fn record_cell_occupant(&mut self, x: i32, y: i32, occupant: EntityId) {
        let displaced = self.cell_deltas.replace(CellDelta { x, y, occupant });
        if let Some(previous) = displaced {
            tracing::trace!(
                x,
                y,
                from = %previous.occupant,
                to = %occupant,
                "cell delta replaced"
            );
        }
    }

    /// Make sure a viewer record exists for `viewer`.
    pub fn register_viewer(&mut self, viewer: &str) {
        if !self.viewer_deltas.contains_key(viewer) {
            self.viewer_deltas
                .insert(viewer.to_owned(), ViewerDelta::default());
        }
    }

    /// Record that `viewer` now looks through `eye`.
    pub fn record_viewer_eye_change(&mut self, viewer: &str, eye: EntityId) {
        match self.viewer_deltas.get_mut(viewer) {
            Some(record) => record.eye = Some(eye),
            None => {
                self.viewer_deltas
                    .insert(viewer.to_owned(), ViewerDelta { eye: Some(eye) });
            }
        }
    }

    fn target(&mut self, entity: EntityId) -> Target<'_> {
        if let Some(creation) = self.creations.get_mut(entity) {
            return Target::Created(creation);
        }
        Target::Existing(
            self.property_deltas
                .get_or_insert_with(entity, || PropertyDelta::new(entity)),
        )
    }

    // -- querying -----------------------------------------------------------

    /// Sequence ID this delta was stamped with.
    pub fn sequence(&self) -> SequenceId {
        self.sequence
    }

    /// Returns `true` if any collection holds at least one record.
    pub fn has_changes(&self) -> bool {
        !self.creations.is_empty()
            || !self.deletions.is_empty()
            || !self.location_deltas.is_empty()
            || !self.property_deltas.is_empty()
            || !self.cell_deltas.is_empty()
            || !self.viewer_deltas.is_empty()
    }

    /// Total number of records across all collections.
    pub fn change_count(&self) -> usize {
        self.creations.len()
            + self.deletions.len()
            + self.location_deltas.len()
            + self.property_deltas.len()
            + self.cell_deltas.len()
            + self.viewer_deltas.len()
    }

    /// Creations in the order they were recorded.
    pub fn creations(&self) -> &[EntityCreation] {
        self.creations.as_slice()
    }

    /// Deletions in the order they were recorded, duplicates included.
    pub fn deletions(&self) -> &[EntityId] {
        &self.deletions
    }

    /// Location deltas, ordered by each entity's last move.
    pub fn location_deltas(&self) -> &[LocationDelta] {
        self.location_deltas.as_slice()
    }

    /// Property deltas, ordered by each entity's first change.
    pub fn property_deltas(&self) -> &[PropertyDelta] {
        self.property_deltas.as_slice()
    }

    /// Cell deltas, ordered by each cell's last write.
    pub fn cell_deltas(&self) -> &[CellDelta] {
        self.cell_deltas.as_slice()
    }

    /// Viewer records in viewer-key order.
    pub fn viewer_deltas(&self) -> impl Iterator<Item = (&str, &ViewerDelta)> {
        self.viewer_deltas.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The creation record for `entity`, if it was created this tick.
    pub fn creation(&self, entity: EntityId) -> Option<&EntityCreation> {
        self.creations.get(entity)
    }

    /// The location delta for a pre-existing `entity`, if it moved.
    pub fn location_delta(&self, entity: EntityId) -> Option<&LocationDelta> {
        self.location_deltas.get(entity)
    }

    /// The property delta for a pre-existing `entity`, if it changed.
    pub fn property_delta(&self, entity: EntityId) -> Option<&PropertyDelta> {
        self.property_deltas.get(entity)
    }

    /// The cell delta at `(x, y)`, if its occupant changed.
    pub fn cell_delta(&self, x: i32, y: i32) -> Option<&CellDelta> {
        self.cell_deltas.get((x, y))
    }

    /// The record for `viewer`, if it was registered or its eye changed.
    pub fn viewer(&self, viewer: &str) -> Option<&ViewerDelta> {
        self.viewer_deltas.get(viewer)
    }

    /// BLAKE3 hex digest of the canonical JSON form.
    ///
    /// Two deltas built from the same sequence of record calls hash equal.
    pub fn content_hash(&self) -> String {
        let bytes =
            serde_json::to_vec(self).expect("DeltaState should always be JSON-serializable");
        blake3::hash(&bytes).to_hex().to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
