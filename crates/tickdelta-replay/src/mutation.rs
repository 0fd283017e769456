//! Serializable record calls.
//!
//! A [`Mutation`] is one call to a `record_*` method of
//! [`DeltaState`], captured as data so that a tick's worth of calls can be
//! stored, shipped to a test fixture and replayed later.

use serde::{Deserialize, Serialize};
use tickdelta_model::ids::{BaseId, EntityId, LocationId, OverlayId};
use tickdelta_model::visual::{Direction, ScreenPoint, VisualProperties};
use tickdelta_state::delta::DeltaState;

/// One record call against a [`DeltaState`].
///
/// Serialized as an internally tagged object, e.g.
/// `{"op": "move", "entity": 7, "location": 42}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// [`DeltaState::record_creation`].
    Create {
        entity: EntityId,
        base: BaseId,
    },
    /// [`DeltaState::record_deletion`].
    Delete {
        entity: EntityId,
    },
    /// [`DeltaState::record_location_change`].
    Move {
        entity: EntityId,
        location: LocationId,
    },
    /// [`DeltaState::record_icon_state_change`].
    IconState {
        entity: EntityId,
        state: String,
    },
    /// [`DeltaState::record_direction_change`].
    Direction {
        entity: EntityId,
        direction: Direction,
    },
    /// [`DeltaState::record_visual_change`].
    Visual {
        entity: EntityId,
        props: VisualProperties,
    },
    /// [`DeltaState::record_screen_location_change`].
    ScreenLocation {
        entity: EntityId,
        point: ScreenPoint,
    },
    /// [`DeltaState::record_overlay_add`].
    OverlayAdd {
        entity: EntityId,
        slot: OverlayId,
        props: VisualProperties,
    },
    /// [`DeltaState::record_overlay_remove`].
    OverlayRemove {
        entity: EntityId,
        slot: OverlayId,
    },
    /// [`DeltaState::record_cell_occupant`].
    CellOccupant {
        x: i32,
        y: i32,
        occupant: EntityId,
    },
    /// [`DeltaState::register_viewer`].
    RegisterViewer {
        viewer: String,
    },
    /// [`DeltaState::record_viewer_eye_change`].
    ViewerEye {
        viewer: String,
        eye: EntityId,
    },
}

/// Perform `mutation` on `delta`.
pub fn apply(delta: &mut DeltaState, mutation: &Mutation) {
    match mutation {
        Mutation::Create { entity, base } => delta.record_creation(*entity, *base),
        Mutation::Delete { entity } => delta.record_deletion(*entity),
        Mutation::Move { entity, location } => delta.record_location_change(*entity, *location),
        Mutation::IconState { entity, state } => {
            delta.record_icon_state_change(*entity, state.as_str())
        }
        Mutation::Direction { entity, direction } => {
            delta.record_direction_change(*entity, *direction)
        }
        Mutation::Visual { entity, props } => delta.record_visual_change(*entity, props),
        Mutation::ScreenLocation { entity, point } => {
            delta.record_screen_location_change(*entity, *point)
        }
        Mutation::OverlayAdd {
            entity,
            slot,
            props,
        } => delta.record_overlay_add(*entity, *slot, props.clone()),
        Mutation::OverlayRemove { entity, slot } => delta.record_overlay_remove(*entity, *slot),
        Mutation::CellOccupant { x, y, occupant } => delta.record_cell_occupant(*x, *y, *occupant),
        Mutation::RegisterViewer { viewer } => delta.register_viewer(viewer),
        Mutation::ViewerEye { viewer, eye } => delta.record_viewer_eye_change(viewer, *eye),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
