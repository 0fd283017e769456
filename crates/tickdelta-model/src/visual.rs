//! Visual appearance records.
//!
//! [`VisualProperties`] is the appearance of an entity or of one of its
//! overlays. Every field is optional: a value of `None` means "not touched",
//! which lets the same type serve as a full appearance (for newly created
//! entities) and as a sparse change set (for entities that already exist on
//! the viewer's side).
//!
//! The delta layer never interprets these fields. It only assigns them one
//! at a time ([`set_icon_state`](VisualProperties::set_icon_state),
//! [`set_direction`](VisualProperties::set_direction)) or overlays one record
//! onto another ([`merge_from`](VisualProperties::merge_from)).

use serde::{Deserialize, Serialize};

use crate::ModelError;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Facing direction of an icon.
///
/// Discriminants are bit flags: cardinal directions occupy one bit each and
/// diagonals are the union of their two cardinals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    North = 1,
    South = 2,
    East = 4,
    West = 8,
    Northeast = 5,
    Southeast = 6,
    Northwest = 9,
    Southwest = 10,
}

impl Direction {
    /// The raw bit-flag value.
    #[inline]
    pub fn bits(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Direction {
    type Error = ModelError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            1 => Ok(Direction::North),
            2 => Ok(Direction::South),
            4 => Ok(Direction::East),
            8 => Ok(Direction::West),
            5 => Ok(Direction::Northeast),
            6 => Ok(Direction::Southeast),
            9 => Ok(Direction::Northwest),
            10 => Ok(Direction::Southwest),
            other => Err(ModelError::InvalidDirection { bits: other }),
        }
    }
}

// ---------------------------------------------------------------------------
// ScreenPoint
// ---------------------------------------------------------------------------

/// Anchor of a screen-space (HUD) entity, in screen tiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

// ---------------------------------------------------------------------------
// VisualProperties
// ---------------------------------------------------------------------------

/// Appearance of an entity or overlay. `None` fields are untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualProperties {
    /// Icon resource path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Named state within the icon (animation or pose).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    /// Horizontal pixel offset from the tile origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_x: Option<i32>,
    /// Vertical pixel offset from the tile origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_y: Option<i32>,
    /// Color multiplier, as an `#rrggbb` string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Draw layer. Higher layers draw on top.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<f32>,
}

impl VisualProperties {
    /// An empty record: every field untouched.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no field has been touched.
    pub fn is_empty(&self) -> bool {
        self.icon.is_none()
            && self.icon_state.is_none()
            && self.direction.is_none()
            && self.pixel_x.is_none()
            && self.pixel_y.is_none()
            && self.color.is_none()
            && self.layer.is_none()
    }

    pub fn set_icon_state(&mut self, state: impl Into<String>) {
        self.icon_state = Some(state.into());
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = Some(direction);
    }

    /// Builder form of setting `icon`.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Builder form of [`set_icon_state`](Self::set_icon_state).
    pub fn with_icon_state(mut self, state: impl Into<String>) -> Self {
        self.set_icon_state(state);
        self
    }

    /// Builder form of [`set_direction`](Self::set_direction).
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.set_direction(direction);
        self
    }

    /// Builder form of setting `layer`.
    pub fn with_layer(mut self, layer: f32) -> Self {
        self.layer = Some(layer);
        self
    }

    /// Copy every touched field of `other` into `self`.
    ///
    /// Untouched fields of `other` leave the corresponding field of `self`
    /// alone, so applying a series of sparse records in order yields
    /// last-write-wins per field.
    pub fn merge_from(&mut self, other: &VisualProperties) {
        if let Some(icon) = &other.icon {
            self.icon = Some(icon.clone());
        }
        if let Some(state) = &other.icon_state {
            self.icon_state = Some(state.clone());
        }
        if let Some(direction) = other.direction {
            self.direction = Some(direction);
        }
        if let Some(px) = other.pixel_x {
            self.pixel_x = Some(px);
        }
        if let Some(py) = other.pixel_y {
            self.pixel_y = Some(py);
        }
        if let Some(color) = &other.color {
            self.color = Some(color.clone());
        }
        if let Some(layer) = other.layer {
            self.layer = Some(layer);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- 1. Direction bits --------------------------------------------------

    #[test]
    fn diagonal_bits_are_union_of_cardinals() {
        assert_eq!(
            Direction::Northeast.bits(),
            Direction::North.bits() | Direction::East.bits()
        );
        assert_eq!(
            Direction::Southwest.bits(),
            Direction::South.bits() | Direction::West.bits()
        );
    }

    #[test]
    fn direction_try_from_roundtrip_and_reject() {
        for dir in [
            Direction::North,
            Direction::South,
            Direction::East,
            Direction::West,
            Direction::Northeast,
            Direction::Southeast,
            Direction::Northwest,
            Direction::Southwest,
        ] {
            assert_eq!(Direction::try_from(dir.bits()).unwrap(), dir);
        }

        let err = Direction::try_from(3).unwrap_err();
        assert!(matches!(err, ModelError::InvalidDirection { bits: 3 }));
    }

    // -- 2. Merge -----------------------------------------------------------

    #[test]
    fn merge_overwrites_only_touched_fields() {
        let mut base = VisualProperties::new()
            .with_icon("mob.dmi")
            .with_icon_state("idle")
            .with_direction(Direction::South);

        let change = VisualProperties::new().with_icon_state("walk");
        base.merge_from(&change);

        assert_eq!(base.icon.as_deref(), Some("mob.dmi"));
        assert_eq!(base.icon_state.as_deref(), Some("walk"));
        assert_eq!(base.direction, Some(Direction::South));
    }

    #[test]
    fn merge_of_empty_is_noop() {
        let mut base = VisualProperties::new().with_layer(4.0);
        let before = base.clone();
        base.merge_from(&VisualProperties::new());
        assert_eq!(base, before);
    }

    // -- 3. Serialization ---------------------------------------------------

    #[test]
    fn untouched_fields_are_omitted_from_json() {
        let props = VisualProperties::new().with_icon_state("walk");
        let json = serde_json::to_value(&props).unwrap();
        assert_eq!(json, serde_json::json!({"icon_state": "walk"}));

        let back: VisualProperties = serde_json::from_value(json).unwrap();
        assert_eq!(back, props);
    }
}
