//! Tickdelta Model -- shared identifier and appearance types.
//!
//! This crate holds the value types the delta layer records changes to:
//!
//! - [`ids`]: opaque 16-bit identifiers for entities, base templates,
//!   locations and overlay slots, plus the [`LocationId::UNSET`] sentinel.
//! - [`visual`]: [`VisualProperties`], the sparse appearance record, along
//!   with [`Direction`] and [`ScreenPoint`].
//!
//! [`LocationId::UNSET`]: ids::LocationId::UNSET
//! [`VisualProperties`]: visual::VisualProperties
//! [`Direction`]: visual::Direction
//! [`ScreenPoint`]: visual::ScreenPoint

#![deny(unsafe_code)]

pub mod ids;
pub mod visual;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced when decoding model values from raw data.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A direction byte did not match any of the eight compass directions.
    #[error("invalid direction bits {bits:#04x}: expected one of 1, 2, 4, 5, 6, 8, 9, 10")]
    InvalidDirection { bits: u8 },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::ids::{BaseId, EntityId, LocationId, OverlayId};
    pub use crate::visual::{Direction, ScreenPoint, VisualProperties};
    pub use crate::ModelError;
}
