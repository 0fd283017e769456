//! Session-scoped identifiers.
//!
//! Every identifier the delta layer deals with is an opaque 16-bit value
//! handed out by an allocator that lives outside this crate. The newtypes
//! exist so that an entity ID cannot be passed where a location ID is
//! expected; none of them carry any meaning beyond equality and hashing.
//!
//! [`LocationId::UNSET`] is the one reserved value: it marks an entity that
//! has been created but not yet placed anywhere.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u16);

        impl $name {
            /// Raw `u16` representation.
            #[inline]
            pub fn to_raw(self) -> u16 {
                self.0
            }
        }

        impl From<u16> for $name {
            #[inline]
            fn from(raw: u16) -> Self {
                Self(raw)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifier newtypes
// ---------------------------------------------------------------------------

id_newtype!(
    /// Identifies a simulated entity for the lifetime of a session.
    EntityId,
    "EntityId"
);

id_newtype!(
    /// Identifies the base template an entity was instantiated from.
    BaseId,
    "BaseId"
);

id_newtype!(
    /// Identifies the container (another entity, a cell, ...) an entity sits in.
    LocationId,
    "LocationId"
);

id_newtype!(
    /// Identifies one overlay slot on an entity.
    OverlayId,
    "OverlayId"
);

impl LocationId {
    /// Sentinel for "no location assigned yet".
    pub const UNSET: LocationId = LocationId(0xFFFF);

    /// Returns `true` unless this is [`LocationId::UNSET`].
    #[inline]
    pub fn is_set(self) -> bool {
        self != Self::UNSET
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
