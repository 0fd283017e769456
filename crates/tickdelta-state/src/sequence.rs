//! Delta sequence identifiers.
//!
//! Every [`DeltaState`](crate::delta::DeltaState) is stamped with a
//! [`SequenceId`] drawn from a [`SequenceCounter`] owned by whoever drives the
//! tick loop. Viewers acknowledge deltas by sequence ID, so the counter never
//! wraps: once `u32::MAX` has been handed out it reports
//! [`DeltaError::SequenceExhausted`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::DeltaError;

// ---------------------------------------------------------------------------
// SequenceId
// ---------------------------------------------------------------------------

/// Monotonically increasing identifier of one delta state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceId(pub u32);

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SequenceCounter
// ---------------------------------------------------------------------------

/// Hands out [`SequenceId`]s in strictly increasing order.
#[derive(Debug, Clone)]
pub struct SequenceCounter {
    /// The value the next call to [`next`](Self::next) returns.
    next: u32,
    /// The last value handed out, `None` before the first call.
    last: Option<SequenceId>,
}

impl SequenceCounter {
    /// Create a counter whose first issued ID is `first`.
    pub fn starting_at(first: u32) -> Self {
        Self {
            next: first,
            last: None,
        }
    }

    /// Issue the next sequence ID.
    ///
    /// # Errors
    ///
    /// Returns [`DeltaError::SequenceExhausted`] once `u32::MAX` has already
    /// been issued.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<SequenceId, DeltaError> {
        if let Some(last) = self.last {
            if last.0 == u32::MAX {
                return Err(DeltaError::SequenceExhausted { last });
            }
        }
        let id = SequenceId(self.next);
        self.last = Some(id);
        self.next = self.next.saturating_add(1);
        Ok(id)
    }

    /// The ID the next call to [`next`](Self::next) would return, or `None`
    /// if the counter is exhausted.
    pub fn peek(&self) -> Option<SequenceId> {
        match self.last {
            Some(last) if last.0 == u32::MAX => None,
            _ => Some(SequenceId(self.next)),
        }
    }

    /// The last ID issued, or `None` before the first call.
    pub fn last_issued(&self) -> Option<SequenceId> {
        self.last
    }
}

impl Default for SequenceCounter {
    /// Starts at 1; 0 is reserved for "nothing acknowledged yet".
    fn default() -> Self {
        Self::starting_at(1)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issues_increasing_ids() {
        let mut counter = SequenceCounter::default();
        assert_eq!(counter.last_issued(), None);
        assert_eq!(counter.next().unwrap(), SequenceId(1));
        assert_eq!(counter.next().unwrap(), SequenceId(2));
        assert_eq!(counter.last_issued(), Some(SequenceId(2)));
        assert_eq!(counter.peek(), Some(SequenceId(3)));
    }

    #[test]
    fn exhausts_instead_of_wrapping() {
        let mut counter = SequenceCounter::starting_at(u32::MAX - 1);
        assert_eq!(counter.next().unwrap(), SequenceId(u32::MAX - 1));
        assert_eq!(counter.next().unwrap(), SequenceId(u32::MAX));
        assert_eq!(counter.peek(), None);

        let err = counter.next().unwrap_err();
        assert!(matches!(
            err,
            DeltaError::SequenceExhausted { last } if last == SequenceId(u32::MAX)
        ));
        // Stays exhausted.
        assert!(counter.next().is_err());
    }

    #[test]
    fn display_is_hash_prefixed() {
        assert_eq!(SequenceId(42).to_string(), "#42");
    }
}
