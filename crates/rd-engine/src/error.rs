//! Error types for the Rogue Dice engine.

use crate::perk::PerkKind;

/// Errors that can occur when driving a game session.
///
/// Every variant is recoverable: the rejected call leaves the session
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The operation is not legal in the current session state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The perk inventory is full.
    #[error("perk inventory is full ({max} perks)")]
    CapacityExceeded {
        /// The inventory capacity.
        max: usize,
    },

    /// A perk of this kind is already held.
    #[error("a {0} perk is already held")]
    DuplicateType(PerkKind),

    /// An index does not address an existing die or perk slot.
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// The length of the addressed sequence.
        len: usize,
    },

    /// A reorder request is not a permutation of the current slots.
    #[error("invalid permutation: {0}")]
    InvalidPermutation(String),

    /// Game configuration or catalog data is malformed.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Convenience result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
