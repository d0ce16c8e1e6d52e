//! The player's held perks.

use serde::{Deserialize, Serialize};

use super::{Perk, PerkKind};
use crate::error::{EngineError, EngineResult};

/// An ordered, capacity-limited collection of perks, unique by kind.
///
/// Order is scoring order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerkInventory {
    perks: Vec<Perk>,
    max: usize,
}

impl PerkInventory {
    /// Create an empty inventory holding at most `max` perks.
    pub fn new(max: usize) -> Self {
        Self {
            perks: Vec::new(),
            max,
        }
    }

    /// The held perks in scoring order.
    pub fn perks(&self) -> &[Perk] {
        &self.perks
    }

    /// The perk in a given slot.
    pub fn get(&self, index: usize) -> Option<&Perk> {
        self.perks.get(index)
    }

    /// Number of held perks.
    pub fn len(&self) -> usize {
        self.perks.len()
    }

    /// Returns true if no perks are held.
    pub fn is_empty(&self) -> bool {
        self.perks.is_empty()
    }

    /// Maximum number of perks.
    pub fn capacity(&self) -> usize {
        self.max
    }

    /// Returns true if another perk fits.
    pub fn can_add(&self) -> bool {
        self.perks.len() < self.max
    }

    /// Returns true if a perk of this kind is held.
    pub fn contains_kind(&self, kind: PerkKind) -> bool {
        self.perks.iter().any(|p| p.kind == kind)
    }

    /// Append a perk at the end of the scoring order.
    pub fn add(&mut self, perk: Perk) -> EngineResult<()> {
        if !self.can_add() {
            tracing::warn!(perk = %perk.name, max = self.max, "cannot add perk: inventory full");
            return Err(EngineError::CapacityExceeded { max: self.max });
        }
        if self.contains_kind(perk.kind) {
            tracing::warn!(perk = %perk.name, "cannot add perk: kind already held");
            return Err(EngineError::DuplicateType(perk.kind));
        }
        tracing::debug!(perk = %perk.name, total = self.perks.len() + 1, "added perk");
        self.perks.push(perk);
        Ok(())
    }

    /// Overwrite the perk in slot `index`, keeping every other slot in place.
    ///
    /// Returns the perk that was replaced.
    pub fn replace(&mut self, index: usize, perk: Perk) -> EngineResult<Perk> {
        if index >= self.perks.len() {
            tracing::warn!(index, len = self.perks.len(), "invalid perk slot for replacement");
            return Err(EngineError::IndexOutOfRange {
                index,
                len: self.perks.len(),
            });
        }
        let duplicate = self
            .perks
            .iter()
            .enumerate()
            .any(|(i, p)| i != index && p.kind == perk.kind);
        if duplicate {
            tracing::warn!(perk = %perk.name, "cannot replace: kind already held in another slot");
            return Err(EngineError::DuplicateType(perk.kind));
        }
        let old = std::mem::replace(&mut self.perks[index], perk);
        tracing::debug!(old = %old.name, new = %self.perks[index].name, index, "replaced perk");
        Ok(old)
    }

    /// Drop every held perk.
    pub fn clear(&mut self) {
        let count = self.perks.len();
        self.perks.clear();
        tracing::debug!(count, "cleared perks");
    }

    /// Rearrange the perks: slot `i` afterwards holds the perk previously at
    /// `new_order[i]`.
    pub fn reorder(&mut self, new_order: &[usize]) -> EngineResult<()> {
        let len = self.perks.len();
        if new_order.len() != len {
            return Err(EngineError::InvalidPermutation(format!(
                "expected {len} indices, got {}",
                new_order.len()
            )));
        }
        let mut seen = vec![false; len];
        for &index in new_order {
            match seen.get_mut(index) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => {
                    return Err(EngineError::InvalidPermutation(format!(
                        "index {index} appears more than once"
                    )));
                }
                None => {
                    return Err(EngineError::InvalidPermutation(format!(
                        "index {index} out of range (len {len})"
                    )));
                }
            }
        }
        self.perks = new_order.iter().map(|&i| self.perks[i].clone()).collect();
        tracing::debug!(?new_order, "reordered perks");
        Ok(())
    }
}
