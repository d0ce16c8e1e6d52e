//! The perk catalog and reward choice generation.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::{Perk, PerkInventory, PerkKind};
use crate::error::{EngineError, EngineResult};

/// Every perk that can be offered as a round reward.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerkCatalog {
    perks: Vec<Perk>,
}

impl PerkCatalog {
    /// Create a catalog from perk definitions.
    pub fn new(perks: Vec<Perk>) -> Self {
        Self { perks }
    }

    /// The reference catalog: one perk of every kind.
    pub fn standard() -> Self {
        Self::new(PerkKind::ALL.into_iter().map(Perk::standard).collect())
    }

    /// Load a catalog from a JSON array of perk definitions.
    ///
    /// ```json
    /// [{ "kind": "twins", "name": "Twins", "description": "...", "rarity": "common" }]
    /// ```
    pub fn from_json(json: &str) -> EngineResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidConfig(format!("perk catalog: {e}")))
    }

    /// All definitions in catalog order.
    pub fn perks(&self) -> &[Perk] {
        &self.perks
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.perks.len()
    }

    /// Returns true if the catalog has no perks.
    pub fn is_empty(&self) -> bool {
        self.perks.is_empty()
    }

    /// The first definition of a kind.
    pub fn find(&self, kind: PerkKind) -> Option<&Perk> {
        self.perks.iter().find(|p| p.kind == kind)
    }

    /// Draw up to `count` distinct reward choices the player does not own.
    ///
    /// Perks whose kind is already held are filtered out, the rest are
    /// shuffled, and the first `count` of distinct kinds are returned. An
    /// empty result means there is nothing left to offer.
    pub fn random_choices(
        &self,
        inventory: &PerkInventory,
        count: usize,
        rng: &mut StdRng,
    ) -> Vec<Perk> {
        let owned: HashSet<PerkKind> = inventory.perks().iter().map(|p| p.kind).collect();
        let mut eligible: Vec<&Perk> = self
            .perks
            .iter()
            .filter(|p| !owned.contains(&p.kind))
            .collect();

        if eligible.is_empty() {
            tracing::warn!(owned = owned.len(), "no eligible perks to offer");
            return Vec::new();
        }

        eligible.shuffle(rng);
        let mut offered = HashSet::new();
        let choices: Vec<Perk> = eligible
            .into_iter()
            .filter(|p| offered.insert(p.kind))
            .take(count)
            .cloned()
            .collect();
        tracing::debug!(
            choices = ?choices.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            excluded = owned.len(),
            "generated perk choices"
        );
        choices
    }
}
