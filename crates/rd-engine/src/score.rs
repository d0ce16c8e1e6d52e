//! Score computation.
//!
//! A roll scores the sum of its dice, then every held perk rewrites that
//! score in turn. The result depends on perk order.

use serde::{Deserialize, Serialize};

use crate::perk::{Perk, PerkKind};

/// One perk's effect on the running score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreStep {
    /// The perk applied.
    pub kind: PerkKind,
    /// Its display name.
    pub name: String,
    /// Score handed to the perk.
    pub before: i64,
    /// Score the perk returned.
    pub after: i64,
}

impl ScoreStep {
    /// Returns true if the perk changed the score.
    pub fn triggered(&self) -> bool {
        self.before != self.after
    }
}

/// How a roll's score was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Sum of the dice.
    pub base: i64,
    /// Perk applications in order.
    pub steps: Vec<ScoreStep>,
    /// Final score.
    pub total: i64,
}

/// Score a roll against an ordered list of perks.
pub fn compute_score(dice: &[u32], perks: &[Perk]) -> i64 {
    score_breakdown(dice, perks).total
}

/// Score a roll and record every perk step.
pub fn score_breakdown(dice: &[u32], perks: &[Perk]) -> ScoreBreakdown {
    let base: i64 = dice.iter().map(|&v| i64::from(v)).sum();
    let mut score = base;
    let mut steps = Vec::with_capacity(perks.len());

    for perk in perks {
        let before = score;
        score = perk.modify(score, dice);
        if before != score {
            tracing::debug!(perk = %perk.name, before, after = score, "perk modified score");
        }
        steps.push(ScoreStep {
            kind: perk.kind,
            name: perk.name.clone(),
            before,
            after: score,
        });
    }

    tracing::debug!(?dice, base, total = score, "scored roll");
    ScoreBreakdown {
        base,
        steps,
        total: score,
    }
}
