//! Perks: scoring modifiers the player collects between rounds.
//!
//! A perk's behavior is selected by its [`PerkKind`]. Every kind implements
//! the same contract, `modify(score, dice) -> score`, and perks are applied
//! in the order the player holds them. Kinds do not generally commute:
//! doubling before adding a bonus gives a different total than adding the
//! bonus first.

pub mod catalog;
pub mod inventory;

pub use catalog::PerkCatalog;
pub use inventory::PerkInventory;

use serde::{Deserialize, Serialize};

/// How rare a perk is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    /// Offered often.
    #[default]
    Common,
    /// Offered occasionally.
    Uncommon,
    /// Offered rarely.
    Rare,
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Common => write!(f, "Common"),
            Self::Uncommon => write!(f, "Uncommon"),
            Self::Rare => write!(f, "Rare"),
        }
    }
}

/// The scoring rule a perk applies. Also its identity for uniqueness.
///
/// The shipped kinds only fire on a roll of exactly two dice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerkKind {
    /// The two dice sum to 7: double the score.
    LuckySeven,
    /// The two dice differ by exactly 1: add [`PerkKind::STEADY_HAND_BONUS`].
    SteadyHand,
    /// The two dice match: add their combined face value.
    Twins,
}

impl PerkKind {
    /// Bonus granted by [`PerkKind::SteadyHand`].
    pub const STEADY_HAND_BONUS: i64 = 3;

    /// Every kind the engine knows about.
    pub const ALL: [PerkKind; 3] = [Self::LuckySeven, Self::SteadyHand, Self::Twins];

    /// Apply this rule to a running score.
    pub fn modify(self, score: i64, dice: &[u32]) -> i64 {
        let [a, b] = dice else {
            return score;
        };
        let (a, b) = (i64::from(*a), i64::from(*b));
        match self {
            Self::LuckySeven if a + b == 7 => score * 2,
            Self::SteadyHand if (a - b).abs() == 1 => score + Self::STEADY_HAND_BONUS,
            Self::Twins if a == b => score + a + b,
            _ => score,
        }
    }
}

impl std::fmt::Display for PerkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LuckySeven => write!(f, "lucky_seven"),
            Self::SteadyHand => write!(f, "steady_hand"),
            Self::Twins => write!(f, "twins"),
        }
    }
}

/// A catalog entry: display data plus the rule it applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perk {
    /// The rule, and the identity used for uniqueness.
    pub kind: PerkKind,
    /// Display name.
    pub name: String,
    /// Player-facing description of the effect.
    pub description: String,
    /// How rare the perk is.
    #[serde(default)]
    pub rarity: Rarity,
}

impl Perk {
    /// Create a perk definition.
    pub fn new(
        kind: PerkKind,
        name: impl Into<String>,
        description: impl Into<String>,
        rarity: Rarity,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            description: description.into(),
            rarity,
        }
    }

    /// The reference definition for a kind.
    pub fn standard(kind: PerkKind) -> Self {
        match kind {
            PerkKind::LuckySeven => Self::new(
                kind,
                "Lucky 7",
                "If the dice add to 7, double your score for that roll.",
                Rarity::Rare,
            ),
            PerkKind::SteadyHand => Self::new(
                kind,
                "Steady Hand",
                "If your dice are within 1 point of each other, gain 3 bonus points.",
                Rarity::Uncommon,
            ),
            PerkKind::Twins => Self::new(
                kind,
                "Twins",
                "Doubles are worth twice as much: add both dice again when they match.",
                Rarity::Common,
            ),
        }
    }

    /// Apply this perk to a running score.
    pub fn modify(&self, score: i64, dice: &[u32]) -> i64 {
        self.kind.modify(score, dice)
    }
}

impl std::fmt::Display for Perk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.rarity)
    }
}
