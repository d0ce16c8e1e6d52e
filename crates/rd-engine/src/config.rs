//! Configuration for a game session.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Tunable rules for a game session.
///
/// Every field has a default, so a JSON config only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// RNG seed for reproducible dice and perk offers.
    pub seed: u64,
    /// Dice rolled per roll.
    pub dice_count: usize,
    /// Faces per die.
    pub sides_per_die: u32,
    /// Rolls available at the start of a game.
    pub starting_rolls: u32,
    /// Score needed to win the first round.
    pub starting_target_score: i64,
    /// How much the target grows each round.
    pub target_score_increment: i64,
    /// Rolls granted for winning a round.
    pub rolls_rewarded_per_round: u32,
    /// Rerolls available at the start of each round.
    pub starting_rerolls: u32,
    /// Maximum number of held perks.
    pub max_player_perks: usize,
    /// Perks offered after each round win.
    pub perk_choice_count: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            dice_count: 2,
            sides_per_die: 6,
            starting_rolls: 10,
            starting_target_score: 15,
            target_score_increment: 5,
            rolls_rewarded_per_round: 3,
            starting_rerolls: 3,
            max_player_perks: 5,
            perk_choice_count: 3,
        }
    }
}

impl GameConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidConfig(format!("game config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the rules describe a playable game.
    pub fn validate(&self) -> EngineResult<()> {
        if self.dice_count == 0 {
            return Err(EngineError::InvalidConfig(
                "dice_count must be at least 1".to_string(),
            ));
        }
        if self.sides_per_die < 2 {
            return Err(EngineError::InvalidConfig(
                "sides_per_die must be at least 2".to_string(),
            ));
        }
        if self.target_score_increment <= 0 {
            return Err(EngineError::InvalidConfig(
                "target_score_increment must be positive".to_string(),
            ));
        }
        if self.max_player_perks == 0 {
            return Err(EngineError::InvalidConfig(
                "max_player_perks must be at least 1".to_string(),
            ));
        }
        if self.perk_choice_count == 0 {
            return Err(EngineError::InvalidConfig(
                "perk_choice_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set how many dice are rolled and how many faces each has.
    pub fn with_dice(mut self, count: usize, sides: u32) -> Self {
        self.dice_count = count;
        self.sides_per_die = sides;
        self
    }

    /// Set the starting roll budget.
    pub fn with_starting_rolls(mut self, rolls: u32) -> Self {
        self.starting_rolls = rolls;
        self
    }

    /// Set the first target and how much it grows per round.
    pub fn with_target(mut self, starting: i64, increment: i64) -> Self {
        self.starting_target_score = starting;
        self.target_score_increment = increment;
        self
    }

    /// Set the rolls granted for a round win.
    pub fn with_roll_reward(mut self, rolls: u32) -> Self {
        self.rolls_rewarded_per_round = rolls;
        self
    }

    /// Set the per-round reroll budget.
    pub fn with_rerolls(mut self, rerolls: u32) -> Self {
        self.starting_rerolls = rerolls;
        self
    }

    /// Set perk capacity and the number of choices offered per win.
    pub fn with_perk_limits(mut self, max_perks: usize, choices: usize) -> Self {
        self.max_player_perks = max_perks;
        self.perk_choice_count = choices;
        self
    }
}
