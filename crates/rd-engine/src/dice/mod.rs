//! Dice rolling with an injectable random source.
//!
//! [`DiceRoller`] owns the last roll and supports full rolls and rerolls of
//! individual positions. Faces come from a [`DieSource`]: [`RandomDice`] for
//! play, [`ScriptedDice`] when a test needs to know exactly what comes up.

pub mod roll;

pub use roll::RollResult;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{EngineError, EngineResult};

/// Produces single die faces.
pub trait DieSource: std::fmt::Debug {
    /// Roll one die with the given number of sides (1 to `sides` inclusive).
    ///
    /// A die with zero sides is treated as one-sided.
    fn roll_die(&mut self, sides: u32) -> u32;
}

/// Uniform faces from a seeded [`StdRng`].
#[derive(Debug, Clone)]
pub struct RandomDice {
    rng: StdRng,
}

impl RandomDice {
    /// Create a source seeded for reproducible play.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl DieSource for RandomDice {
    fn roll_die(&mut self, sides: u32) -> u32 {
        self.rng.random_range(1..=sides.max(1))
    }
}

/// Replays a fixed list of faces, cycling when it runs out.
///
/// Faces are clamped to the die being rolled.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    faces: Vec<u32>,
    next: usize,
}

impl ScriptedDice {
    /// Create a source that yields `faces` in order.
    pub fn new(faces: impl Into<Vec<u32>>) -> Self {
        Self {
            faces: faces.into(),
            next: 0,
        }
    }
}

impl DieSource for ScriptedDice {
    fn roll_die(&mut self, sides: u32) -> u32 {
        if self.faces.is_empty() {
            return 1;
        }
        let face = self.faces[self.next % self.faces.len()];
        self.next += 1;
        face.clamp(1, sides.max(1))
    }
}

/// Rolls a fixed number of identical dice and remembers the last result.
#[derive(Debug)]
pub struct DiceRoller {
    dice_count: usize,
    sides: u32,
    last: RollResult,
    source: Box<dyn DieSource>,
}

impl DiceRoller {
    /// Create a roller for `dice_count` dice with `sides` faces each.
    pub fn new(dice_count: usize, sides: u32, source: Box<dyn DieSource>) -> Self {
        Self {
            dice_count,
            sides,
            last: RollResult::default(),
            source,
        }
    }

    /// Number of dice rolled at once.
    pub fn dice_count(&self) -> usize {
        self.dice_count
    }

    /// Number of sides per die.
    pub fn sides(&self) -> u32 {
        self.sides
    }

    /// The most recent result, empty before the first roll.
    pub fn last(&self) -> &RollResult {
        &self.last
    }

    /// Forget the last result.
    pub fn clear(&mut self) {
        self.last = RollResult::default();
    }

    /// Roll every die, replacing the previous result.
    pub fn roll(&mut self) -> RollResult {
        self.roll_pool(self.dice_count, self.sides)
    }

    /// Roll `count` dice with `sides` faces, replacing the previous result.
    ///
    /// The roller keeps the new shape for later rolls and rerolls.
    pub fn roll_pool(&mut self, count: usize, sides: u32) -> RollResult {
        self.dice_count = count;
        self.sides = sides;
        tracing::debug!(count, sides, "rolling dice");
        let values = (0..count).map(|_| self.source.roll_die(sides)).collect();
        self.last = RollResult::new(values);
        tracing::debug!(result = %self.last, "roll complete");
        self.last.clone()
    }

    /// Reroll the dice at `indices` in `previous`, keeping all other faces.
    ///
    /// Indices outside the result are skipped with a warning. Fails with
    /// [`EngineError::InvalidState`] when there is nothing to reroll.
    pub fn reroll(&mut self, previous: &RollResult, indices: &[usize]) -> EngineResult<RollResult> {
        if previous.is_empty() {
            tracing::warn!("cannot reroll: no previous roll");
            return Err(EngineError::InvalidState(
                "no previous roll to reroll".to_string(),
            ));
        }

        let mut result = previous.clone();
        for &index in indices {
            if index < result.len() {
                let value = self.source.roll_die(self.sides);
                result.set(index, value);
                tracing::debug!(index, value, "rerolled die");
            } else {
                tracing::warn!(index, len = result.len(), "ignoring out-of-range reroll index");
            }
        }
        self.last = result.clone();
        Ok(result)
    }
}
