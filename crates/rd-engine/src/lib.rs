//! Game engine for Rogue Dice.
//!
//! A roguelike dice-scoring game: roll dice toward a rising round target
//! under a limited roll budget, reroll individual dice, and collect perks
//! that rewrite each roll's score in the order they are held.
//!
//! [`GameSession`] drives the game and reports every state change to an
//! [`EventSink`].

pub mod config;
pub mod dice;
pub mod error;
pub mod event;
pub mod perk;
pub mod score;
pub mod session;

pub use config::GameConfig;
pub use dice::{DiceRoller, DieSource, RandomDice, RollResult, ScriptedDice};
pub use error::{EngineError, EngineResult};
pub use event::{EventLog, EventSink, GameEvent, NullSink};
pub use perk::{Perk, PerkCatalog, PerkInventory, PerkKind, Rarity};
pub use score::{ScoreBreakdown, ScoreStep, compute_score, score_breakdown};
pub use session::{
    Confirmation, DEFAULT_EVENT_CAPACITY, GameSession, PerkDecision, Phase, RoundOutcome,
    SessionSnapshot,
};
