//! Notifications the session sends to its presentation layer.
//!
//! The session owns one [`EventSink`], injected at construction. Each event
//! carries the state a listener needs to redraw without querying back.

use serde::{Deserialize, Serialize};

use crate::dice::RollResult;
use crate::perk::Perk;

/// Something that happened in a game session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// A new game began.
    GameStarted {
        /// Starting roll budget.
        rolls: u32,
        /// First round target.
        target: i64,
    },
    /// A round began.
    RoundStarted {
        /// Round number (1-based).
        round: u32,
        /// Score needed to win the round.
        target: i64,
        /// Remaining roll budget.
        rolls_left: u32,
        /// Round score (always 0 at round start).
        score: i64,
    },
    /// Dice were rolled or rerolled and await confirmation.
    RollProduced {
        /// The full pending roll.
        results: RollResult,
        /// True if only some dice were rerolled.
        is_reroll: bool,
    },
    /// A confirmed roll was added to the round score.
    ScoreUpdated {
        /// Round score after the roll.
        score: i64,
        /// Points the roll contributed.
        delta: i64,
        /// Remaining roll budget.
        rolls_left: u32,
    },
    /// The round target was reached.
    RoundWon {
        /// The round that was won.
        round: u32,
        /// Final round score.
        score: i64,
    },
    /// The roll budget ran out before the target was reached.
    GameOver {
        /// The round that was lost.
        round: u32,
        /// Final round score.
        score: i64,
    },
    /// Perk rewards are on offer; input is blocked until one is resolved.
    PerkChoicesAvailable {
        /// The offered perks.
        choices: Vec<Perk>,
    },
    /// The inventory is full; a slot must be picked for the chosen perk.
    PerkReplacementRequired {
        /// The perk waiting for a slot.
        perk: Perk,
        /// The currently held perks.
        current: Vec<Perk>,
    },
    /// The held perks changed.
    PerkInventoryChanged {
        /// Held perks in scoring order.
        perks: Vec<Perk>,
    },
    /// The reroll budget changed.
    RerollsUpdated {
        /// Remaining rerolls this round.
        count: u32,
    },
    /// Presentation finished; dice may be selected for reroll.
    RerollSelectionReady {
        /// Remaining rerolls this round.
        rerolls: u32,
    },
}

impl std::fmt::Display for GameEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GameStarted { rolls, target } => {
                write!(f, "Game started: {rolls} rolls, first target {target}")
            }
            Self::RoundStarted {
                round,
                target,
                rolls_left,
                ..
            } => write!(f, "Round {round}: reach {target} ({rolls_left} rolls left)"),
            Self::RollProduced { results, is_reroll } => {
                if *is_reroll {
                    write!(f, "Rerolled: {results}")
                } else {
                    write!(f, "Rolled: {results}")
                }
            }
            Self::ScoreUpdated {
                score,
                delta,
                rolls_left,
            } => write!(f, "+{delta} points, score {score} ({rolls_left} rolls left)"),
            Self::RoundWon { round, score } => write!(f, "Round {round} won with {score}!"),
            Self::GameOver { round, score } => {
                write!(f, "Game over in round {round} with {score} points")
            }
            Self::PerkChoicesAvailable { choices } => {
                let names: Vec<&str> = choices.iter().map(|p| p.name.as_str()).collect();
                write!(f, "Choose a perk: {}", names.join(", "))
            }
            Self::PerkReplacementRequired { perk, .. } => {
                write!(f, "Perks full: pick a slot for {}", perk.name)
            }
            Self::PerkInventoryChanged { perks } => {
                let names: Vec<&str> = perks.iter().map(|p| p.name.as_str()).collect();
                write!(f, "Perks: [{}]", names.join(", "))
            }
            Self::RerollsUpdated { count } => write!(f, "Rerolls left: {count}"),
            Self::RerollSelectionReady { rerolls } => {
                write!(f, "Select dice to reroll ({rerolls} left)")
            }
        }
    }
}

/// Receives session notifications.
pub trait EventSink {
    /// Handle one event. Called synchronously during the session call that
    /// produced it.
    fn notify(&mut self, event: &GameEvent);
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn notify(&mut self, event: &GameEvent) {
        (**self).notify(event);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn notify(&mut self, _event: &GameEvent) {}
}

/// Records events in order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<GameEvent>,
    max_events: usize,
}

impl EventLog {
    /// Create a new event log with the given maximum capacity (0 = unlimited).
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events,
        }
    }

    /// Append an event, dropping the oldest events if the log exceeds its capacity.
    pub fn push(&mut self, event: GameEvent) {
        self.events.push(event);
        if self.max_events > 0 && self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(..drain_count);
        }
    }

    /// Capacity of the log (0 = unlimited).
    pub fn max_events(&self) -> usize {
        self.max_events
    }

    /// All recorded events, oldest first.
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// The most recent event.
    pub fn last(&self) -> Option<&GameEvent> {
        self.events.last()
    }

    /// Return the number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Return `true` if no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Remove all recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Remove and return all recorded events.
    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

impl EventSink for EventLog {
    fn notify(&mut self, event: &GameEvent) {
        self.push(event.clone());
    }
}
