//! Game session: the round, roll, and perk state machine.
//!
//! `GameSession` owns every piece of mutable game state and is the only
//! thing that changes it. Callers drive it one call at a time; each call
//! either applies completely or is rejected with the state untouched.
//!
//! ```text
//! Idle ──start_game──▶ Rolling ──roll_dice──▶ PendingConfirm ──perform_reroll──┐
//!                        ▲                      │        ▲                     │
//!                        │                      │        └─────────────────────┘
//!                        │                 confirm_roll
//!                        │          ┌───────────┼────────────┐
//!                        │        short        won          out of rolls
//!                        └──────────┘           │               │
//!                        ▲              AwaitingPerkChoice   GameOver
//!                        │                      │
//!                        └── chosen / replaced / cancelled (next round)
//! ```

use std::collections::BTreeSet;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::dice::{DiceRoller, DieSource, RandomDice, RollResult};
use crate::error::{EngineError, EngineResult};
use crate::event::{EventLog, EventSink, GameEvent};
use crate::perk::{Perk, PerkCatalog, PerkInventory};
use crate::score::{ScoreBreakdown, score_breakdown};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No game has been started.
    Idle,
    /// Waiting for a roll.
    Rolling,
    /// A roll is waiting to be rerolled or confirmed.
    PendingConfirm,
    /// The round was won and perk choices are on offer.
    AwaitingPerkChoice,
    /// A perk was chosen but the inventory is full; a slot must be picked.
    AwaitingReplacement,
    /// The roll budget ran out.
    GameOver,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Rolling => write!(f, "Rolling"),
            Self::PendingConfirm => write!(f, "Pending Confirm"),
            Self::AwaitingPerkChoice => write!(f, "Awaiting Perk Choice"),
            Self::AwaitingReplacement => write!(f, "Awaiting Replacement"),
            Self::GameOver => write!(f, "Game Over"),
        }
    }
}

/// What a confirmed roll did to the round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The target is not reached yet and rolls remain.
    Continue,
    /// The target was reached. `choices` is empty when no perk was left to
    /// offer, in which case the next round has already started.
    Won {
        /// The round that was won.
        round: u32,
        /// Perks offered as a reward.
        choices: Vec<Perk>,
    },
    /// The roll budget ran out. The session is over.
    Lost,
}

/// The result of confirming a roll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// How the roll was scored.
    pub breakdown: ScoreBreakdown,
    /// Round score after the roll.
    pub round_score: i64,
    /// Rolls left after the roll (including any win reward).
    pub rolls_remaining: u32,
    /// What happened to the round.
    pub outcome: RoundOutcome,
}

/// How a chosen perk was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerkDecision {
    /// The perk was added and the next round started.
    Added,
    /// The inventory is full; call [`GameSession::on_perk_replace`].
    ReplacementRequired,
}

/// Every observable field of a session at one moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Lifecycle phase.
    pub phase: Phase,
    /// Round number (0 before the first game).
    pub round: u32,
    /// Score needed to win the round.
    pub target_score: i64,
    /// Score accumulated this round.
    pub round_score: i64,
    /// Roll budget.
    pub rolls_remaining: u32,
    /// Reroll budget for this round.
    pub rerolls_remaining: u32,
    /// Whether the game is in progress.
    pub is_active: bool,
    /// The unconfirmed roll, if any.
    pub pending_roll: Option<RollResult>,
    /// Whether perk selection blocks play.
    pub awaiting_perk_choice: bool,
    /// Held perks in scoring order.
    pub perks: Vec<Perk>,
}

#[derive(Debug, Clone)]
struct PerkSelection {
    choices: Vec<Perk>,
    replacing: Option<Perk>,
}

/// A single-player game of Rogue Dice.
pub struct GameSession<S: EventSink = EventLog> {
    config: GameConfig,
    catalog: PerkCatalog,
    inventory: PerkInventory,
    dice: DiceRoller,
    rng: StdRng,
    sink: S,
    round_number: u32,
    target_score: i64,
    round_score: i64,
    rolls_remaining: u32,
    rerolls_remaining: u32,
    active: bool,
    pending_roll: Option<RollResult>,
    selection: Option<PerkSelection>,
}

/// Events kept by the log that [`GameSession::new`] creates.
pub const DEFAULT_EVENT_CAPACITY: usize = 1_000;

impl GameSession<EventLog> {
    /// Create an idle session that records its events in an [`EventLog`].
    ///
    /// The log keeps the newest [`DEFAULT_EVENT_CAPACITY`] events. Drain it
    /// through [`Self::sink_mut`] or pass a different log to
    /// [`Self::with_sink`].
    pub fn new(config: GameConfig, catalog: PerkCatalog) -> EngineResult<Self> {
        Self::with_sink(config, catalog, EventLog::new(DEFAULT_EVENT_CAPACITY))
    }
}

impl<S: EventSink> GameSession<S> {
    /// Create an idle session that reports to `sink`.
    ///
    /// Dice are seeded from `config.seed`; call [`Self::with_dice_source`] to
    /// substitute them.
    pub fn with_sink(config: GameConfig, catalog: PerkCatalog, sink: S) -> EngineResult<Self> {
        config.validate()?;
        let dice = DiceRoller::new(
            config.dice_count,
            config.sides_per_die,
            Box::new(RandomDice::seeded(config.seed)),
        );
        // Offers draw from their own stream so scripted dice don't shift them
        let rng = StdRng::seed_from_u64(config.seed.rotate_left(32));
        let inventory = PerkInventory::new(config.max_player_perks);

        Ok(Self {
            config,
            catalog,
            inventory,
            dice,
            rng,
            sink,
            round_number: 0,
            target_score: 0,
            round_score: 0,
            rolls_remaining: 0,
            rerolls_remaining: 0,
            active: false,
            pending_roll: None,
            selection: None,
        })
    }

    /// Replace the source of die faces.
    pub fn with_dice_source(mut self, source: Box<dyn DieSource>) -> Self {
        self.dice = DiceRoller::new(self.config.dice_count, self.config.sides_per_die, source);
        self
    }

    // --- Queries ---

    /// The rules this session plays by.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The perks that can be offered.
    pub fn catalog(&self) -> &PerkCatalog {
        &self.catalog
    }

    /// The held perks.
    pub fn inventory(&self) -> &PerkInventory {
        &self.inventory
    }

    /// The event sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the event sink (e.g. to drain a log).
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Current round number (1-based; 0 before the first game).
    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    /// Score needed to win the current round.
    pub fn target_score(&self) -> i64 {
        self.target_score
    }

    /// Score accumulated this round.
    pub fn round_score(&self) -> i64 {
        self.round_score
    }

    /// Remaining roll budget.
    pub fn rolls_remaining(&self) -> u32 {
        self.rolls_remaining
    }

    /// Remaining reroll budget for this round.
    pub fn rerolls_remaining(&self) -> u32 {
        self.rerolls_remaining
    }

    /// Whether a game is in progress.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The unconfirmed roll.
    pub fn pending_roll(&self) -> Option<&RollResult> {
        self.pending_roll.as_ref()
    }

    /// Whether perk selection is blocking play.
    pub fn awaiting_perk_choice(&self) -> bool {
        self.selection.is_some()
    }

    /// The perks currently on offer (empty outside perk selection).
    pub fn perk_choices(&self) -> &[Perk] {
        self.selection
            .as_ref()
            .map(|s| s.choices.as_slice())
            .unwrap_or(&[])
    }

    /// The chosen perk waiting for a slot, during replacement.
    pub fn pending_replacement(&self) -> Option<&Perk> {
        self.selection.as_ref().and_then(|s| s.replacing.as_ref())
    }

    /// The lifecycle phase.
    pub fn phase(&self) -> Phase {
        if self.round_number == 0 {
            return Phase::Idle;
        }
        if !self.active {
            return Phase::GameOver;
        }
        match (&self.selection, &self.pending_roll) {
            (Some(selection), _) if selection.replacing.is_some() => Phase::AwaitingReplacement,
            (Some(_), _) => Phase::AwaitingPerkChoice,
            (None, Some(_)) => Phase::PendingConfirm,
            (None, None) => Phase::Rolling,
        }
    }

    /// Capture every observable field.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase(),
            round: self.round_number,
            target_score: self.target_score,
            round_score: self.round_score,
            rolls_remaining: self.rolls_remaining,
            rerolls_remaining: self.rerolls_remaining,
            is_active: self.active,
            pending_roll: self.pending_roll.clone(),
            awaiting_perk_choice: self.awaiting_perk_choice(),
            perks: self.inventory.perks().to_vec(),
        }
    }

    /// How the pending roll would score with the held perks.
    pub fn preview_score(&self) -> Option<ScoreBreakdown> {
        self.pending_roll
            .as_ref()
            .map(|roll| score_breakdown(roll.values(), self.inventory.perks()))
    }

    /// Whether rerolling `count` dice would be accepted right now.
    pub fn can_reroll(&self, count: usize) -> bool {
        self.active
            && self.selection.is_none()
            && self.pending_roll.is_some()
            && count > 0
            && count <= self.rerolls_remaining as usize
    }

    // --- Commands ---

    /// Start a new game, discarding any game in progress.
    pub fn start_game(&mut self) {
        tracing::info!("game started");
        self.rolls_remaining = self.config.starting_rolls;
        self.target_score = self.config.starting_target_score;
        self.round_number = 1;
        self.active = true;
        self.pending_roll = None;
        self.selection = None;
        self.dice.clear();
        self.inventory.clear();

        self.emit(GameEvent::GameStarted {
            rolls: self.rolls_remaining,
            target: self.target_score,
        });
        self.emit_inventory();
        self.start_round();
    }

    /// Roll all dice. The result stays pending until confirmed.
    pub fn roll_dice(&mut self) -> EngineResult<RollResult> {
        if !self.active {
            return self.reject("roll", "game is not active");
        }
        if self.selection.is_some() {
            return self.reject("roll", "waiting for perk selection");
        }
        if self.pending_roll.is_some() {
            return self.reject("roll", "previous roll not yet confirmed");
        }
        if self.rolls_remaining == 0 {
            return self.reject("roll", "no rolls remaining");
        }

        let result = self.dice.roll();
        tracing::debug!(roll = %result, "awaiting confirmation");
        self.pending_roll = Some(result.clone());
        self.emit(GameEvent::RollProduced {
            results: result.clone(),
            is_reroll: false,
        });
        Ok(result)
    }

    /// Reroll the dice at `indices` in the pending roll.
    ///
    /// Indices form a set; each distinct die costs one reroll. The new roll
    /// still needs confirming.
    pub fn perform_reroll(&mut self, indices: &[usize]) -> EngineResult<RollResult> {
        if !self.active {
            return self.reject("reroll", "game is not active");
        }
        if self.selection.is_some() {
            return self.reject("reroll", "waiting for perk selection");
        }
        let Some(pending) = self.pending_roll.as_ref() else {
            return self.reject("reroll", "no pending roll");
        };

        let selected: BTreeSet<usize> = indices.iter().copied().collect();
        if selected.is_empty() {
            return self.reject("reroll", "no dice selected");
        }
        if let Some(&index) = selected.iter().find(|&&i| i >= pending.len()) {
            tracing::warn!(index, len = pending.len(), "cannot reroll: invalid die index");
            return Err(EngineError::IndexOutOfRange {
                index,
                len: pending.len(),
            });
        }
        let cost = u32::try_from(selected.len()).unwrap_or(u32::MAX);
        if cost > self.rerolls_remaining {
            let reason = format!(
                "not enough rerolls: need {cost}, have {}",
                self.rerolls_remaining
            );
            return self.reject("reroll", reason);
        }

        let order: Vec<usize> = selected.into_iter().collect();
        let result = self.dice.reroll(pending, &order)?;
        self.pending_roll = Some(result.clone());
        self.rerolls_remaining -= cost;
        tracing::debug!(
            roll = %result,
            rerolls = self.rerolls_remaining,
            "reroll complete"
        );

        self.emit(GameEvent::RollProduced {
            results: result.clone(),
            is_reroll: true,
        });
        self.emit(GameEvent::RerollsUpdated {
            count: self.rerolls_remaining,
        });
        Ok(result)
    }

    /// Score the pending roll and settle the round if it is decided.
    pub fn confirm_roll(&mut self) -> EngineResult<Confirmation> {
        if !self.active {
            return self.reject("confirm", "game is not active");
        }
        if self.selection.is_some() {
            return self.reject("confirm", "waiting for perk selection");
        }
        let Some(roll) = self.pending_roll.take() else {
            return self.reject("confirm", "no pending roll");
        };

        let breakdown = score_breakdown(roll.values(), self.inventory.perks());
        self.round_score = self.round_score.saturating_add(breakdown.total);
        self.rolls_remaining = self.rolls_remaining.saturating_sub(1);
        tracing::info!(
            roll = %roll,
            added = breakdown.total,
            score = self.round_score,
            rolls = self.rolls_remaining,
            "confirmed roll"
        );
        self.emit(GameEvent::ScoreUpdated {
            score: self.round_score,
            delta: breakdown.total,
            rolls_left: self.rolls_remaining,
        });

        let outcome = if self.round_score >= self.target_score {
            self.win_round()
        } else if self.rolls_remaining == 0 {
            self.lose_game();
            RoundOutcome::Lost
        } else {
            RoundOutcome::Continue
        };

        Ok(Confirmation {
            breakdown,
            round_score: self.round_score,
            rolls_remaining: self.rolls_remaining,
            outcome,
        })
    }

    /// Take one of the offered perks.
    ///
    /// Adds it and starts the next round when there is room; otherwise asks
    /// for a slot to replace.
    pub fn on_perk_chosen(&mut self, perk: Perk) -> EngineResult<PerkDecision> {
        let offered = match &self.selection {
            None => return self.reject("choose perk", "no perk selection in progress"),
            Some(selection) if selection.replacing.is_some() => {
                return self.reject("choose perk", "waiting for a slot to replace");
            }
            Some(selection) => selection.choices.iter().find(|c| c.kind == perk.kind).cloned(),
        };
        // The catalog's definition is kept, not the caller's copy
        let Some(perk) = offered else {
            let reason = format!("'{}' was not offered", perk.name);
            return self.reject("choose perk", reason);
        };

        if self.inventory.can_add() {
            let name = perk.name.clone();
            self.inventory.add(perk)?;
            tracing::info!(perk = %name, "perk added");
            self.emit_inventory();
            self.finish_selection();
            Ok(PerkDecision::Added)
        } else {
            tracing::info!(perk = %perk.name, "perks full, replacement required");
            self.emit(GameEvent::PerkReplacementRequired {
                perk: perk.clone(),
                current: self.inventory.perks().to_vec(),
            });
            if let Some(selection) = self.selection.as_mut() {
                selection.replacing = Some(perk);
            }
            Ok(PerkDecision::ReplacementRequired)
        }
    }

    /// Put an offered perk into slot `index`, then start the next round.
    ///
    /// Returns the perk that was dropped. A rejected replacement leaves the
    /// selection open.
    pub fn on_perk_replace(&mut self, index: usize, perk: Perk) -> EngineResult<Perk> {
        let Some(selection) = &self.selection else {
            return self.reject("replace perk", "no perk selection in progress");
        };
        let offered = selection
            .replacing
            .iter()
            .chain(selection.choices.iter())
            .find(|p| p.kind == perk.kind)
            .cloned();
        let Some(perk) = offered else {
            let reason = format!("'{}' was not offered", perk.name);
            return self.reject("replace perk", reason);
        };

        let old = self.inventory.replace(index, perk)?;
        tracing::info!(dropped = %old.name, index, "perk replaced");
        self.emit_inventory();
        self.finish_selection();
        Ok(old)
    }

    /// Decline the reward and start the next round.
    pub fn on_selection_cancelled(&mut self) -> EngineResult<()> {
        if self.selection.is_none() {
            return self.reject("cancel selection", "no perk selection in progress");
        }
        tracing::info!("perk selection cancelled");
        self.finish_selection();
        Ok(())
    }

    /// Rearrange the held perks (see [`PerkInventory::reorder`]).
    ///
    /// Only allowed during an active game with no perk selection open, so an
    /// offer is always resolved against the order it was made with.
    pub fn reorder_perks(&mut self, new_order: &[usize]) -> EngineResult<()> {
        if !self.active {
            return self.reject("reorder perks", "game is not active");
        }
        if self.selection.is_some() {
            return self.reject("reorder perks", "perk selection in progress");
        }
        if let Err(e) = self.inventory.reorder(new_order) {
            tracing::warn!(?new_order, "cannot reorder perks: {e}");
            return Err(e);
        }
        self.emit_inventory();
        Ok(())
    }

    /// Called by the presentation layer once its roll animation finished.
    ///
    /// Returns true (and emits [`GameEvent::RerollSelectionReady`]) when dice
    /// can now be picked for a reroll.
    pub fn presentation_settled(&mut self) -> bool {
        if !self.can_reroll(1) {
            tracing::debug!(
                pending = self.pending_roll.is_some(),
                rerolls = self.rerolls_remaining,
                "reroll selection stays disabled"
            );
            return false;
        }
        self.emit(GameEvent::RerollSelectionReady {
            rerolls: self.rerolls_remaining,
        });
        true
    }

    // --- Transitions ---

    fn start_round(&mut self) {
        self.round_score = 0;
        self.rerolls_remaining = self.config.starting_rerolls;
        tracing::info!(
            round = self.round_number,
            target = self.target_score,
            rolls = self.rolls_remaining,
            "starting round"
        );
        self.emit(GameEvent::RoundStarted {
            round: self.round_number,
            target: self.target_score,
            rolls_left: self.rolls_remaining,
            score: self.round_score,
        });
        self.emit(GameEvent::RerollsUpdated {
            count: self.rerolls_remaining,
        });

        // Only reachable when a win on the last roll pays no rolls back
        if self.rolls_remaining == 0 {
            self.lose_game();
        }
    }

    fn win_round(&mut self) -> RoundOutcome {
        let round = self.round_number;
        self.rolls_remaining = self
            .rolls_remaining
            .saturating_add(self.config.rolls_rewarded_per_round);
        tracing::info!(
            round,
            target = self.target_score,
            rolls = self.rolls_remaining,
            "round won"
        );
        self.emit(GameEvent::RoundWon {
            round,
            score: self.round_score,
        });

        let choices = self.catalog.random_choices(
            &self.inventory,
            self.config.perk_choice_count,
            &mut self.rng,
        );
        if choices.is_empty() {
            tracing::warn!("no perk choices available, skipping perk selection");
            self.continue_to_next_round();
        } else {
            self.selection = Some(PerkSelection {
                choices: choices.clone(),
                replacing: None,
            });
            self.emit(GameEvent::PerkChoicesAvailable {
                choices: choices.clone(),
            });
        }
        RoundOutcome::Won { round, choices }
    }

    fn lose_game(&mut self) {
        self.active = false;
        tracing::info!(
            round = self.round_number,
            score = self.round_score,
            "game over: out of rolls"
        );
        self.emit(GameEvent::GameOver {
            round: self.round_number,
            score: self.round_score,
        });
    }

    fn finish_selection(&mut self) {
        self.selection = None;
        self.continue_to_next_round();
    }

    fn continue_to_next_round(&mut self) {
        self.round_number = self.round_number.saturating_add(1);
        self.target_score = self
            .target_score
            .saturating_add(self.config.target_score_increment);
        self.pending_roll = None;
        self.dice.clear();
        self.start_round();
    }

    fn emit(&mut self, event: GameEvent) {
        self.sink.notify(&event);
    }

    fn emit_inventory(&mut self) {
        self.emit(GameEvent::PerkInventoryChanged {
            perks: self.inventory.perks().to_vec(),
        });
    }

    fn reject<T>(&self, action: &str, reason: impl Into<String>) -> EngineResult<T> {
        let reason = reason.into();
        tracing::warn!(action, phase = %self.phase(), "rejected: {reason}");
        Err(EngineError::InvalidState(format!("cannot {action}: {reason}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedDice;
    use crate::perk::{PerkKind, Rarity};

    fn session_with(config: GameConfig, catalog: PerkCatalog, faces: &[u32]) -> GameSession {
        let mut s = GameSession::new(config, catalog)
            .unwrap()
            .with_dice_source(Box::new(ScriptedDice::new(faces.to_vec())));
        s.start_game();
        s
    }

    fn session(faces: &[u32]) -> GameSession {
        session_with(GameConfig::default(), PerkCatalog::standard(), faces)
    }

    fn roll_and_confirm(s: &mut GameSession) -> Confirmation {
        s.roll_dice().unwrap();
        s.confirm_roll().unwrap()
    }

    fn has_event(s: &GameSession, pred: impl Fn(&GameEvent) -> bool) -> bool {
        s.sink().events().iter().any(pred)
    }

    #[test]
    fn new_session_is_idle() {
        let mut s = GameSession::new(GameConfig::default(), PerkCatalog::standard()).unwrap();
        assert_eq!(s.phase(), Phase::Idle);
        assert!(!s.is_active());
        assert!(matches!(s.roll_dice(), Err(EngineError::InvalidState(_))));
        assert!(s.sink().is_empty());
    }

    #[test]
    fn invalid_config_rejected() {
        let config = GameConfig::default().with_dice(0, 6);
        assert!(GameSession::new(config, PerkCatalog::standard()).is_err());
    }

    #[test]
    fn start_game_resets_state() {
        let s = session(&[1]);
        assert_eq!(s.phase(), Phase::Rolling);
        assert_eq!(s.round_number(), 1);
        assert_eq!(s.target_score(), 15);
        assert_eq!(s.rolls_remaining(), 10);
        assert_eq!(s.rerolls_remaining(), 3);
        assert_eq!(s.round_score(), 0);
        assert!(s.is_active());
        assert!(s.inventory().is_empty());
        assert_eq!(
            s.sink().events(),
            &[
                GameEvent::GameStarted {
                    rolls: 10,
                    target: 15
                },
                GameEvent::PerkInventoryChanged { perks: vec![] },
                GameEvent::RoundStarted {
                    round: 1,
                    target: 15,
                    rolls_left: 10,
                    score: 0
                },
                GameEvent::RerollsUpdated { count: 3 },
            ]
        );
    }

    #[test]
    fn roll_is_pending_until_confirmed() {
        let mut s = session(&[2, 3]);
        let roll = s.roll_dice().unwrap();
        assert_eq!(roll.values(), &[2, 3]);
        assert_eq!(s.pending_roll(), Some(&roll));
        assert_eq!(s.phase(), Phase::PendingConfirm);
        assert_eq!(s.rolls_remaining(), 10);
        assert!(has_event(&s, |e| matches!(
            e,
            GameEvent::RollProduced {
                is_reroll: false,
                ..
            }
        )));
    }

    #[test]
    fn second_roll_rejected_while_pending() {
        let mut s = session(&[2, 3, 6, 6]);
        s.roll_dice().unwrap();
        let before = s.snapshot();
        assert!(matches!(s.roll_dice(), Err(EngineError::InvalidState(_))));
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn confirm_without_pending_roll_is_noop() {
        let mut s = session(&[1]);
        let before = s.snapshot();
        let events_before = s.sink().len();
        assert!(matches!(s.confirm_roll(), Err(EngineError::InvalidState(_))));
        assert_eq!(s.snapshot(), before);
        assert_eq!(s.sink().len(), events_before);
    }

    #[test]
    fn confirm_scores_and_consumes_roll() {
        let mut s = session(&[2, 3]);
        let c = roll_and_confirm(&mut s);
        assert_eq!(c.breakdown.total, 5);
        assert_eq!(c.round_score, 5);
        assert_eq!(c.rolls_remaining, 9);
        assert_eq!(c.outcome, RoundOutcome::Continue);
        assert_eq!(s.round_score(), 5);
        assert!(s.pending_roll().is_none());
        assert_eq!(s.phase(), Phase::Rolling);
        assert_eq!(
            s.sink().last(),
            Some(&GameEvent::ScoreUpdated {
                score: 5,
                delta: 5,
                rolls_left: 9
            })
        );
    }

    #[test]
    fn winning_roll_with_twins() {
        let mut s = session(&[5, 5]);
        s.inventory.add(Perk::standard(PerkKind::Twins)).unwrap();

        let c = roll_and_confirm(&mut s);
        assert_eq!(c.breakdown.total, 20);
        assert_eq!(s.round_score(), 20);
        assert_eq!(s.rolls_remaining(), 12);
        let RoundOutcome::Won { round, choices } = c.outcome else {
            panic!("expected a win, got {:?}", c.outcome);
        };
        assert_eq!(round, 1);
        assert_eq!(choices.len(), 2);
        assert!(choices.iter().all(|p| p.kind != PerkKind::Twins));
        assert!(s.awaiting_perk_choice());
        assert_eq!(s.phase(), Phase::AwaitingPerkChoice);
        assert_eq!(s.perk_choices(), choices.as_slice());
        assert!(has_event(&s, |e| matches!(e, GameEvent::RoundWon { round: 1, score: 20 })));
        assert!(has_event(&s, |e| matches!(e, GameEvent::PerkChoicesAvailable { .. })));
    }

    #[test]
    fn play_blocked_during_perk_selection() {
        let mut s = session(&[6, 6, 6, 6]);
        roll_and_confirm(&mut s);
        roll_and_confirm(&mut s);
        assert!(s.awaiting_perk_choice());

        let before = s.snapshot();
        assert!(s.roll_dice().is_err());
        assert!(s.confirm_roll().is_err());
        assert!(s.perform_reroll(&[0]).is_err());
        assert!(s.reorder_perks(&[]).is_err());
        assert!(!s.can_reroll(1));
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn choosing_perk_adds_and_advances_round() {
        let mut s = session(&[6, 6]);
        roll_and_confirm(&mut s);
        roll_and_confirm(&mut s);
        let choice = s.perk_choices()[0].clone();

        assert_eq!(s.on_perk_chosen(choice.clone()).unwrap(), PerkDecision::Added);
        assert_eq!(s.inventory().perks(), &[choice]);
        assert!(!s.awaiting_perk_choice());
        assert_eq!(s.round_number(), 2);
        assert_eq!(s.target_score(), 20);
        assert_eq!(s.round_score(), 0);
        assert_eq!(s.rerolls_remaining(), 3);
        assert_eq!(s.rolls_remaining(), 11);
        assert_eq!(s.phase(), Phase::Rolling);
    }

    #[test]
    fn choosing_unoffered_perk_rejected() {
        let config = GameConfig::default().with_perk_limits(5, 1);
        let mut s = session_with(config, PerkCatalog::standard(), &[6, 6]);
        roll_and_confirm(&mut s);
        roll_and_confirm(&mut s);
        let offered = s.perk_choices()[0].kind;
        let other = PerkKind::ALL
            .into_iter()
            .find(|k| *k != offered)
            .map(Perk::standard)
            .unwrap();

        assert!(matches!(
            s.on_perk_chosen(other),
            Err(EngineError::InvalidState(_))
        ));
        assert!(s.awaiting_perk_choice());
        assert!(s.inventory().is_empty());
    }

    #[test]
    fn chosen_perk_uses_offered_definition() {
        let config = GameConfig::default().with_perk_limits(5, 1);
        let mut s = session_with(config, PerkCatalog::standard(), &[6, 6]);
        roll_and_confirm(&mut s);
        roll_and_confirm(&mut s);
        let offered = s.perk_choices()[0].clone();
        let forged = Perk::new(offered.kind, "Counterfeit", "made up", Rarity::Rare);

        assert_eq!(s.on_perk_chosen(forged).unwrap(), PerkDecision::Added);
        assert_eq!(s.inventory().perks(), &[offered]);
    }

    #[test]
    fn replacement_uses_offered_definition() {
        let config = GameConfig::default()
            .with_target(10, 5)
            .with_perk_limits(1, 3);
        let mut s = session_with(config, PerkCatalog::standard(), &[6, 6]);
        s.inventory.add(Perk::standard(PerkKind::LuckySeven)).unwrap();
        roll_and_confirm(&mut s);
        let offered = s.perk_choices()[0].clone();
        let forged = Perk::new(offered.kind, "Counterfeit", "made up", Rarity::Common);

        assert_eq!(
            s.on_perk_chosen(forged.clone()).unwrap(),
            PerkDecision::ReplacementRequired
        );
        assert_eq!(s.pending_replacement(), Some(&offered));
        s.on_perk_replace(0, forged).unwrap();
        assert_eq!(s.inventory().perks(), &[offered]);
    }

    #[test]
    fn cancelling_selection_advances_without_perk() {
        let mut s = session(&[6, 6]);
        roll_and_confirm(&mut s);
        roll_and_confirm(&mut s);
        s.on_selection_cancelled().unwrap();
        assert!(s.inventory().is_empty());
        assert_eq!(s.round_number(), 2);
        assert!(s.on_selection_cancelled().is_err());
    }

    #[test]
    fn full_inventory_requires_replacement() {
        let config = GameConfig::default()
            .with_target(10, 5)
            .with_perk_limits(1, 3);
        let mut s = session_with(config, PerkCatalog::standard(), &[6, 6]);
        s.inventory.add(Perk::standard(PerkKind::LuckySeven)).unwrap();

        roll_and_confirm(&mut s);
        let choice = s.perk_choices()[0].clone();
        assert_ne!(choice.kind, PerkKind::LuckySeven);

        assert_eq!(
            s.on_perk_chosen(choice.clone()).unwrap(),
            PerkDecision::ReplacementRequired
        );
        assert_eq!(s.phase(), Phase::AwaitingReplacement);
        assert_eq!(s.pending_replacement(), Some(&choice));
        assert!(s.on_perk_chosen(choice.clone()).is_err());

        let err = s.on_perk_replace(5, choice.clone()).unwrap_err();
        assert_eq!(err, EngineError::IndexOutOfRange { index: 5, len: 1 });
        assert_eq!(s.phase(), Phase::AwaitingReplacement);

        let dropped = s.on_perk_replace(0, choice.clone()).unwrap();
        assert_eq!(dropped.kind, PerkKind::LuckySeven);
        assert_eq!(s.inventory().perks(), &[choice]);
        assert_eq!(s.round_number(), 2);
        assert_eq!(s.phase(), Phase::Rolling);
    }

    #[test]
    fn running_out_of_rolls_ends_game() {
        let config = GameConfig::default().with_starting_rolls(2);
        let mut s = session_with(config, PerkCatalog::standard(), &[1, 1]);
        assert_eq!(roll_and_confirm(&mut s).outcome, RoundOutcome::Continue);
        assert_eq!(roll_and_confirm(&mut s).outcome, RoundOutcome::Lost);

        assert!(!s.is_active());
        assert_eq!(s.phase(), Phase::GameOver);
        assert_eq!(s.rolls_remaining(), 0);
        assert!(s.roll_dice().is_err());
        assert!(has_event(&s, |e| matches!(e, GameEvent::GameOver { round: 1, score: 4 })));
    }

    #[test]
    fn win_on_last_roll_beats_loss() {
        let config = GameConfig::default().with_starting_rolls(1);
        let mut s = session_with(config, PerkCatalog::standard(), &[6, 6, 5, 5]);
        s.inventory.add(Perk::standard(PerkKind::Twins)).unwrap();

        let c = roll_and_confirm(&mut s);
        assert!(matches!(c.outcome, RoundOutcome::Won { .. }));
        assert!(s.is_active());
        assert_eq!(s.rolls_remaining(), 3);
    }

    #[test]
    fn empty_offer_skips_straight_to_next_round() {
        let mut s = session_with(GameConfig::default(), PerkCatalog::default(), &[6, 6]);
        roll_and_confirm(&mut s);
        let c = roll_and_confirm(&mut s);
        assert_eq!(
            c.outcome,
            RoundOutcome::Won {
                round: 1,
                choices: vec![]
            }
        );
        assert!(!s.awaiting_perk_choice());
        assert_eq!(s.round_number(), 2);
        assert_eq!(s.target_score(), 20);
        assert!(!has_event(&s, |e| matches!(e, GameEvent::PerkChoicesAvailable { .. })));
    }

    #[test]
    fn win_without_reward_on_last_roll_ends_next_round() {
        let config = GameConfig::default()
            .with_starting_rolls(1)
            .with_roll_reward(0)
            .with_target(10, 5);
        let mut s = session_with(config, PerkCatalog::default(), &[6, 6]);
        let c = roll_and_confirm(&mut s);
        assert!(matches!(c.outcome, RoundOutcome::Won { .. }));
        assert_eq!(s.round_number(), 2);
        assert_eq!(s.phase(), Phase::GameOver);
    }

    #[test]
    fn reroll_replaces_selected_dice() {
        let mut s = session(&[1, 2, 6]);
        s.roll_dice().unwrap();
        let rerolled = s.perform_reroll(&[0]).unwrap();
        assert_eq!(rerolled.values(), &[6, 2]);
        assert_eq!(s.pending_roll(), Some(&rerolled));
        assert_eq!(s.rerolls_remaining(), 2);
        assert_eq!(s.rolls_remaining(), 10);
        assert_eq!(s.phase(), Phase::PendingConfirm);
        assert_eq!(s.sink().last(), Some(&GameEvent::RerollsUpdated { count: 2 }));

        let c = s.confirm_roll().unwrap();
        assert_eq!(c.breakdown.base, 8);
    }

    #[test]
    fn reroll_duplicate_indices_cost_once() {
        let mut s = session(&[1, 2, 6]);
        s.roll_dice().unwrap();
        s.perform_reroll(&[1, 1, 1]).unwrap();
        assert_eq!(s.rerolls_remaining(), 2);
    }

    #[test]
    fn reroll_rejections_leave_state_unchanged() {
        let config = GameConfig::default().with_rerolls(1);
        let mut s = session_with(config, PerkCatalog::standard(), &[1, 2]);
        assert!(matches!(
            s.perform_reroll(&[0]),
            Err(EngineError::InvalidState(_))
        ));

        s.roll_dice().unwrap();
        let before = s.snapshot();
        assert!(matches!(
            s.perform_reroll(&[]),
            Err(EngineError::InvalidState(_))
        ));
        assert_eq!(
            s.perform_reroll(&[0, 2]),
            Err(EngineError::IndexOutOfRange { index: 2, len: 2 })
        );
        assert!(matches!(
            s.perform_reroll(&[0, 1]),
            Err(EngineError::InvalidState(_))
        ));
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn rerolls_reset_each_round() {
        let mut s = session(&[6, 6]);
        s.roll_dice().unwrap();
        s.perform_reroll(&[0, 1]).unwrap();
        assert_eq!(s.rerolls_remaining(), 1);
        s.confirm_roll().unwrap();
        roll_and_confirm(&mut s);
        s.on_selection_cancelled().unwrap();
        assert_eq!(s.rerolls_remaining(), 3);
    }

    #[test]
    fn reorder_changes_scoring_order() {
        let config = GameConfig::default().with_target(100, 5);
        let mut s = session_with(config, PerkCatalog::standard(), &[3, 4]);
        s.inventory.add(Perk::standard(PerkKind::LuckySeven)).unwrap();
        s.inventory.add(Perk::standard(PerkKind::SteadyHand)).unwrap();

        assert_eq!(roll_and_confirm(&mut s).breakdown.total, 17);
        s.reorder_perks(&[1, 0]).unwrap();
        assert_eq!(roll_and_confirm(&mut s).breakdown.total, 20);
        assert!(matches!(
            s.reorder_perks(&[0, 0]),
            Err(EngineError::InvalidPermutation(_))
        ));
    }

    #[test]
    fn presentation_settled_signals_reroll_readiness() {
        let config = GameConfig::default().with_rerolls(1);
        let mut s = session_with(config, PerkCatalog::standard(), &[2, 3]);
        assert!(!s.presentation_settled());

        s.roll_dice().unwrap();
        assert!(s.presentation_settled());
        assert_eq!(
            s.sink().last(),
            Some(&GameEvent::RerollSelectionReady { rerolls: 1 })
        );

        s.perform_reroll(&[0]).unwrap();
        assert!(!s.presentation_settled());
    }

    #[test]
    fn can_reroll_reflects_budget() {
        let mut s = session(&[2, 3]);
        assert!(!s.can_reroll(1));
        s.roll_dice().unwrap();
        assert!(!s.can_reroll(0));
        assert!(s.can_reroll(2));
        assert!(s.can_reroll(3));
        assert!(!s.can_reroll(4));
    }

    #[test]
    fn huge_roll_reward_saturates() {
        let config = GameConfig::default()
            .with_roll_reward(u32::MAX)
            .with_target(1, 5);
        let mut s = session_with(config, PerkCatalog::default(), &[6, 6]);
        let c = roll_and_confirm(&mut s);
        assert!(matches!(c.outcome, RoundOutcome::Won { .. }));
        assert_eq!(s.rolls_remaining(), u32::MAX);
        assert_eq!(s.round_number(), 2);
        assert!(s.is_active());
    }

    #[test]
    fn huge_target_increment_saturates() {
        let config = GameConfig::default().with_target(2, i64::MAX);
        let mut s = session_with(config, PerkCatalog::default(), &[6, 6]);
        let c = roll_and_confirm(&mut s);
        assert!(matches!(c.outcome, RoundOutcome::Won { .. }));
        assert_eq!(s.target_score(), i64::MAX);
        assert_eq!(s.round_number(), 2);
        assert_eq!(roll_and_confirm(&mut s).outcome, RoundOutcome::Continue);
    }

    #[test]
    fn default_log_is_bounded() {
        let config = GameConfig::default().with_starting_rolls(u32::MAX);
        let mut s = session_with(config, PerkCatalog::default(), &[1, 1]);
        assert_eq!(s.sink().max_events(), DEFAULT_EVENT_CAPACITY);
        for _ in 0..DEFAULT_EVENT_CAPACITY {
            roll_and_confirm(&mut s);
        }
        assert_eq!(s.sink().len(), DEFAULT_EVENT_CAPACITY);
    }

    #[test]
    fn preview_matches_confirmed_score() {
        let mut s = session(&[3, 3]);
        s.inventory.add(Perk::standard(PerkKind::Twins)).unwrap();
        assert!(s.preview_score().is_none());
        s.roll_dice().unwrap();
        let preview = s.preview_score().unwrap();
        assert_eq!(preview.total, 12);
        assert_eq!(s.confirm_roll().unwrap().breakdown, preview);
    }

    #[test]
    fn restart_clears_perks_and_progress() {
        let mut s = session(&[6, 6]);
        roll_and_confirm(&mut s);
        roll_and_confirm(&mut s);
        let choice = s.perk_choices()[0].clone();
        s.on_perk_chosen(choice).unwrap();
        s.roll_dice().unwrap();

        s.start_game();
        assert_eq!(s.round_number(), 1);
        assert_eq!(s.target_score(), 15);
        assert_eq!(s.rolls_remaining(), 10);
        assert!(s.inventory().is_empty());
        assert!(s.pending_roll().is_none());
        assert_eq!(s.phase(), Phase::Rolling);
    }

    #[test]
    fn snapshot_serializes() {
        let s = session(&[1]);
        let json = serde_json::to_string(&s.snapshot()).unwrap();
        assert!(json.contains("\"phase\":\"rolling\""));
        assert!(json.contains("\"rolls_remaining\":10"));
    }
}
