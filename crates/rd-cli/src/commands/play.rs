use std::io::{self, BufRead, Write};
use std::path::Path;

use colored::Colorize;

use rd_engine::{GameConfig, GameEvent, GameSession, Perk, PerkCatalog, PerkDecision};

const HELP: &str = "\
Rogue Dice Commands:
  roll                          Roll all dice
  reroll <die> [die...]         Reroll dice by position (1 = first die)
  confirm                       Bank the pending roll
  choose <n>                    Take perk choice n after a round win
  replace <slot>                Put the chosen perk into a full slot
  skip                          Decline the perk reward
  perks                         List held perks in scoring order
  reorder <slot> [slot...]      New perk order, e.g. 'reorder 2 1'
  status                        Show round, budgets, and pending roll
  snapshot                      Dump the full game state as JSON
  new                           Start a new game
  help                          Show this help
  quit                          Exit

Perks apply top to bottom, so their order can change a roll's score.";

pub fn run(seed: Option<u64>, config: Option<&Path>, catalog: Option<&Path>) -> Result<(), String> {
    let config = super::load_config(config, seed)?;
    let catalog = super::load_catalog(catalog)?;
    let seed = config.seed;
    let mut console = Console::new(config, catalog)?;

    println!("  {} Rogue Dice", "Starting".bold());
    println!("  Seed: {seed}");
    println!("  Type 'help' for commands, 'quit' to exit.\n");
    println!("{}\n", console.start());

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().map_err(|e| e.to_string())?;

        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break, // EOF
            Err(e) => return Err(e.to_string()),
            _ => {}
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match console.process(input) {
            Ok(output) => {
                if !output.is_empty() {
                    println!("{output}\n");
                }
                if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("q") {
                    break;
                }
            }
            Err(e) => {
                println!("{}\n", e.yellow());
            }
        }
    }

    Ok(())
}

/// Text front end over a game session.
///
/// Every command runs one session call and renders the events it produced.
/// The console finishes its "animation" instantly, so it settles the
/// presentation right after each roll.
pub struct Console {
    session: GameSession,
}

impl Console {
    pub fn new(config: GameConfig, catalog: PerkCatalog) -> Result<Self, String> {
        let session =
            GameSession::new(config, catalog).map_err(|e| format!("failed to start game: {e}"))?;
        Ok(Self { session })
    }

    /// Start (or restart) the game and describe the opening state.
    pub fn start(&mut self) -> String {
        self.session.start_game();
        self.drain_events()
    }

    /// Run one console command.
    pub fn process(&mut self, input: &str) -> Result<String, String> {
        let mut words = input.split_whitespace();
        let Some(cmd) = words.next() else {
            return Ok(String::new());
        };
        let cmd = cmd.to_lowercase();
        let args: Vec<&str> = words.collect();

        match cmd.as_str() {
            "roll" | "r" => self.do_roll(),
            "reroll" | "rr" => self.do_reroll(&args),
            "confirm" | "c" => self.do_confirm(),
            "choose" => self.do_choose(&args),
            "replace" => self.do_replace(&args),
            "skip" => self.do_skip(),
            "perks" => Ok(self.do_perks()),
            "reorder" => self.do_reorder(&args),
            "status" => Ok(self.do_status()),
            "snapshot" => self.do_snapshot(),
            "new" => Ok(self.start()),
            "help" | "?" => Ok(HELP.to_string()),
            "quit" | "q" => Ok("Goodbye!".to_string()),
            _ => Err(format!(
                "unknown command '{cmd}'. Type 'help' for commands."
            )),
        }
    }

    fn do_roll(&mut self) -> Result<String, String> {
        self.session.roll_dice().map_err(|e| e.to_string())?;
        self.session.presentation_settled();
        let mut out = self.drain_events();
        self.push_preview(&mut out);
        Ok(out)
    }

    fn do_reroll(&mut self, args: &[&str]) -> Result<String, String> {
        if args.is_empty() {
            return Err("usage: reroll <die> [die...]".to_string());
        }
        let indices = parse_positions(args, "die")?;
        self.session
            .perform_reroll(&indices)
            .map_err(|e| e.to_string())?;
        self.session.presentation_settled();
        let mut out = self.drain_events();
        self.push_preview(&mut out);
        Ok(out)
    }

    fn do_confirm(&mut self) -> Result<String, String> {
        let confirmation = self.session.confirm_roll().map_err(|e| e.to_string())?;

        let mut lines: Vec<String> = confirmation
            .breakdown
            .steps
            .iter()
            .filter(|step| step.triggered())
            .map(|step| format!("  {}: {} -> {}", step.name, step.before, step.after))
            .collect();
        let events = self.drain_events();
        if !events.is_empty() {
            lines.push(events);
        }
        Ok(lines.join("\n"))
    }

    fn do_choose(&mut self, args: &[&str]) -> Result<String, String> {
        let [arg] = args else {
            return Err("usage: choose <n>".to_string());
        };
        let index = parse_position(arg, "choice")?;
        let choices = self.session.perk_choices();
        if choices.is_empty() {
            return Err("no perks on offer".to_string());
        }
        let perk = choices
            .get(index)
            .cloned()
            .ok_or_else(|| format!("pick a choice between 1 and {}", choices.len()))?;
        let name = perk.name.clone();

        let decision = self
            .session
            .on_perk_chosen(perk)
            .map_err(|e| e.to_string())?;
        let events = self.drain_events();
        Ok(match decision {
            PerkDecision::Added => format!("Took {name}.\n{events}"),
            PerkDecision::ReplacementRequired => events,
        })
    }

    fn do_replace(&mut self, args: &[&str]) -> Result<String, String> {
        let [arg] = args else {
            return Err("usage: replace <slot>".to_string());
        };
        let slot = parse_position(arg, "slot")?;
        let perk = self
            .session
            .pending_replacement()
            .cloned()
            .ok_or_else(|| "choose a perk before replacing one".to_string())?;

        let dropped = self
            .session
            .on_perk_replace(slot, perk)
            .map_err(|e| e.to_string())?;
        Ok(format!("Dropped {}.\n{}", dropped.name, self.drain_events()))
    }

    fn do_skip(&mut self) -> Result<String, String> {
        self.session
            .on_selection_cancelled()
            .map_err(|e| e.to_string())?;
        Ok(format!("Skipped the reward.\n{}", self.drain_events()))
    }

    fn do_perks(&self) -> String {
        let inventory = self.session.inventory();
        if inventory.is_empty() {
            return format!("No perks held (0/{}).", inventory.capacity());
        }
        let mut out = format!("Perks ({}/{}):", inventory.len(), inventory.capacity());
        out.push_str(&numbered(inventory.perks()));
        out
    }

    fn do_reorder(&mut self, args: &[&str]) -> Result<String, String> {
        let order = parse_positions(args, "slot")?;
        self.session
            .reorder_perks(&order)
            .map_err(|e| e.to_string())?;
        self.session.sink_mut().clear();
        Ok(self.do_perks())
    }

    fn do_status(&self) -> String {
        let s = &self.session;
        let mut out = format!(
            "Round {} | Target {} | Score {}\n",
            s.round_number(),
            s.target_score(),
            s.round_score()
        );
        out.push_str(&format!(
            "Rolls: {} | Rerolls: {}\n",
            s.rolls_remaining(),
            s.rerolls_remaining()
        ));
        if let Some(roll) = s.pending_roll() {
            out.push_str(&format!("Pending roll: {roll}\n"));
        }
        out.push_str(&format!(
            "Perks: {}/{}\n",
            s.inventory().len(),
            s.inventory().capacity()
        ));
        out.push_str(&format!("Phase: {}", s.phase()));
        out
    }

    fn do_snapshot(&self) -> Result<String, String> {
        serde_json::to_string_pretty(&self.session.snapshot()).map_err(|e| e.to_string())
    }

    /// Mention what perks would make of the pending roll.
    fn push_preview(&self, out: &mut String) {
        if let Some(preview) = self.session.preview_score()
            && preview.total != preview.base
        {
            out.push_str(&format!("\nWith perks: worth {}", preview.total));
        }
    }

    fn drain_events(&mut self) -> String {
        self.session
            .sink_mut()
            .drain()
            .iter()
            .filter_map(describe)
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[cfg(test)]
    fn with_faces(config: GameConfig, catalog: PerkCatalog, faces: &[u32]) -> Self {
        let session = GameSession::new(config, catalog)
            .unwrap()
            .with_dice_source(Box::new(rd_engine::ScriptedDice::new(faces.to_vec())));
        Self { session }
    }
}

fn describe(event: &GameEvent) -> Option<String> {
    match event {
        // Shown by RoundStarted and RerollSelectionReady
        GameEvent::RerollsUpdated { .. } => None,
        GameEvent::PerkChoicesAvailable { choices } => Some(format!(
            "Choose a perk:{}\n(choose <n> or skip)",
            numbered(choices)
        )),
        GameEvent::PerkReplacementRequired { perk, current } => Some(format!(
            "Perks full! Pick a slot for {}:{}\n(replace <slot> or skip)",
            perk.name,
            numbered(current)
        )),
        GameEvent::GameOver { .. } => Some(format!("{event}\nType 'new' to play again.")),
        _ => Some(event.to_string()),
    }
}

fn numbered(perks: &[Perk]) -> String {
    perks
        .iter()
        .enumerate()
        .map(|(i, p)| format!("\n  {}. {p}: {}", i + 1, p.description))
        .collect()
}

/// Parse a 1-based position typed by the player into an index.
fn parse_position(arg: &str, what: &str) -> Result<usize, String> {
    match arg.parse::<usize>() {
        Ok(0) => Err(format!("{what} numbers start at 1")),
        Ok(n) => Ok(n - 1),
        Err(_) => Err(format!("'{arg}' is not a {what} number")),
    }
}

fn parse_positions(args: &[&str], what: &str) -> Result<Vec<usize>, String> {
    args.iter().map(|arg| parse_position(arg, what)).collect()
}
