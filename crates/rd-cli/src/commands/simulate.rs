use std::collections::BTreeMap;
use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use rd_engine::{GameConfig, GameSession, NullSink, PerkCatalog, PerkDecision};

/// Autoplay stops a game that is still going after this many rounds.
const MAX_ROUNDS: u32 = 1_000;

/// How one autoplayed game ended.
#[derive(Debug, Clone, PartialEq, Eq)]
struct GameSummary {
    seed: u64,
    round_reached: u32,
    rolls_confirmed: u32,
    rerolls_used: u32,
    perks: Vec<String>,
    capped: bool,
}

pub fn run(
    games: u32,
    seed: Option<u64>,
    config: Option<&Path>,
    catalog: Option<&Path>,
    json: bool,
) -> Result<(), String> {
    if games == 0 {
        return Err("--games must be at least 1".into());
    }
    let config = super::load_config(config, seed)?;
    let catalog = super::load_catalog(catalog)?;
    let base_seed = config.seed;

    let mut results = Vec::with_capacity(games as usize);
    for i in 0..games {
        let game_config = config.clone().with_seed(base_seed.wrapping_add(u64::from(i)));
        let summary = autoplay(game_config, catalog.clone())
            .map_err(|e| format!("game {} failed: {e}", i + 1))?;
        results.push(summary);
    }

    if json {
        print_json(&results, base_seed)
    } else {
        print_tables(&results, base_seed);
        Ok(())
    }
}

/// Play one game with a fixed policy: reroll low dice while the budget
/// allows, take the rarest offered perk, and only replace a held perk with
/// a rarer one.
fn autoplay(config: GameConfig, catalog: PerkCatalog) -> Result<GameSummary, String> {
    let seed = config.seed;
    let sides = config.sides_per_die;
    let mut session =
        GameSession::with_sink(config, catalog, NullSink).map_err(|e| e.to_string())?;
    session.start_game();

    let mut rolls_confirmed = 0;
    let mut rerolls_used = 0;
    let mut capped = false;

    while session.is_active() {
        if session.round_number() > MAX_ROUNDS {
            capped = true;
            break;
        }

        if session.awaiting_perk_choice() {
            resolve_perk_choice(&mut session)?;
            continue;
        }

        let roll = session.roll_dice().map_err(|e| e.to_string())?;
        let low: Vec<usize> = roll
            .values()
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v * 2 <= sides)
            .map(|(i, _)| i)
            .collect();
        if session.can_reroll(low.len()) {
            session.perform_reroll(&low).map_err(|e| e.to_string())?;
            rerolls_used += low.len() as u32;
        }

        session.confirm_roll().map_err(|e| e.to_string())?;
        rolls_confirmed += 1;
    }

    Ok(GameSummary {
        seed,
        round_reached: session.round_number(),
        rolls_confirmed,
        rerolls_used,
        perks: session
            .inventory()
            .perks()
            .iter()
            .map(|p| p.name.clone())
            .collect(),
        capped,
    })
}

fn resolve_perk_choice(session: &mut GameSession<NullSink>) -> Result<(), String> {
    let Some(best) = session
        .perk_choices()
        .iter()
        .max_by_key(|p| p.rarity)
        .cloned()
    else {
        return session.on_selection_cancelled().map_err(|e| e.to_string());
    };

    let decision = session
        .on_perk_chosen(best.clone())
        .map_err(|e| e.to_string())?;
    if decision == PerkDecision::Added {
        return Ok(());
    }

    let weakest = session
        .inventory()
        .perks()
        .iter()
        .enumerate()
        .min_by_key(|(_, p)| p.rarity)
        .filter(|(_, p)| p.rarity < best.rarity)
        .map(|(i, _)| i);
    match weakest {
        Some(slot) => session
            .on_perk_replace(slot, best)
            .map(|_| ())
            .map_err(|e| e.to_string()),
        None => session.on_selection_cancelled().map_err(|e| e.to_string()),
    }
}

fn print_tables(results: &[GameSummary], base_seed: u64) {
    let games = results.len();
    let rounds: Vec<u32> = results.iter().map(|r| r.round_reached).collect();
    let best = rounds.iter().copied().max().unwrap_or(0);
    let worst = rounds.iter().copied().min().unwrap_or(0);
    let capped = results.iter().filter(|r| r.capped).count();

    println!(
        "  {} {}",
        "Simulation".bold(),
        format!("({games} games, seeds {base_seed}..)").dimmed()
    );
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Games played".to_string(), games.to_string()]);
    table.add_row(vec![
        "Mean round reached".to_string(),
        format!("{:.2}", mean(results, |r| r.round_reached)),
    ]);
    table.add_row(vec!["Best round".to_string(), best.to_string()]);
    table.add_row(vec!["Worst round".to_string(), worst.to_string()]);
    table.add_row(vec![
        "Mean rolls confirmed".to_string(),
        format!("{:.2}", mean(results, |r| r.rolls_confirmed)),
    ]);
    table.add_row(vec![
        "Mean rerolls used".to_string(),
        format!("{:.2}", mean(results, |r| r.rerolls_used)),
    ]);
    if capped > 0 {
        table.add_row(vec![
            "Stopped at round cap".to_string(),
            capped.to_string().yellow().to_string(),
        ]);
    }
    println!("{table}");
    println!();

    let held = perk_counts(results);
    if held.is_empty() {
        println!("  {}", "No perks held at game end.".dimmed());
        return;
    }

    println!("  {}", "Perks Held at Game End".bold().underline());
    println!();
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Perk", "Games"]);
    for (name, count) in held {
        table.add_row(vec![name, count.to_string()]);
    }
    println!("{table}");

    if let Some(top) = results.iter().max_by_key(|r| r.round_reached) {
        println!();
        println!(
            "  Best run: seed {} reached round {}",
            top.seed, top.round_reached
        );
    }
}

fn print_json(results: &[GameSummary], base_seed: u64) -> Result<(), String> {
    let games: Vec<serde_json::Value> = results
        .iter()
        .map(|r| {
            serde_json::json!({
                "seed": r.seed,
                "round_reached": r.round_reached,
                "rolls_confirmed": r.rolls_confirmed,
                "rerolls_used": r.rerolls_used,
                "perks": r.perks,
                "capped": r.capped,
            })
        })
        .collect();
    let summary = serde_json::json!({
        "base_seed": base_seed,
        "games": games.len(),
        "mean_round_reached": mean(results, |r| r.round_reached),
        "perks_held": perk_counts(results),
        "results": games,
    });
    let out = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
    println!("{out}");
    Ok(())
}

fn mean(results: &[GameSummary], field: impl Fn(&GameSummary) -> u32) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let total: u64 = results.iter().map(|r| u64::from(field(r))).sum();
    total as f64 / results.len() as f64
}

fn perk_counts(results: &[GameSummary]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for name in results.iter().flat_map(|r| &r.perks) {
        *counts.entry(name.clone()).or_insert(0) += 1;
    }
    counts
}
