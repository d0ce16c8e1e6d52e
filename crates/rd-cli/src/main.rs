//! CLI frontend for the Rogue Dice engine.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rogue-dice",
    about = "Rogue Dice: roll toward a rising target, collect perks, run out of rolls",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log engine activity to stderr (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play an interactive game in the terminal
    Play {
        /// RNG seed (overrides the config file)
        #[arg(short, long)]
        seed: Option<u64>,

        /// JSON file with game rules
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// JSON file with perk definitions
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Autoplay many games and summarize how far they got
    Simulate {
        /// Number of games to play
        #[arg(short, long, default_value = "100")]
        games: u32,

        /// Seed of the first game; each further game adds one
        #[arg(short, long)]
        seed: Option<u64>,

        /// JSON file with game rules
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// JSON file with perk definitions
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Print the summary as JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// List the perks that can be offered
    Perks {
        /// JSON file with perk definitions
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8, default_level: &str) {
    let level = match verbose {
        0 => default_level,
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();

    // The console already reports rejected commands
    let default_level = match cli.command {
        Commands::Play { .. } => "error",
        _ => "warn",
    };
    init_tracing(cli.verbose, default_level);

    let result = match cli.command {
        Commands::Play {
            seed,
            config,
            catalog,
        } => commands::play::run(seed, config.as_deref(), catalog.as_deref()),
        Commands::Simulate {
            games,
            seed,
            config,
            catalog,
            json,
        } => commands::simulate::run(games, seed, config.as_deref(), catalog.as_deref(), json),
        Commands::Perks { catalog } => commands::perks::run(catalog.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
