pub mod perks;
pub mod play;
pub mod simulate;

use std::fs;
use std::path::Path;

use rd_engine::{GameConfig, PerkCatalog};

/// Load game rules from a JSON file, or the defaults when no file is given.
/// A `seed` overrides whatever the file says.
fn load_config(path: Option<&Path>, seed: Option<u64>) -> Result<GameConfig, String> {
    let config = match path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            GameConfig::from_json(&json).map_err(|e| format!("{}: {e}", path.display()))?
        }
        None => GameConfig::default(),
    };
    Ok(match seed {
        Some(seed) => config.with_seed(seed),
        None => config,
    })
}

/// Load a perk catalog from a JSON file, or the standard catalog.
fn load_catalog(path: Option<&Path>) -> Result<PerkCatalog, String> {
    let Some(path) = path else {
        return Ok(PerkCatalog::standard());
    };
    let json =
        fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    PerkCatalog::from_json(&json).map_err(|e| format!("{}: {e}", path.display()))
}
