use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use rd_engine::Rarity;

pub fn run(catalog: Option<&Path>) -> Result<(), String> {
    let catalog = super::load_catalog(catalog)?;

    if catalog.is_empty() {
        println!("  No perks in catalog.");
        return Ok(());
    }

    println!(
        "  {} {}",
        "Perk Catalog".bold(),
        format!("({} perks)", catalog.len()).dimmed()
    );
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Kind", "Rarity", "Effect"]);
    for perk in catalog.perks() {
        let rarity = match perk.rarity {
            Rarity::Common => perk.rarity.to_string().normal(),
            Rarity::Uncommon => perk.rarity.to_string().green(),
            Rarity::Rare => perk.rarity.to_string().magenta(),
        };
        table.add_row(vec![
            perk.name.clone(),
            perk.kind.to_string(),
            rarity.to_string(),
            perk.description.clone(),
        ]);
    }
    println!("{table}");

    Ok(())
}
