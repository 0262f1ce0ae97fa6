//! List command - show cache stores

use super::{human_size, Workspace};
use crate::cli::args::{ListArgs, OutputFormat};
use crate::error::PrecacheResult;
use crate::store::CacheStorage;
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;

/// One row of the store listing
#[derive(Debug, Serialize)]
struct StoreSummary {
    name: String,
    entries: usize,
    bytes: u64,
    current: bool,
}

/// Execute the list command
pub async fn execute(args: ListArgs, ws: &Workspace) -> PrecacheResult<()> {
    let storage = ws.storage();
    let current = ws.config.deployment.version.trim();

    let mut stores = Vec::new();
    for name in storage.keys().await? {
        // Deleted between keys() and get()
        let Some(store) = storage.get(&name).await? else {
            continue;
        };
        let entries = store.entries().await?;
        stores.push(StoreSummary {
            current: name == current,
            entries: entries.len(),
            bytes: entries.iter().map(|e| e.size as u64).sum(),
            name,
        });
    }

    if stores.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, "No cache stores");
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&stores),
        OutputFormat::Json => print_json(&stores)?,
        OutputFormat::Plain => print_plain(&stores),
    }

    Ok(())
}

fn print_table(stores: &[StoreSummary]) {
    println!(
        "{:<24} {:<10} {:<12} {:<8}",
        style("NAME").bold(),
        style("ENTRIES").bold(),
        style("SIZE").bold(),
        style("STATUS").bold()
    );
    println!("{}", "-".repeat(56));

    for store in stores {
        let status = if store.current {
            style("current").green()
        } else {
            style("stale").yellow()
        };
        println!(
            "{:<24} {:<10} {:<12} {:<8}",
            store.name,
            store.entries,
            human_size(store.bytes),
            status
        );
    }

    println!();
    println!("{} store(s)", stores.len());
}

fn print_json(stores: &[StoreSummary]) -> PrecacheResult<()> {
    let json = serde_json::to_string_pretty(stores)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(stores: &[StoreSummary]) {
    for store in stores {
        println!("{}", store.name);
    }
}
