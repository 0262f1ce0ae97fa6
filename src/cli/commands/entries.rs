//! Entries command - show what one store holds

use super::{human_size, Workspace};
use crate::cli::args::{EntriesArgs, OutputFormat};
use crate::error::{PrecacheError, PrecacheResult};
use crate::store::{CacheStorage, EntryInfo};
use crate::ui::{self, UiContext};
use console::style;

/// Execute the entries command
pub async fn execute(args: EntriesArgs, ws: &Workspace) -> PrecacheResult<()> {
    let name = args
        .name
        .unwrap_or_else(|| ws.config.deployment.version.trim().to_string());

    let store = ws
        .storage()
        .get(&name)
        .await?
        .ok_or_else(|| PrecacheError::CacheNotFound(name.clone()))?;
    let entries = store.entries().await?;

    if entries.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, &format!("Cache {} is empty", name));
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&name, &entries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.url);
            }
        }
    }

    Ok(())
}

fn print_table(name: &str, entries: &[EntryInfo]) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, &format!("Cache {}", name));

    println!(
        "{:<8} {:<12} {:<17} {}",
        style("STATUS").bold(),
        style("SIZE").bold(),
        style("CACHED").bold(),
        style("URL").bold()
    );
    println!("{}", "-".repeat(72));

    for entry in entries {
        let status = if (200..300).contains(&entry.status) {
            style(entry.status).green()
        } else {
            style(entry.status).yellow()
        };
        println!(
            "{:<8} {:<12} {:<17} {}",
            status,
            human_size(entry.size as u64),
            entry.cached_at.format("%Y-%m-%d %H:%M"),
            entry.url
        );
    }

    println!();
    println!("{} entries", entries.len());
}
