//! Config command - show configuration

use super::Workspace;
use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::error::PrecacheResult;

/// Execute the config command
pub async fn execute(args: ConfigArgs, ws: &Workspace) -> PrecacheResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(ws)?,
        Some(ConfigAction::Path) => println!("{}", ws.manager.path().display()),
    }
    Ok(())
}

fn show_config(ws: &Workspace) -> PrecacheResult<()> {
    let mut config = ws.config.clone();
    config.storage.dir = Some(ws.storage_dir.clone());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
