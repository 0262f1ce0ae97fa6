//! Clear command - delete every cache store

use super::Workspace;
use crate::cli::args::ClearArgs;
use crate::error::PrecacheResult;
use crate::store::CacheStorage;
use crate::ui::{self, UiContext};

/// Execute the clear command
pub async fn execute(args: ClearArgs, ws: &Workspace) -> PrecacheResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let storage = ws.storage();

    let names = storage.keys().await?;
    let unreadable = storage.unreadable().await?;
    let total = names.len() + unreadable.len();
    if total == 0 {
        ui::step_info(&ctx, "No cache stores");
        return Ok(());
    }

    let prompt = format!("Delete {} cache store(s)?", total);
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::step_warn_hint(&ctx, "Nothing deleted", "Use --yes to skip confirmation");
        return Ok(());
    }

    let mut removed = 0;
    for name in &names {
        match storage.delete(name).await {
            Ok(true) => {
                removed += 1;
                ui::step_ok_detail(&ctx, "Deleted", name);
            }
            Ok(false) => {}
            Err(e) => ui::step_error(&ctx, &format!("{}: {}", name, e)),
        }
    }

    if !unreadable.is_empty() {
        match storage.remove_unreadable().await {
            Ok(dirs) => {
                for dir in &dirs {
                    ui::step_ok_detail(&ctx, "Deleted unreadable", &dir.display().to_string());
                }
                removed += dirs.len();
            }
            Err(e) => ui::step_error(&ctx, &format!("unreadable stores: {}", e)),
        }
    }

    if removed >= total {
        ui::outro_success(&ctx, &format!("Removed {} store(s)", removed));
    } else {
        ui::outro_warn(&ctx, &format!("Removed {} of {} store(s)", removed, total));
    }
    Ok(())
}
