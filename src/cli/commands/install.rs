//! Install command - populate the versioned cache and activate it

use super::Workspace;
use crate::cli::args::InstallArgs;
use crate::controller::VersionTag;
use crate::error::PrecacheResult;
use crate::host::Registration;
use crate::store::CacheStorage;
use crate::ui::{self, TaskSpinner, UiContext};
use std::sync::Arc;

/// Execute the install command
pub async fn execute(args: InstallArgs, ws: &Workspace) -> PrecacheResult<()> {
    let ctx = UiContext::detect();

    let mut deployment = ws.deployment()?;
    if let Some(tag) = args.tag {
        deployment.version = VersionTag::new(tag)?;
    }

    let storage: Arc<dyn CacheStorage> = Arc::new(ws.storage());
    let network = ws.network(&deployment)?;
    let version = deployment.version.clone();

    ui::intro(&ctx, &format!("Installing {}", version));
    ui::key_value(&ctx, "Scope", deployment.scope.as_str());
    ui::key_value(&ctx, "Network", network.network_name());
    ui::key_value(
        &ctx,
        "Storage",
        &format!("{} ({})", ws.storage_dir.display(), storage.storage_name()),
    );

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!(
        "Fetching {} resources...",
        deployment.manifest.len()
    ));

    let registration = Registration::new(deployment.scope.clone(), storage, network);
    let report = match registration.update(deployment).await {
        Ok(report) => report,
        Err(e) => {
            spinner.stop_error(&format!("Install of {} failed", version));
            return Err(e);
        }
    };

    if let Some(install) = &report.install {
        spinner.stop(&format!("Cached {} resources", install.cached));
        if install.pruned > 0 {
            ui::step_info(
                &ctx,
                &format!("Dropped {} entries no longer listed", install.pruned),
            );
        }
    }

    let Some(activate) = &report.activate else {
        ui::outro_warn(&ctx, &format!("{} is installed and waiting", version));
        return Ok(());
    };

    for name in &activate.deleted {
        ui::step_ok_detail(&ctx, "Removed stale cache", name);
    }
    for failure in &activate.failed {
        ui::step_warn(&ctx, &failure.to_string());
    }

    if activate.failed.is_empty() {
        ui::outro_success(&ctx, &format!("{} is active", version));
    } else {
        ui::outro_warn(
            &ctx,
            &format!(
                "{} is active; {} stale caches remain",
                version,
                activate.failed.len()
            ),
        );
    }

    Ok(())
}
