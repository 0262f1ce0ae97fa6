//! Init command - create a starter precache.toml

use crate::cli::args::InitArgs;
use crate::config::{template, CONFIG_FILE_NAME};
use crate::error::{PrecacheError, PrecacheResult};
use crate::ui::{self, UiContext};
use std::path::Path;
use tokio::fs;

/// Execute the init command
pub async fn execute(args: InitArgs) -> PrecacheResult<()> {
    let ctx = UiContext::detect();

    let target_dir = match args.path {
        Some(ref p) => p.clone(),
        None => std::env::current_dir()
            .map_err(|e| PrecacheError::io("getting current directory", e))?,
    };

    let config_path = target_dir.join(CONFIG_FILE_NAME);

    if config_path.exists() && !args.force {
        return Err(PrecacheError::User(format!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        )));
    }

    ensure_dir(&target_dir).await?;

    fs::write(&config_path, template())
        .await
        .map_err(|e| PrecacheError::io(format!("writing {}", config_path.display()), e))?;

    ui::step_ok_detail(
        &ctx,
        "Created deployment file",
        &config_path.display().to_string(),
    );
    ui::remark(&ctx, "List your resources under [manifest], then run: precache install");

    Ok(())
}

async fn ensure_dir(dir: &Path) -> PrecacheResult<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| PrecacheError::io(format!("creating directory {}", dir.display()), e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn init_creates_config() {
        let temp = TempDir::new().unwrap();
        let args = InitArgs {
            force: false,
            path: Some(temp.path().to_path_buf()),
        };
        execute(args).await.unwrap();

        let content = std::fs::read_to_string(temp.path().join(CONFIG_FILE_NAME)).unwrap();
        assert!(content.contains("[deployment]"));
        assert!(content.contains("[manifest]"));
    }

    #[tokio::test]
    async fn init_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("site").join("web");
        let args = InitArgs {
            force: false,
            path: Some(nested.clone()),
        };
        execute(args).await.unwrap();
        assert!(nested.join(CONFIG_FILE_NAME).is_file());
    }

    #[tokio::test]
    async fn init_refuses_overwrite_without_force() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(CONFIG_FILE_NAME), "existing").unwrap();

        let args = InitArgs {
            force: false,
            path: Some(temp.path().to_path_buf()),
        };
        let err = execute(args).await.unwrap_err().to_string();
        assert!(err.contains("already exists"));
    }

    #[tokio::test]
    async fn init_overwrites_with_force() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(CONFIG_FILE_NAME), "old content").unwrap();

        let args = InitArgs {
            force: true,
            path: Some(temp.path().to_path_buf()),
        };
        execute(args).await.unwrap();

        let content = std::fs::read_to_string(temp.path().join(CONFIG_FILE_NAME)).unwrap();
        assert!(content.contains("[deployment]"));
    }
}
