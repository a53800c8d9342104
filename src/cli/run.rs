//! Handler for the `run` command.

use std::path::Path;

use tracing::info;

use crate::app::{App, AppConfig};
use crate::error::Result;

use super::RunArgs;

pub async fn execute(config_path: &Path, args: &RunArgs) -> Result<()> {
    let mut config = AppConfig::load(config_path)?;

    if args.json_logs {
        config.logging.format = "json".to_string();
    }
    if args.dry_run {
        config.dry_run = true;
    }

    config.init_logging();

    info!(
        targets = config.targets.len(),
        dry_run = config.dry_run,
        "whalecopy starting"
    );

    App::run(config, config_path.to_path_buf()).await?;

    info!("whalecopy stopped");
    Ok(())
}
