//! Handler for the `check` command: validate the strategy file and exit.

use std::path::Path;

use crate::app::AppConfig;
use crate::error::Result;

pub fn execute(config_path: &Path) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    println!("{} is valid", config_path.display());
    println!("targets: {}", config.targets.len());
    println!("dry_run: {}", config.dry_run);
    println!("stop loss: {}", config.risk.stop_loss_pct);
    println!("take profit: {}", config.risk.take_profit_pct);
    Ok(())
}
