//! Handler for the `status` command.

use std::path::Path;

use crate::app::AppConfig;
use crate::domain::BotState;
use crate::error::Result;

pub fn execute(config_path: &Path) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let state: BotState = crate::persistence::load_json(&config.state.bot_state_path())?;

    if state.positions.is_empty() {
        println!("no open positions");
    } else {
        println!("{:<24} {:>10} {:>10} {:>10}", "token", "size", "entry", "value");
        for position in state.positions.values() {
            println!(
                "{:<24} {:>10} {:>10} {:>10}",
                position.token_id,
                position.size,
                position.average_entry_price,
                position.value()
            );
        }
    }

    println!("cumulative spend: {}", state.cumulative_spend);
    println!("managed tokens: {}", state.managed_tokens.len());

    Ok(())
}
