//! Portfolio risk management: tunable config, sweep-based exits, the manual
//! override window, and the manager tying them together with the AI gate.

pub mod config;
pub mod executor;
pub mod manager;
pub mod override_window;

pub use config::RiskConfig;
pub use executor::{ExitResult, SmartExecutor};
pub use manager::PortfolioRiskManager;
pub use override_window::ManualOverride;
