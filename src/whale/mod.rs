//! Whale wallet activity polling.

pub mod monitor;

pub use monitor::WhaleMonitor;
