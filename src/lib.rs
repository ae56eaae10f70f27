pub mod activity;
pub mod config;
pub mod error;
pub mod fake_fleet;
pub mod fleet_report;
pub mod history;
pub mod nominal;
pub mod payout;
pub mod peers;
pub mod predict;
pub mod profile;
pub mod snapshot;
pub mod stats;
pub mod store;
pub mod telemetry;
