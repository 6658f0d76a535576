pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::azure_devops::{AzureDevOpsClient, AzureDevOpsConnector, AzureDevOpsSettings};
pub use adapters::webhook::{router, serve, AppState};
pub use core::estimate::compute_total;
pub use core::recalculator::{EstimateRecalculator, RecalculationSettings};
pub use utils::error::{EstimatorError, Result};
