pub mod app_config;
pub mod budget;
pub mod chat;
pub mod config;
pub mod maps;
pub mod places;
pub mod trip;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use budget::{BudgetEstimate, Catalog, CategoryGroup, DestinationRecord, Expense, MatchKind};
pub use chat::{ChatTurn, Role};
pub use config::{load_app_config, load_app_config_from_env};
pub use maps::embed_url;
pub use places::{LocationEntry, PlaceCandidate};
pub use trip::Trip;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read data file {path}: {source}")]
    DataFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse data file: {0}")]
    DataFileParse(#[from] serde_yaml::Error),

    #[error("data validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("coordinate is not finite: latitude={latitude}, longitude={longitude}")]
    NonFiniteCoordinate { latitude: f64, longitude: f64 },
}
