pub mod config;
pub mod cpe;
pub mod error;
pub mod metrics;
pub mod models;
pub mod search;
pub mod state;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, Result};
