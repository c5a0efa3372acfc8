// Public modules
pub mod bus;
pub mod cli;
pub mod config;
pub mod errors;
pub mod hal;
pub mod messages;
pub mod registry;
pub mod scheduler;
pub mod sensors;
pub mod time;
pub mod topics;

// Re-export commonly used types
pub use config::{load_driver_config, DriverConfig};
pub use errors::{ConfigError, DriverError, DriverResult, TransportError};
pub use messages::{AccelReport, GyroReport, SensorMessage, REPORT_SIZE};
pub use scheduler::{PeriodicScheduler, SchedulableTask, TokioScheduler};
pub use sensors::mpu6000::{Command, PollRate, ScaleCalibration};
pub use sensors::Mpu6000;
pub use topics::TopicBus;

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Default configuration directory, relative to the working directory
pub const CONFIG_DIR: &str = "config";

/// Initialize tracing with default configuration
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
}

/// Driver config file, honouring the CONFIG_PATH override
pub fn config_file() -> PathBuf {
    let dir = std::env::var("CONFIG_PATH").unwrap_or_else(|_| CONFIG_DIR.to_string());
    PathBuf::from(dir).join("mpu6000.toml")
}
