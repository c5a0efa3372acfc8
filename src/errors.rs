use thiserror::Error;

/// Errors raised by the SPI transport underneath the register layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("SPI transfer failed: {0:?}")]
    Transfer(embedded_hal::spi::ErrorKind),

    #[error("Failed to open SPI device '{path}': {reason}")]
    Open { path: String, reason: String },
}

/// Errors returned by driver operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("Bus transaction failed: {0}")]
    Bus(#[from] TransportError),

    #[error("Unexpected product ID {id:#04x}")]
    UnknownProduct { id: u8 },

    #[error("Buffer too small: need {needed} bytes, got {available}")]
    NoSpace { needed: usize, available: usize },

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Unrecognised control command {cmd:#06x}")]
    UnknownCommand { cmd: u32 },

    #[error("Driver '{name}' is already running")]
    AlreadyRunning { name: String },

    #[error("Driver '{name}' is not running")]
    NotRunning { name: String },

    #[error("Driver has been shut down")]
    Shutdown,
}

impl DriverError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        DriverError::InvalidArgument { reason: reason.into() }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from '{path}': {source}")]
    LoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration format: {0}")]
    FormatError(#[from] toml::de::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

pub type DriverResult<T> = Result<T, DriverError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
