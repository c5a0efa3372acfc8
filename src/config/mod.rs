pub mod driver_config;

pub use driver_config::{load_driver_config, BusEntry, DriverConfig, DriverEntry};
