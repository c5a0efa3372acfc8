//! InvenSense MPU-6000 driver on SPI.
//!
//! One [`engine::Engine`] does the bus work; [`Mpu6000::accel`] and
//! [`Mpu6000::gyro`] hand out endpoint handles onto it.

pub mod calibration;
pub mod configure;
pub mod endpoint;
pub mod engine;
pub mod product;
pub mod registers;

use crate::bus::SpiTransport;
use crate::config::DriverEntry;
use crate::errors::DriverResult;
use crate::scheduler::PeriodicScheduler;
use crate::topics::TopicBus;
use endpoint::{BaseControl, Endpoint, EndpointKind, GenericControl};
use engine::{Engine, EngineParts, EngineState, EngineStats};
use product::ProductId;
use std::fmt;
use std::sync::Arc;

pub use calibration::ScaleCalibration;
pub use endpoint::Command;
pub use engine::PollRate;

pub struct Mpu6000 {
    engine: Arc<Engine>,
}

/// Snapshot printed by the `info` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverInfo {
    pub name: String,
    pub state: EngineState,
    pub stats: EngineStats,
}

impl fmt::Display for DriverInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "driver:         {}", self.name)?;
        match self.state.product {
            Some(p) => writeln!(f, "product:        {:#04x}", p.code())?,
            None => writeln!(f, "product:        unknown")?,
        }
        match self.state.interval_us {
            0 => writeln!(f, "polling:        manual")?,
            us => writeln!(f, "polling:        every {} us", us)?,
        }
        writeln!(f, "measurements:   {}", self.stats.measurements)?;
        writeln!(f, "failures:       {}", self.stats.failed_measurements)?;
        write!(f, "reads:          {}", self.stats.reads)
    }
}

impl Mpu6000 {
    /// Build the driver and advertise its topics; the chip is not touched until [`Mpu6000::init`]
    pub async fn new(
        spi: Box<dyn SpiTransport>,
        scheduler: Arc<dyn PeriodicScheduler>,
        topics: TopicBus,
        driver: &DriverEntry,
    ) -> Self {
        Self::with_generic_control(spi, scheduler, topics, driver, Box::new(BaseControl)).await
    }

    pub async fn with_generic_control(
        spi: Box<dyn SpiTransport>,
        scheduler: Arc<dyn PeriodicScheduler>,
        topics: TopicBus,
        driver: &DriverEntry,
        generic: Box<dyn GenericControl>,
    ) -> Self {
        let accel_topic = topics.advertise(&driver.accel_topic).await;
        let gyro_topic = topics.advertise(&driver.gyro_topic).await;
        let engine = Engine::new(EngineParts {
            name: driver.name.clone(),
            spi,
            scheduler,
            generic,
            topics,
            accel_topic,
            gyro_topic,
        });
        Self { engine }
    }

    /// Identify the chip and configure it; an unknown product leaves it unconfigured
    pub async fn init(&self) -> DriverResult<ProductId> {
        self.engine.init().await
    }

    pub fn name(&self) -> &str {
        self.engine.name()
    }

    pub fn accel(&self) -> Endpoint {
        Endpoint::new(self.engine.clone(), EndpointKind::Accel)
    }

    pub fn gyro(&self) -> Endpoint {
        Endpoint::new(self.engine.clone(), EndpointKind::Gyro)
    }

    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    pub fn info(&self) -> DriverInfo {
        DriverInfo {
            name: self.engine.name().to_string(),
            state: self.engine.state(),
            stats: self.engine.stats(),
        }
    }

    /// Cancel periodic sampling and refuse further requests
    pub fn shutdown(&self) {
        self.engine.shutdown();
    }
}
