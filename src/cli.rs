//! `start` / `test` / `info` / `stop` commands on the registered driver.

use crate::bus::SpiTransport;
use crate::config::DriverConfig;
use crate::errors::{DriverError, DriverResult};
use crate::messages::SensorMessage;
use crate::registry;
use crate::scheduler::PeriodicScheduler;
use crate::sensors::mpu6000::{DriverInfo, PollRate};
use crate::sensors::Mpu6000;
use crate::topics::TopicBus;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info};

/// Open the configured spidev node and start the driver on it
#[cfg(feature = "linux-hal")]
pub async fn start(
    config: &DriverConfig,
    scheduler: Arc<dyn PeriodicScheduler>,
    topics: TopicBus,
) -> DriverResult<Arc<Mpu6000>> {
    let name = config.driver.name.clone();
    registry::register(&name, move || async move {
        let spi = crate::hal::open_spidev(&config.bus)?;
        info!("[{}] using {}", config.driver.name, spi.label());
        build(config, Box::new(spi), scheduler, topics).await
    })
    .await
}

/// Start the driver on an already opened transport
pub async fn start_with(
    config: &DriverConfig,
    spi: Box<dyn SpiTransport>,
    scheduler: Arc<dyn PeriodicScheduler>,
    topics: TopicBus,
) -> DriverResult<Arc<Mpu6000>> {
    let name = config.driver.name.clone();
    registry::register(&name, move || build(config, spi, scheduler, topics)).await
}

async fn build(
    config: &DriverConfig,
    spi: Box<dyn SpiTransport>,
    scheduler: Arc<dyn PeriodicScheduler>,
    topics: TopicBus,
) -> DriverResult<Mpu6000> {
    let driver = Mpu6000::new(spi, scheduler, topics, &config.driver).await;

    if let Err(e) = driver.init().await {
        error!("[{}] driver init failed: {}", config.driver.name, e);
        // let the chip settle before the bus is handed back
        sleep(Duration::from_millis(100)).await;
        driver.shutdown();
        return Err(e);
    }

    if let Some(hz) = config.driver.poll_rate_hz {
        driver.accel().set_poll_rate(PollRate::Hz(hz))?;
    }
    info!("[{}] started", config.driver.name);
    Ok(driver)
}

fn not_running(name: &str) -> DriverError {
    DriverError::NotRunning {
        name: name.to_string(),
    }
}

/// One demand read through the accelerometer endpoint
pub async fn test(name: &str) -> DriverResult<SensorMessage> {
    let driver = registry::lookup(name).await.ok_or_else(|| not_running(name))?;
    driver.accel().read_report().await
}

pub async fn info(name: &str) -> DriverResult<DriverInfo> {
    let driver = registry::lookup(name).await.ok_or_else(|| not_running(name))?;
    Ok(driver.info())
}

/// Unregister and tear down the instance
pub async fn stop(name: &str) -> DriverResult<()> {
    let driver = registry::remove(name).await.ok_or_else(|| not_running(name))?;
    driver.shutdown();
    Ok(())
}
