//! Acquisition engine shared by the accelerometer and gyroscope endpoints.
//!
//! Every measurement is one burst exchange. The register interface stays
//! locked from the transfer until both reports are published, and completed
//! reports are swapped into watch channels whole, so readers only ever see a
//! full report.

use super::calibration::{
    temperature_celsius, ScaleCalibration, ACCEL_RANGE_SCALE, GYRO_RANGE_SCALE,
};
use super::configure::configure;
use super::endpoint::GenericControl;
use super::product::{probe, ProductId};
use super::registers::{RegisterInterface, BURST_LEN, INT_STATUS};
use crate::bus::SpiTransport;
use crate::errors::{DriverError, DriverResult};
use crate::messages::{AccelReport, GyroReport, SensorMessage};
use crate::scheduler::{CallHandle, PeriodicScheduler, SchedulableTask};
use crate::time::absolute_time_us;
use crate::topics::{TopicBus, TopicHandle};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;
use tokio::time::Duration;
use tracing::{debug, info, warn};

/// Shortest periodic interval the engine accepts (1 kHz)
pub const MIN_INTERVAL_US: u32 = 1_000;

/// Delay before the first periodic measurement
const TRIGGER_PHASE: Duration = Duration::from_millis(1);

/// Requested sampling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollRate {
    /// Measure only when a reader asks
    Manual,
    /// Triggered by an external signal; not supported by this chip wiring
    External,
    /// Periodic sampling at the given rate
    Hz(u32),
}

/// One burst transaction, decoded from the chip's big-endian words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSampleFrame {
    pub status: u8,
    pub accel: [i16; 3],
    pub temperature: i16,
    pub gyro: [i16; 3],
}

impl RawSampleFrame {
    pub fn parse(buf: &[u8; BURST_LEN]) -> Self {
        let word = |i: usize| i16::from_be_bytes([buf[1 + 2 * i], buf[2 + 2 * i]]);
        Self {
            status: buf[0],
            accel: [word(0), word(1), word(2)],
            temperature: word(3),
            gyro: [word(4), word(5), word(6)],
        }
    }
}

/// Shared sampling state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineState {
    /// Periodic interval in microseconds, 0 in manual mode
    pub interval_us: u32,
    pub product: Option<ProductId>,
    /// A periodic trigger is registered
    pub running: bool,
}

/// Counters reported by `info`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStats {
    pub measurements: u64,
    pub failed_measurements: u64,
    pub reads: u64,
}

#[derive(Default)]
struct Control {
    interval_us: u32,
    product: Option<ProductId>,
    call: Option<CallHandle>,
    open_count: u32,
    shut_down: bool,
}

#[derive(Default, Clone, Copy)]
struct Calibration {
    accel: ScaleCalibration,
    gyro: ScaleCalibration,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Engine {
    name: String,
    regs: tokio::sync::Mutex<RegisterInterface<Box<dyn SpiTransport>>>,
    control: Mutex<Control>,
    calibration: Mutex<Calibration>,
    scheduler: Arc<dyn PeriodicScheduler>,
    generic: Box<dyn GenericControl>,
    topics: TopicBus,
    accel_topic: TopicHandle,
    gyro_topic: TopicHandle,
    accel_tx: watch::Sender<AccelReport>,
    gyro_tx: watch::Sender<GyroReport>,
    shutdown_tx: watch::Sender<bool>,
    measurements: AtomicU64,
    failed_measurements: AtomicU64,
    reads: AtomicU64,
    self_ref: Weak<Engine>,
}

/// Periodic trigger; holds the engine weakly so a registration never keeps it alive
struct MeasureTask {
    engine: Weak<Engine>,
}

#[async_trait]
impl SchedulableTask for MeasureTask {
    async fn invoke(&self) {
        let Some(engine) = self.engine.upgrade() else {
            return;
        };
        if let Err(e) = engine.measure().await {
            warn!("[{}] periodic measurement failed: {}", engine.name, e);
        }
    }
}

pub(crate) struct EngineParts {
    pub name: String,
    pub spi: Box<dyn SpiTransport>,
    pub scheduler: Arc<dyn PeriodicScheduler>,
    pub generic: Box<dyn GenericControl>,
    pub topics: TopicBus,
    pub accel_topic: TopicHandle,
    pub gyro_topic: TopicHandle,
}

impl Engine {
    pub(crate) fn new(parts: EngineParts) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            name: parts.name,
            regs: tokio::sync::Mutex::new(RegisterInterface::new(parts.spi)),
            control: Mutex::new(Control::default()),
            calibration: Mutex::new(Calibration::default()),
            scheduler: parts.scheduler,
            generic: parts.generic,
            topics: parts.topics,
            accel_topic: parts.accel_topic,
            gyro_topic: parts.gyro_topic,
            accel_tx: watch::channel(AccelReport::default()).0,
            gyro_tx: watch::channel(GyroReport::default()).0,
            shutdown_tx: watch::channel(false).0,
            measurements: AtomicU64::new(0),
            failed_measurements: AtomicU64::new(0),
            reads: AtomicU64::new(0),
            self_ref: self_ref.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Probe the product ID, then run the configuration sequence
    pub(crate) async fn init(&self) -> DriverResult<ProductId> {
        let mut regs = self.regs.lock().await;
        let product = probe(&mut *regs)?;
        lock(&self.control).product = Some(product);
        configure(&mut *regs, product).await?;
        info!("[{}] configured", self.name);
        Ok(product)
    }

    pub(crate) fn ensure_live(&self) -> DriverResult<()> {
        if lock(&self.control).shut_down {
            Err(DriverError::Shutdown)
        } else {
            Ok(())
        }
    }

    /// Fetch one burst from the chip and publish both reports.
    ///
    /// On failure the previous reports stay in place.
    pub async fn measure(&self) -> DriverResult<()> {
        let mut regs = self.regs.lock().await;

        let mut buf = [0u8; BURST_LEN];
        if let Err(e) = regs.read_burst(INT_STATUS, &mut buf) {
            self.failed_measurements.fetch_add(1, Ordering::Relaxed);
            return Err(e.into());
        }
        let frame = RawSampleFrame::parse(&buf);

        let timestamp = absolute_time_us();
        let cal = *lock(&self.calibration);
        let temperature = temperature_celsius(frame.temperature);

        let [ax, ay, az] = cal.accel.apply(frame.accel, ACCEL_RANGE_SCALE);
        let accel = AccelReport {
            timestamp,
            x: ax,
            y: ay,
            z: az,
            temperature,
            x_raw: frame.accel[0],
            y_raw: frame.accel[1],
            z_raw: frame.accel[2],
        };

        let [gx, gy, gz] = cal.gyro.apply(frame.gyro, GYRO_RANGE_SCALE);
        let gyro = GyroReport {
            timestamp,
            x: gx,
            y: gy,
            z: gz,
            temperature,
            x_raw: frame.gyro[0],
            y_raw: frame.gyro[1],
            z_raw: frame.gyro[2],
        };

        // Wakes anyone waiting on either endpoint
        self.accel_tx.send_replace(accel);
        self.gyro_tx.send_replace(gyro);

        self.topics.publish(&self.accel_topic, SensorMessage::Accel(accel));
        self.topics.publish(&self.gyro_topic, SensorMessage::Gyro(gyro));

        self.measurements.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn is_manual(&self) -> bool {
        lock(&self.control).interval_us == 0
    }

    /// Latest accel report, measuring first when in manual mode
    pub async fn read_accel(&self) -> DriverResult<AccelReport> {
        self.ensure_live()?;
        if self.is_manual() {
            self.measure().await?;
        }
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(*self.accel_tx.borrow())
    }

    /// Latest gyro report, measuring first when in manual mode
    pub async fn read_gyro(&self) -> DriverResult<GyroReport> {
        self.ensure_live()?;
        if self.is_manual() {
            self.measure().await?;
        }
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(*self.gyro_tx.borrow())
    }

    pub fn subscribe_accel(&self) -> watch::Receiver<AccelReport> {
        self.accel_tx.subscribe()
    }

    pub fn subscribe_gyro(&self) -> watch::Receiver<GyroReport> {
        self.gyro_tx.subscribe()
    }

    /// Changes once, when the engine is shut down
    pub fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    pub fn set_poll_rate(&self, rate: PollRate) -> DriverResult<()> {
        self.ensure_live()?;
        match rate {
            PollRate::Manual => {
                self.stop();
                Ok(())
            }
            PollRate::External => Err(DriverError::invalid("external polling is not supported")),
            PollRate::Hz(0) => Err(DriverError::invalid("poll rate must be nonzero")),
            PollRate::Hz(hz) => {
                let interval_us = 1_000_000 / hz;
                if interval_us < MIN_INTERVAL_US {
                    return Err(DriverError::invalid(format!(
                        "{} Hz is above the maximum of {} Hz",
                        hz,
                        1_000_000 / MIN_INTERVAL_US
                    )));
                }
                self.start(interval_us)
            }
        }
    }

    /// Register the periodic trigger, or move an existing one to a new period
    fn start(&self, interval_us: u32) -> DriverResult<()> {
        let mut control = lock(&self.control);
        // checked under the same lock shutdown takes
        if control.shut_down {
            return Err(DriverError::Shutdown);
        }
        if control.call.is_some() && control.interval_us == interval_us {
            return Ok(());
        }
        if let Some(call) = control.call.take() {
            self.scheduler.cancel(call);
        }

        control.interval_us = interval_us;
        let task = Arc::new(MeasureTask {
            engine: self.self_ref.clone(),
        });
        control.call = Some(self.scheduler.register_periodic(
            TRIGGER_PHASE,
            Duration::from_micros(interval_us as u64),
            task,
        ));
        info!("[{}] periodic sampling every {} us", self.name, interval_us);
        Ok(())
    }

    /// Cancel the periodic trigger and fall back to manual polling
    fn stop(&self) {
        let mut control = lock(&self.control);
        if let Some(call) = control.call.take() {
            self.scheduler.cancel(call);
            info!("[{}] periodic sampling stopped", self.name);
        }
        control.interval_us = 0;
    }

    pub fn poll_rate(&self) -> PollRate {
        match lock(&self.control).interval_us {
            0 => PollRate::Manual,
            interval_us => PollRate::Hz(1_000_000 / interval_us),
        }
    }

    /// First open of any endpoint resets to manual polling
    pub(crate) fn open(&self) -> DriverResult<()> {
        let first = {
            let mut control = lock(&self.control);
            if control.shut_down {
                return Err(DriverError::Shutdown);
            }
            control.open_count += 1;
            control.open_count == 1
        };
        if first {
            debug!("[{}] first open, manual polling", self.name);
            self.stop();
        }
        Ok(())
    }

    /// Last close of all endpoints stops periodic sampling
    pub(crate) fn close(&self) -> DriverResult<()> {
        let last = {
            let mut control = lock(&self.control);
            if control.open_count == 0 {
                return Err(DriverError::invalid("endpoint is not open"));
            }
            control.open_count -= 1;
            control.open_count == 0
        };
        if last {
            debug!("[{}] last close", self.name);
            self.stop();
        }
        Ok(())
    }

    pub(crate) fn generic(&self) -> &dyn GenericControl {
        self.generic.as_ref()
    }

    pub fn accel_calibration(&self) -> ScaleCalibration {
        lock(&self.calibration).accel
    }

    pub fn gyro_calibration(&self) -> ScaleCalibration {
        lock(&self.calibration).gyro
    }

    pub fn set_accel_calibration(&self, cal: ScaleCalibration) {
        lock(&self.calibration).accel = cal;
    }

    pub fn set_gyro_calibration(&self, cal: ScaleCalibration) {
        lock(&self.calibration).gyro = cal;
    }

    pub fn state(&self) -> EngineState {
        let control = lock(&self.control);
        EngineState {
            interval_us: control.interval_us,
            product: control.product,
            running: control.call.is_some(),
        }
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            measurements: self.measurements.load(Ordering::Relaxed),
            failed_measurements: self.failed_measurements.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
        }
    }

    /// Stop sampling for good; later reads and controls fail with `Shutdown`
    pub fn shutdown(&self) {
        {
            let mut control = lock(&self.control);
            control.shut_down = true;
            if let Some(call) = control.call.take() {
                self.scheduler.cancel(call);
            }
            control.interval_us = 0;
        }
        // wake anyone parked in wait_for_report
        self.shutdown_tx.send_replace(true);
        info!("[{}] shut down", self.name);
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // make sure no trigger outlives the engine
        let control = self
            .control
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(call) = control.call.take() {
            self.scheduler.cancel(call);
        }
    }
}
