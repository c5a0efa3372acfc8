use super::calibration::ScaleCalibration;
use super::engine::{Engine, EngineState, PollRate};
use crate::errors::{DriverError, DriverResult};
use crate::messages::{SensorMessage, REPORT_SIZE};
use std::sync::Arc;
use tracing::{debug, trace};

/// Which report an endpoint serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Accel,
    Gyro,
}

impl EndpointKind {
    pub fn device_path(&self) -> &'static str {
        match self {
            EndpointKind::Accel => "/dev/accel",
            EndpointKind::Gyro => "/dev/gyro",
        }
    }
}

/// Control commands accepted by either endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Shared between both endpoints
    SetPollRate(PollRate),
    SetQueueDepth(u32),
    SetLowpass(u32),
    /// Full-scale range in g (accel) or °/s (gyro)
    SetRange(u32),
    SetSampleRate(u32),
    SetReportFormat(u32),
    /// Anything else, handed to the generic device layer
    Generic { cmd: u32, arg: u64 },
}

/// Handling for commands the driver itself does not recognise
pub trait GenericControl: Send + Sync {
    fn control(&self, kind: EndpointKind, cmd: u32, arg: u64) -> DriverResult<()>;
}

/// Generic device layer with no extra commands of its own
pub struct BaseControl;

impl GenericControl for BaseControl {
    fn control(&self, _kind: EndpointKind, cmd: u32, _arg: u64) -> DriverResult<()> {
        Err(DriverError::UnknownCommand { cmd })
    }
}

/// Thin handle onto the shared engine for one report type
#[derive(Clone)]
pub struct Endpoint {
    engine: Arc<Engine>,
    kind: EndpointKind,
}

impl Endpoint {
    pub(crate) fn new(engine: Arc<Engine>, kind: EndpointKind) -> Self {
        Self { engine, kind }
    }

    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    pub fn open(&self) -> DriverResult<()> {
        self.engine.open()?;
        debug!("[{}] {} opened", self.engine.name(), self.kind.device_path());
        Ok(())
    }

    pub fn close(&self) -> DriverResult<()> {
        self.engine.close()?;
        debug!("[{}] {} closed", self.engine.name(), self.kind.device_path());
        Ok(())
    }

    /// Latest report for this endpoint; measures first in manual mode
    pub async fn read_report(&self) -> DriverResult<SensorMessage> {
        match self.kind {
            EndpointKind::Accel => Ok(SensorMessage::Accel(self.engine.read_accel().await?)),
            EndpointKind::Gyro => Ok(SensorMessage::Gyro(self.engine.read_gyro().await?)),
        }
    }

    /// Encode the latest report into `buf`, returning the bytes written.
    ///
    /// The size check comes first: an undersized buffer neither triggers a
    /// measurement nor gets written.
    pub async fn read(&self, buf: &mut [u8]) -> DriverResult<usize> {
        if buf.len() < REPORT_SIZE {
            return Err(DriverError::NoSpace {
                needed: REPORT_SIZE,
                available: buf.len(),
            });
        }
        self.read_report().await?.encode(buf)
    }

    /// Wait for the next measurement and return this endpoint's report.
    ///
    /// Resolves with `Shutdown` if the driver is torn down first.
    pub async fn wait_for_report(&self) -> DriverResult<SensorMessage> {
        // subscribe before the liveness check so a concurrent shutdown is never missed
        let mut shutdown = self.engine.subscribe_shutdown();
        match self.kind {
            EndpointKind::Accel => {
                let mut rx = self.engine.subscribe_accel();
                self.engine.ensure_live()?;
                tokio::select! {
                    changed = rx.changed() => changed.map_err(|_| DriverError::Shutdown)?,
                    _ = shutdown.changed() => return Err(DriverError::Shutdown),
                }
                let report = *rx.borrow_and_update();
                Ok(SensorMessage::Accel(report))
            }
            EndpointKind::Gyro => {
                let mut rx = self.engine.subscribe_gyro();
                self.engine.ensure_live()?;
                tokio::select! {
                    changed = rx.changed() => changed.map_err(|_| DriverError::Shutdown)?,
                    _ = shutdown.changed() => return Err(DriverError::Shutdown),
                }
                let report = *rx.borrow_and_update();
                Ok(SensorMessage::Gyro(report))
            }
        }
    }

    pub fn control(&self, cmd: Command) -> DriverResult<()> {
        trace!("[{}] {:?} via {:?}", self.engine.name(), cmd, self.kind);
        match cmd {
            Command::SetPollRate(rate) => self.engine.set_poll_rate(rate),
            Command::SetQueueDepth(_) => Err(DriverError::invalid("queue depth is not adjustable")),
            Command::SetLowpass(_) => Err(DriverError::invalid("low pass filter is not adjustable")),
            Command::SetRange(_) => Err(DriverError::invalid("range is not adjustable")),
            Command::SetSampleRate(_) => Err(DriverError::invalid("sample rate is not adjustable")),
            Command::SetReportFormat(_) => {
                Err(DriverError::invalid("no alternate report formats"))
            }
            Command::Generic { cmd, arg } => self.engine.generic().control(self.kind, cmd, arg),
        }
    }

    pub fn set_poll_rate(&self, rate: PollRate) -> DriverResult<()> {
        self.control(Command::SetPollRate(rate))
    }

    pub fn poll_rate(&self) -> PollRate {
        self.engine.poll_rate()
    }

    pub fn calibration(&self) -> ScaleCalibration {
        match self.kind {
            EndpointKind::Accel => self.engine.accel_calibration(),
            EndpointKind::Gyro => self.engine.gyro_calibration(),
        }
    }

    pub fn set_calibration(&self, cal: ScaleCalibration) {
        match self.kind {
            EndpointKind::Accel => self.engine.set_accel_calibration(cal),
            EndpointKind::Gyro => self.engine.set_gyro_calibration(cal),
        }
    }

    pub fn state(&self) -> EngineState {
        self.engine.state()
    }
}
