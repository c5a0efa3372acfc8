#![allow(dead_code)]

use embedded_hal::spi::ErrorKind;
use mpu6000_driver::bus::SpiTransport;
use mpu6000_driver::config::DriverEntry;
use mpu6000_driver::scheduler::{CallHandle, PeriodicScheduler, SchedulableTask};
use mpu6000_driver::sensors::mpu6000::registers::{BURST_LEN, DIR_READ, INT_STATUS, PRODUCT_ID};
use mpu6000_driver::{Mpu6000, TopicBus, TransportError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Register file of a simulated chip
pub struct ChipState {
    pub regs: [u8; 128],
    pub writes: Vec<(u8, u8)>,
    pub bursts: usize,
    pub fail: bool,
    /// Accept this many writes, then fail every exchange
    pub fail_after_writes: Option<usize>,
}

/// SPI transport answering from a shared [`ChipState`], auto-incrementing on reads
#[derive(Clone)]
pub struct MockChip {
    state: Arc<Mutex<ChipState>>,
}

impl MockChip {
    pub fn new(product: u8) -> Self {
        let mut regs = [0u8; 128];
        regs[PRODUCT_ID as usize] = product;
        Self {
            state: Arc::new(Mutex::new(ChipState {
                regs,
                writes: Vec::new(),
                bursts: 0,
                fail: false,
                fail_after_writes: None,
            })),
        }
    }

    /// Load one sample: accel, raw temperature and gyro, big-endian like the chip
    pub fn set_sample(&self, accel: [i16; 3], temperature: i16, gyro: [i16; 3]) {
        let mut state = self.state.lock().unwrap();
        let words = accel.iter().chain(std::iter::once(&temperature)).chain(gyro.iter());
        state.regs[INT_STATUS as usize] = 0x01;
        for (i, w) in words.enumerate() {
            let at = INT_STATUS as usize + 1 + 2 * i;
            state.regs[at..at + 2].copy_from_slice(&w.to_be_bytes());
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.state.lock().unwrap().fail = fail;
    }

    pub fn fail_after_writes(&self, n: usize) {
        self.state.lock().unwrap().fail_after_writes = Some(n);
    }

    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn bursts(&self) -> usize {
        self.state.lock().unwrap().bursts
    }
}

impl SpiTransport for MockChip {
    fn transfer(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        let write_limit_hit = state
            .fail_after_writes
            .is_some_and(|n| state.writes.len() >= n);
        if state.fail || write_limit_hit {
            return Err(TransportError::Transfer(ErrorKind::Other));
        }
        let reg = (buf[0] & !DIR_READ) as usize;
        if buf[0] & DIR_READ != 0 {
            if reg == INT_STATUS as usize && buf.len() == BURST_LEN + 1 {
                state.bursts += 1;
            }
            for (i, b) in buf.iter_mut().enumerate().skip(1) {
                *b = state.regs[(reg + i - 1) % 128];
            }
        } else {
            state.regs[reg] = buf[1];
            state.writes.push((reg as u8, buf[1]));
        }
        Ok(())
    }
}

struct Registration {
    handle: CallHandle,
    phase: Duration,
    period: Duration,
    task: Arc<dyn SchedulableTask>,
    cancelled: bool,
}

/// Scheduler that only records registrations; tests fire them by hand
#[derive(Default)]
pub struct RecordingScheduler {
    calls: Mutex<Vec<Registration>>,
}

impl RecordingScheduler {
    pub fn registrations(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn active(&self) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| !c.cancelled).count()
    }

    /// Phase and period of the live registrations
    pub fn active_timing(&self) -> Vec<(Duration, Duration)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| !c.cancelled)
            .map(|c| (c.phase, c.period))
            .collect()
    }

    /// Invoke every live registration once
    pub async fn fire(&self) {
        let tasks: Vec<_> = self
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| !c.cancelled)
            .map(|c| c.task.clone())
            .collect();
        for task in tasks {
            task.invoke().await;
        }
    }
}

impl PeriodicScheduler for RecordingScheduler {
    fn register_periodic(
        &self,
        phase: Duration,
        period: Duration,
        task: Arc<dyn SchedulableTask>,
    ) -> CallHandle {
        let mut calls = self.calls.lock().unwrap();
        let handle = CallHandle::new(calls.len() as u64 + 1);
        calls.push(Registration {
            handle,
            phase,
            period,
            task,
            cancelled: false,
        });
        handle
    }

    fn cancel(&self, handle: CallHandle) {
        let mut calls = self.calls.lock().unwrap();
        if let Some(c) = calls.iter_mut().find(|c| c.handle == handle) {
            c.cancelled = true;
        }
    }
}

/// Driver on a mock chip, not yet initialized
pub async fn driver(product: u8) -> (Mpu6000, MockChip, Arc<RecordingScheduler>, TopicBus) {
    let chip = MockChip::new(product);
    let scheduler = Arc::new(RecordingScheduler::default());
    let topics = TopicBus::new();
    let driver = Mpu6000::new(
        Box::new(chip.clone()),
        scheduler.clone(),
        topics.clone(),
        &DriverEntry::default(),
    )
    .await;
    (driver, chip, scheduler, topics)
}

/// Initialized driver on a production-revision chip
pub async fn started() -> (Mpu6000, MockChip, Arc<RecordingScheduler>, TopicBus) {
    let parts = driver(0x56).await;
    parts.0.init().await.unwrap();
    parts
}
