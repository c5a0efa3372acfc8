use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// Work a [`PeriodicScheduler`] can run on every tick
#[async_trait]
pub trait SchedulableTask: Send + Sync {
    async fn invoke(&self);
}

/// Identifies one periodic registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallHandle(u64);

impl CallHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Periodic callback facility.
///
/// `cancel` only prevents future invocations; an invocation already running
/// is allowed to finish.
pub trait PeriodicScheduler: Send + Sync {
    /// Invoke `task` every `period`, first after `phase`. `period` must be nonzero.
    fn register_periodic(
        &self,
        phase: Duration,
        period: Duration,
        task: Arc<dyn SchedulableTask>,
    ) -> CallHandle;

    /// Cancelling an unknown or already cancelled handle is a no-op
    fn cancel(&self, handle: CallHandle);
}

/// Scheduler backed by tokio interval tasks
pub struct TokioScheduler {
    runtime: Handle,
    next_id: AtomicU64,
    calls: Mutex<HashMap<u64, watch::Sender<bool>>>,
}

impl TokioScheduler {
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new() -> Self {
        Self::with_handle(Handle::current())
    }

    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime,
            next_id: AtomicU64::new(1),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Number of registrations that have not been cancelled
    pub fn active_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Same as [`TokioScheduler::new`]; panics outside a tokio runtime
impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PeriodicScheduler for TokioScheduler {
    fn register_periodic(
        &self,
        phase: Duration,
        period: Duration,
        task: Arc<dyn SchedulableTask>,
    ) -> CallHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (stop_tx, mut stop_rx) = watch::channel(false);

        self.runtime.spawn(async move {
            debug!("[scheduler] call {} every {:?} after {:?}", id, period, phase);

            let mut ticker = interval_at(Instant::now() + phase, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    // Fires on cancel and when the scheduler is dropped
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        trace!("[scheduler] call {} tick", id);
                        task.invoke().await;
                    }
                }
                if *stop_rx.borrow() {
                    break;
                }
            }

            debug!("[scheduler] call {} stopped", id);
        });

        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, stop_tx);
        CallHandle(id)
    }

    fn cancel(&self, handle: CallHandle) {
        let stop = self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle.0);
        if let Some(stop_tx) = stop {
            let _ = stop_tx.send(true);
        }
    }
}
