//! Background scheduling of refresh cycles.
//!
//! The scheduler owns a single timer task. Each tick spawns the cycle as its
//! own task, so aborting the timer (on `stop` or an interval change) never
//! cancels a cycle that is already running.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, warn};

use crate::{RefreshCoordinator, RefreshInterval};

/// Cancellable handle over the recurring refresh task.
pub struct RefreshScheduler {
    coordinator: Arc<RefreshCoordinator>,
    interval: Mutex<RefreshInterval>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    /// Create a stopped scheduler.
    pub fn new(coordinator: Arc<RefreshCoordinator>, interval: RefreshInterval) -> Self {
        Self {
            coordinator,
            interval: Mutex::new(interval),
            task: Mutex::new(None),
        }
    }

    /// Current interval.
    pub fn interval(&self) -> RefreshInterval {
        *self.interval.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the timer task is alive.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Run one cycle now, then keep running on the interval.
    ///
    /// Replaces any timer already running. Must be called from within a Tokio
    /// runtime.
    pub fn start(&self) {
        self.arm(true);
    }

    /// Cancel the timer. A cycle already in flight runs to completion.
    pub fn stop(&self) {
        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
            debug!("Refresh scheduler stopped");
        }
    }

    /// Replace the interval.
    ///
    /// If the scheduler is running, the pending timer is cancelled and a new
    /// one armed; the first cycle under the new interval runs one full period
    /// from now.
    pub fn set_interval(&self, interval: RefreshInterval) {
        *self.interval.lock().unwrap_or_else(PoisonError::into_inner) = interval;
        if self.is_running() {
            self.arm(false);
        }
    }

    fn arm(&self, run_now: bool) {
        let interval = self.interval();
        let coordinator = Arc::clone(&self.coordinator);
        let task = tokio::spawn(drive(coordinator, interval, run_now));

        let previous = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
        debug!(interval_ms = interval.as_millis(), "Refresh scheduler armed");
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn drive(coordinator: Arc<RefreshCoordinator>, interval: RefreshInterval, run_now: bool) {
    if run_now {
        run_detached(&coordinator).await;
    }

    let Some(period) = interval.period() else {
        return;
    };

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        run_detached(&coordinator).await;
    }
}

async fn run_detached(coordinator: &Arc<RefreshCoordinator>) {
    let coordinator = Arc::clone(coordinator);
    let cycle = tokio::spawn(async move {
        coordinator.run_cycle().await;
    });
    if let Err(err) = cycle.await {
        warn!("Refresh cycle task failed: {}", err);
    }
}
