use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::GateError;
use crate::services::clock::{Clock, TokioClock};
use crate::services::metrics::GateMetrics;
use crate::services::rate_window::{Admission, RateWindow, TimeUnit};

/// Blocks callers until the underlying [`RateWindow`] has room for them.
///
/// Waiters sleep for at most the remaining window time and are also woken
/// by every [`Gate::release`], after which they re-check admission from
/// scratch. Share a gate between tasks with an `Arc`.
pub struct Gate {
    window: Mutex<RateWindow>,
    wake: Notify,
    clock: Arc<dyn Clock>,
    metrics: GateMetrics,
}

impl Gate {
    pub fn new(unit: TimeUnit, limit: i64) -> Result<Self, GateError> {
        Self::with_clock(unit, limit, Arc::new(TokioClock::new()))
    }

    pub fn with_clock(unit: TimeUnit, limit: i64, clock: Arc<dyn Clock>) -> Result<Self, GateError> {
        Self::with_interval(limit, Duration::from_millis(unit.to_millis()), clock)
    }

    /// Gate over an arbitrary window length instead of one whole time unit.
    pub fn with_interval(
        limit: i64,
        interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, GateError> {
        let interval_millis = u64::try_from(interval.as_millis()).map_err(|_| {
            GateError::InvalidConfiguration(format!("interval {:?} is too long", interval))
        })?;
        let window = RateWindow::new(limit, interval_millis, clock.now_millis())?;
        debug!(
            "Gate created: {} admissions per {:?}",
            window.limit(),
            window.interval()
        );

        Ok(Self {
            window: Mutex::new(window),
            wake: Notify::new(),
            clock,
            metrics: GateMetrics::new(),
        })
    }

    /// Waits until a slot is granted. Dropping the returned future before it
    /// completes leaves the window untouched.
    pub async fn acquire(&self) {
        loop {
            // Register before checking so a release between the check and
            // the wait is not missed.
            let woken = self.wake.notified();
            tokio::pin!(woken);
            woken.as_mut().enable();

            match self.admit_now() {
                Admission::Admitted => {
                    self.metrics.increment_admissions();
                    return;
                }
                Admission::Wait(wait) => {
                    self.metrics.increment_waits();
                    trace!("Gate full, waiting up to {:?}", wait);
                    let _ = tokio::time::timeout(wait, woken).await;
                }
            }
        }
    }

    /// Like [`Gate::acquire`], but gives up with [`GateError::Cancelled`]
    /// once `token` fires. A cancelled caller never consumes a slot.
    pub async fn acquire_cancellable(&self, token: &CancellationToken) -> Result<(), GateError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                self.metrics.increment_cancellations();
                debug!("Admission wait cancelled");
                Err(GateError::Cancelled)
            }
            _ = self.acquire() => Ok(()),
        }
    }

    /// Single admission attempt that never waits.
    pub fn try_acquire(&self) -> bool {
        match self.admit_now() {
            Admission::Admitted => {
                self.metrics.increment_admissions();
                true
            }
            Admission::Wait(_) => false,
        }
    }

    /// Wakes every waiter so it re-checks admission. Call once the protected
    /// work is done, whether it succeeded or not. The slot stays spent.
    pub fn release(&self) {
        self.metrics.increment_releases();
        self.wake.notify_waiters();
    }

    /// Runs `action` under an admission, releasing afterwards even if the
    /// action is dropped before completing.
    pub async fn run<F, T>(&self, action: F) -> T
    where
        F: Future<Output = T>,
    {
        self.acquire().await;
        let _release = ReleaseOnDrop(self);
        action.await
    }

    pub async fn run_cancellable<F, T>(
        &self,
        token: &CancellationToken,
        action: F,
    ) -> Result<T, GateError>
    where
        F: Future<Output = T>,
    {
        self.acquire_cancellable(token).await?;
        let _release = ReleaseOnDrop(self);
        Ok(action.await)
    }

    pub fn limit(&self) -> u32 {
        self.lock_window().limit()
    }

    pub fn interval(&self) -> Duration {
        self.lock_window().interval()
    }

    pub fn stats(&self) -> HashMap<String, u64> {
        self.metrics.get_stats()
    }

    fn admit_now(&self) -> Admission {
        let mut window = self.lock_window();
        let now = self.clock.now_millis();
        let previous_end = window.window_end();
        let admission = window.try_admit(now);
        if window.window_end() != previous_end {
            trace!("Window rolled over at {}, next ends at {}", now, window.window_end());
        }
        admission
    }

    fn lock_window(&self) -> MutexGuard<'_, RateWindow> {
        // The window is never left half-updated, so a poisoned lock is still usable.
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct ReleaseOnDrop<'a>(&'a Gate);

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.release();
    }
}
