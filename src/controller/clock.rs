//! Local playback clock
//!
//! Advances the position estimate between authoritative syncs so the progress
//! bar moves without polling the server. The reference instant is reset on
//! every authoritative event (load, seek commit, resume) so drift never
//! accumulates across them.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug)]
pub struct LocalPlaybackClock {
    reference: Instant,
}

impl Default for LocalPlaybackClock {
    fn default() -> Self {
        Self {
            reference: Instant::now(),
        }
    }
}

impl LocalPlaybackClock {
    pub fn reset(&mut self) {
        self.reference = Instant::now();
    }

    /// Seconds since the last reset or tick; moves the reference to now
    pub fn take_elapsed(&mut self) -> f64 {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.reference);
        self.reference = now;
        elapsed.as_secs_f64()
    }

    /// Next position estimate, clamped to the track duration
    pub fn advance(position_sec: f64, duration_sec: f64, elapsed_sec: f64) -> f64 {
        if !elapsed_sec.is_finite() || elapsed_sec <= 0.0 {
            return position_sec;
        }
        (position_sec + elapsed_sec).clamp(0.0, duration_sec.max(0.0))
    }
}

/// Owns the interval task that ticks the clock.
///
/// The tick callback resolves to `false` to end the task on its own. Every
/// start is matched by an abort in [`ClockDriver::stop`], which also runs on drop.
pub struct ClockDriver {
    interval: Duration,
    clock: Mutex<LocalPlaybackClock>,
    task: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl ClockDriver {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            clock: Mutex::new(LocalPlaybackClock::default()),
            task: Mutex::new(None),
        }
    }

    pub fn reset(&self) {
        lock(&self.clock).reset();
    }

    pub fn take_elapsed(&self) -> f64 {
        lock(&self.clock).take_elapsed()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.task)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Start ticking unless already running
    pub fn ensure_running<F>(&self, on_tick: F)
    where
        F: Fn() -> BoxFuture<'static, bool> + Send + Sync + 'static,
    {
        let mut task = lock(&self.task);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        self.reset();
        let period = self.interval;
        tracing::trace!(period_ms = period.as_millis() as u64, "Starting playback clock");
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !on_tick().await {
                    break;
                }
            }
        }));
    }

    pub fn stop(&self) {
        if let Some(handle) = lock(&self.task).take() {
            tracing::trace!("Stopping playback clock");
            handle.abort();
        }
    }
}

impl Drop for ClockDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
