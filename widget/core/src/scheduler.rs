//! Widget Timers
//!
//! Cancellable one-shot and repeating timers owned by the widget. Each timer
//! occupies a [`TimerSlot`]; scheduling into an occupied slot replaces the old
//! timer. Firings are delivered through a channel and drained with
//! [`Scheduler::try_next`] from the widget's poll loop, so all state changes
//! stay on the widget's task.
//!
//! A firing that was already queued when its slot was cancelled is dropped:
//! every slot carries a generation number and stale firings are filtered out.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

/// Handle to a spawned timer task; aborts the task on drop
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Whether the timer task has exited
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Named timer positions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerSlot {
    /// Once-per-unit tick while the ad's skip button is disabled
    AdCountdown,
    /// Hard limit after which the ad completes on its own
    AdCeiling,
}

#[derive(Debug)]
struct Firing<T> {
    slot: TimerSlot,
    generation: u64,
    event: T,
}

/// Owner of all widget timers
#[derive(Debug)]
pub struct Scheduler<T> {
    tx: mpsc::UnboundedSender<Firing<T>>,
    rx: mpsc::UnboundedReceiver<Firing<T>>,
    active: HashMap<TimerSlot, (u64, ScheduledTask)>,
    next_generation: u64,
}

impl<T: Send + 'static> Scheduler<T> {
    /// Create an empty scheduler
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            active: HashMap::new(),
            next_generation: 0,
        }
    }

    fn claim(&mut self, slot: TimerSlot) -> u64 {
        self.next_generation += 1;
        self.active.remove(&slot);
        self.next_generation
    }

    /// Fire `event` once after `delay`
    pub fn schedule_once(&mut self, slot: TimerSlot, delay: Duration, event: T) {
        let generation = self.claim(slot);
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            time::sleep(delay).await;
            let _ = tx.send(Firing {
                slot,
                generation,
                event,
            });
        });
        tracing::trace!(?slot, ?delay, "Scheduled one-shot timer");
        self.active
            .insert(slot, (generation, ScheduledTask { handle }));
    }

    /// Fire `event` every `period`, first after one full period
    pub fn schedule_repeating(&mut self, slot: TimerSlot, period: Duration, event: T)
    where
        T: Clone,
    {
        let generation = self.claim(slot);
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let firing = Firing {
                    slot,
                    generation,
                    event: event.clone(),
                };
                if tx.send(firing).is_err() {
                    break;
                }
            }
        });
        tracing::trace!(?slot, ?period, "Scheduled repeating timer");
        self.active
            .insert(slot, (generation, ScheduledTask { handle }));
    }

    /// Cancel the timer in `slot`, including any firing already queued
    pub fn cancel(&mut self, slot: TimerSlot) {
        if self.active.remove(&slot).is_some() {
            tracing::trace!(?slot, "Cancelled timer");
        }
    }

    /// Cancel every timer
    pub fn cancel_all(&mut self) {
        self.active.clear();
    }

    /// Whether `slot` holds a live timer
    #[must_use]
    pub fn is_scheduled(&self, slot: TimerSlot) -> bool {
        self.active
            .get(&slot)
            .is_some_and(|(_, task)| !task.is_finished())
    }

    /// Next pending firing, skipping stale ones
    pub fn try_next(&mut self) -> Option<T> {
        while let Ok(firing) = self.rx.try_recv() {
            let current = self.active.get(&firing.slot).map(|(generation, _)| *generation);
            if current == Some(firing.generation) {
                return Some(firing.event);
            }
            tracing::trace!(slot = ?firing.slot, "Dropped stale timer firing");
        }
        None
    }
}

impl<T: Send + 'static> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
