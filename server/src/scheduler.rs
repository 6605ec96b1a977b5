//! Cancellable timers bound to a room's lifetime.
//!
//! Each timer is a tokio task that pushes a message into the room's command
//! channel; the room never runs timer code itself. Cancelling aborts the
//! task, and dropping the scheduler cancels everything it still holds, so a
//! discarded room cannot be reached by an orphaned timer.

use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Countdown,
    Tick,
}

pub struct Scheduler<M> {
    tx: mpsc::UnboundedSender<M>,
    tasks: HashMap<TimerKind, JoinHandle<()>>,
}

impl<M: Send + 'static> Scheduler<M> {
    pub fn new(tx: mpsc::UnboundedSender<M>) -> Self {
        Self {
            tx,
            tasks: HashMap::new(),
        }
    }

    /// Sends `make()` every `period`, first after one full period.
    /// Replaces any running timer of the same kind.
    pub fn start_repeating<F>(&mut self, kind: TimerKind, period: Duration, make: F)
    where
        F: Fn() -> M + Send + 'static,
    {
        self.cancel(kind);
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            // Skip the first tick since it fires immediately
            timer.tick().await;

            loop {
                timer.tick().await;
                if tx.send(make()).is_err() {
                    break;
                }
            }
        });
        self.tasks.insert(kind, handle);
    }

    /// Returns true when a timer of `kind` was running.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        match self.tasks.remove(&kind) {
            Some(handle) => {
                handle.abort();
                debug!("Cancelled {:?} timer", kind);
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}

impl<M> Drop for Scheduler<M> {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_repeating_timer_fires_until_cancelled() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);
        scheduler.start_repeating(TimerKind::Tick, Duration::from_millis(5), || 1u32);

        for _ in 0..3 {
            let got = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
            assert_eq!(got, Some(1));
        }

        assert!(scheduler.cancel(TimerKind::Tick));
        assert!(!scheduler.cancel(TimerKind::Tick));
        tokio::time::sleep(Duration::from_millis(20)).await;
        while rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_drop_cancels_timers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        {
            let mut scheduler = Scheduler::new(tx);
            scheduler.start_repeating(TimerKind::Tick, Duration::from_millis(5), || ());
            scheduler.start_repeating(TimerKind::Countdown, Duration::from_millis(5), || ());
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
        // Every sender was owned by an aborted task or the dropped scheduler
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_restarting_replaces_timer() {
        let (tx, _rx) = mpsc::unbounded_channel::<()>();
        let mut scheduler = Scheduler::new(tx);
        scheduler.start_repeating(TimerKind::Tick, Duration::from_millis(50), || ());
        scheduler.start_repeating(TimerKind::Tick, Duration::from_millis(50), || ());
        assert_eq!(scheduler.tasks.len(), 1);
        scheduler.cancel_all();
        assert!(scheduler.tasks.is_empty());
    }
}
