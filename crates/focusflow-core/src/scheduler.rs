//! Periodic callback scheduling.
//!
//! The timer needs a once-per-second callback while the app is open. That
//! loop is modelled as [`Scheduler::every`], which hands back a
//! [`TickHandle`]; cancelling (or dropping) the handle stops the callback.
//!
//! Everything here is single-threaded: callbacks are `FnMut` without a
//! `Send` bound and the tokio implementation runs on a `LocalSet`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A boxed periodic callback.
pub type Callback = Box<dyn FnMut()>;

/// Registers periodic callbacks.
pub trait Scheduler {
    fn every(&self, period: Duration, callback: Callback) -> TickHandle;
}

/// Cancellation handle for a periodic callback.
pub struct TickHandle {
    cancelled: Rc<Cell<bool>>,
    task: Option<JoinHandle<()>>,
}

impl TickHandle {
    fn new(cancelled: Rc<Cell<bool>>, task: Option<JoinHandle<()>>) -> Self {
        Self { cancelled, task }
    }

    pub fn cancel(&mut self) {
        self.cancelled.set(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Drives callbacks from `tokio::time::interval`.
///
/// Must be used from inside a `tokio::task::LocalSet`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn every(&self, period: Duration, mut callback: Callback) -> TickHandle {
        let cancelled = Rc::new(Cell::new(false));
        let flag = Rc::clone(&cancelled);
        let period = period.max(Duration::from_millis(1));
        let task = tokio::task::spawn_local(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick resolves immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if flag.get() {
                    break;
                }
                callback();
            }
        });
        TickHandle::new(cancelled, Some(task))
    }
}

struct ManualTimer {
    period: Duration,
    next_due: Duration,
    callback: Rc<RefCell<Callback>>,
    cancelled: Rc<Cell<bool>>,
}

#[derive(Default)]
struct ManualInner {
    elapsed: Duration,
    timers: Vec<ManualTimer>,
}

/// Virtual-time scheduler for tests and simulations.
///
/// Time only moves through [`ManualScheduler::advance`], which fires every
/// due callback in order of due time.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    inner: Rc<RefCell<ManualInner>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        self.inner.borrow().elapsed
    }

    /// Number of live (not cancelled) callbacks.
    pub fn active(&self) -> usize {
        self.inner
            .borrow()
            .timers
            .iter()
            .filter(|t| !t.cancelled.get())
            .count()
    }

    pub fn advance(&self, by: Duration) {
        let target = self.inner.borrow().elapsed.saturating_add(by);
        loop {
            let callback = {
                let mut inner = self.inner.borrow_mut();
                let due = inner
                    .timers
                    .iter_mut()
                    .filter(|t| !t.cancelled.get() && t.next_due <= target)
                    .min_by_key(|t| t.next_due);
                let Some(timer) = due else {
                    break;
                };
                let at = timer.next_due;
                timer.next_due = timer.next_due.saturating_add(timer.period);
                let callback = Rc::clone(&timer.callback);
                inner.elapsed = at;
                callback
            };
            // The scheduler borrow is released so the callback may use it.
            (callback.borrow_mut())();
        }
        let mut inner = self.inner.borrow_mut();
        inner.elapsed = target;
        inner.timers.retain(|t| !t.cancelled.get());
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }
}

impl Scheduler for ManualScheduler {
    fn every(&self, period: Duration, callback: Callback) -> TickHandle {
        let cancelled = Rc::new(Cell::new(false));
        let period = period.max(Duration::from_millis(1));
        let mut inner = self.inner.borrow_mut();
        let next_due = inner.elapsed.saturating_add(period);
        inner.timers.push(ManualTimer {
            period,
            next_due,
            callback: Rc::new(RefCell::new(callback)),
            cancelled: Rc::clone(&cancelled),
        });
        TickHandle::new(cancelled, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_scheduler_fires_once_per_period() {
        let scheduler = ManualScheduler::new();
        let count = Rc::new(Cell::new(0u32));
        let seen = Rc::clone(&count);
        let _handle = scheduler.every(
            Duration::from_secs(1),
            Box::new(move || seen.set(seen.get() + 1)),
        );

        scheduler.advance(Duration::from_millis(2_500));
        assert_eq!(count.get(), 2);
        scheduler.advance(Duration::from_millis(500));
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn cancelled_handle_stops_callbacks() {
        let scheduler = ManualScheduler::new();
        let count = Rc::new(Cell::new(0u32));
        let seen = Rc::clone(&count);
        let mut handle = scheduler.every(
            Duration::from_secs(1),
            Box::new(move || seen.set(seen.get() + 1)),
        );
        scheduler.advance_secs(3);
        handle.cancel();
        scheduler.advance_secs(3);

        assert_eq!(count.get(), 3);
        assert!(handle.is_cancelled());
        assert_eq!(scheduler.active(), 0);
    }

    #[test]
    fn dropping_handle_cancels() {
        let scheduler = ManualScheduler::new();
        let count = Rc::new(Cell::new(0u32));
        let seen = Rc::clone(&count);
        drop(scheduler.every(
            Duration::from_secs(1),
            Box::new(move || seen.set(seen.get() + 1)),
        ));
        scheduler.advance_secs(5);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn callback_may_cancel_its_own_handle() {
        let scheduler = ManualScheduler::new();
        let slot: Rc<RefCell<Option<TickHandle>>> = Rc::new(RefCell::new(None));
        let count = Rc::new(Cell::new(0u32));
        let (seen, own) = (Rc::clone(&count), Rc::clone(&slot));
        let handle = scheduler.every(
            Duration::from_secs(1),
            Box::new(move || {
                seen.set(seen.get() + 1);
                if seen.get() == 2 {
                    if let Some(mut h) = own.borrow_mut().take() {
                        h.cancel();
                    }
                }
            }),
        );
        *slot.borrow_mut() = Some(handle);
        scheduler.advance_secs(10);
        assert_eq!(count.get(), 2);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn tokio_scheduler_ticks_on_local_set() {
        let local = tokio::task::LocalSet::new();
        let count = Rc::new(Cell::new(0u32));
        let seen = Rc::clone(&count);
        local
            .run_until(async move {
                let mut handle = TokioScheduler.every(
                    Duration::from_secs(1),
                    Box::new(move || seen.set(seen.get() + 1)),
                );
                tokio::time::sleep(Duration::from_millis(3_500)).await;
                handle.cancel();
            })
            .await;
        assert_eq!(count.get(), 3);
    }
}
