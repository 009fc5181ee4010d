//! Wires a shared engine to a [`Scheduler`] at one tick per second.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use super::engine::TimerEngine;
use crate::events::Event;
use crate::scheduler::{Scheduler, TickHandle};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Attach `engine` to `scheduler`. Every period the engine ticks; events
/// are passed to `on_event` after the engine borrow is released, so the
/// handler may inspect or drive the engine itself.
pub fn attach<S, F>(engine: Rc<RefCell<TimerEngine>>, scheduler: &S, mut on_event: F) -> TickHandle
where
    S: Scheduler + ?Sized,
    F: FnMut(Event) + 'static,
{
    scheduler.every(
        TICK_PERIOD,
        Box::new(move || {
            let event = engine.borrow_mut().tick();
            if let Some(event) = event {
                on_event(event);
            }
        }),
    )
}
