use std::cell::RefCell;
use std::rc::{Rc, Weak};

use web_time::Duration;

use crate::error::{HookError, Result};
use crate::scheduler::{Scheduler, TimerId, current_scheduler};

struct Inner {
    callback: Box<dyn Fn()>,
    period: Duration,
    scheduler: Rc<dyn Scheduler>,
    timer: RefCell<Option<TimerId>>,
}

impl Inner {
    fn arm(self: &Rc<Self>) {
        let weak: Weak<Inner> = Rc::downgrade(self);
        let id = self.scheduler.schedule(
            self.period,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.tick();
                }
            }),
        );
        *self.timer.borrow_mut() = Some(id);
    }

    fn tick(self: &Rc<Self>) {
        // re-arm first so the callback sees a running interval and may stop it
        self.arm();
        (self.callback)();
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(id) = self.timer.get_mut().take() {
            self.scheduler.cancel(id);
        }
    }
}

/// Repeating timer with explicit start/stop. Stopped when created.
#[derive(Clone)]
pub struct Interval {
    inner: Rc<Inner>,
}

impl Interval {
    pub fn with_scheduler(
        scheduler: Rc<dyn Scheduler>,
        callback: impl Fn() + 'static,
        period_ms: i64,
    ) -> Result<Self> {
        if period_ms <= 0 {
            return Err(HookError::invalid(
                "interval",
                format!("period must be positive (got {period_ms}ms)"),
            ));
        }
        Ok(Self {
            inner: Rc::new(Inner {
                callback: Box::new(callback),
                period: Duration::from_millis(period_ms as u64),
                scheduler,
                timer: RefCell::new(None),
            }),
        })
    }

    /// Starts ticking. Returns `false` if it was already running.
    pub fn start(&self) -> bool {
        if self.is_running() {
            return false;
        }
        self.inner.arm();
        true
    }

    /// Stops ticking. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        let taken = self.inner.timer.borrow_mut().take();
        match taken {
            Some(id) => {
                self.inner.scheduler.cancel(id);
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.timer.borrow().is_some()
    }

    pub fn period(&self) -> Duration {
        self.inner.period
    }
}

/// Creates a stopped [`Interval`] on this thread's [`current_scheduler`].
pub fn interval(callback: impl Fn() + 'static, period_ms: i64) -> Result<Interval> {
    Interval::with_scheduler(current_scheduler(), callback, period_ms)
}
