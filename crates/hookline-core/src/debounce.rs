//! # Debounce
//!
//! A debounced computation runs once per burst of calls. By default it runs
//! on the trailing edge, `wait` after the last call of the burst, with that
//! call's arguments. With `immediate` it runs on the first call of a quiet
//! period instead and ignores the rest of the burst.
//!
//! ```rust
//! use std::rc::Rc;
//! use hookline_core::*;
//!
//! let sched = Rc::new(ManualScheduler::new());
//! let save = Debounce::with_scheduler(sched.clone(), |doc: &'static str| doc.len(), 300,
//!     DebounceOptions::default()).unwrap();
//!
//! assert_eq!(save.call("h"), None); // nothing computed yet
//! assert_eq!(save.call("hello"), None);
//! sched.advance(Duration::from_millis(300));
//! assert_eq!(save.last_result(), Some(5));
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use web_time::Duration;

use crate::error::{Result, wait_from_millis};
use crate::scheduler::{Scheduler, TimerId, current_scheduler};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DebounceOptions {
    /// Run on the leading edge of a burst instead of the trailing one.
    pub immediate: bool,
}

impl DebounceOptions {
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }
}

struct State<A, R> {
    timer: Option<TimerId>,
    pending_args: Option<A>,
    last_result: Option<R>,
}

struct Inner<A, R> {
    f: Box<dyn Fn(A) -> R>,
    wait: Duration,
    immediate: bool,
    scheduler: Rc<dyn Scheduler>,
    state: RefCell<State<A, R>>,
}

impl<A: 'static, R: 'static> Inner<A, R> {
    fn fire(&self) {
        let args = {
            let mut st = self.state.borrow_mut();
            st.timer = None;
            st.pending_args.take()
        };
        if let Some(args) = args {
            log::debug!("debounce: trailing call after {:?}", self.wait);
            let value = (self.f)(args);
            self.state.borrow_mut().last_result = Some(value);
        }
    }
}

impl<A, R> Drop for Inner<A, R> {
    fn drop(&mut self) {
        if let Some(id) = self.state.get_mut().timer.take() {
            self.scheduler.cancel(id);
        }
    }
}

/// Handle to a debounced computation. Clones share the same timer and result.
pub struct Debounce<A, R> {
    inner: Rc<Inner<A, R>>,
}

impl<A, R> Clone for Debounce<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: 'static, R: Clone + 'static> Debounce<A, R> {
    pub fn with_scheduler(
        scheduler: Rc<dyn Scheduler>,
        f: impl Fn(A) -> R + 'static,
        wait_ms: i64,
        options: DebounceOptions,
    ) -> Result<Self> {
        let wait = wait_from_millis("debounce", wait_ms)?;
        Ok(Self {
            inner: Rc::new(Inner {
                f: Box::new(f),
                wait,
                immediate: options.immediate,
                scheduler,
                state: RefCell::new(State {
                    timer: None,
                    pending_args: None,
                    last_result: None,
                }),
            }),
        })
    }

    /// Registers a call. Returns the most recent result computed so far,
    /// which is `None` until the first execution has happened.
    pub fn call(&self, args: A) -> Option<R> {
        let inner = &self.inner;
        let run_now = {
            let mut st = inner.state.borrow_mut();
            let quiet = st.timer.is_none();
            if let Some(id) = st.timer.take() {
                inner.scheduler.cancel(id);
            }
            st.timer = Some(self.schedule_fire());

            if inner.immediate {
                // later calls of the burst only push the quiet period out
                quiet.then_some(args)
            } else {
                st.pending_args = Some(args);
                None
            }
        };

        if let Some(args) = run_now {
            let value = (inner.f)(args);
            inner.state.borrow_mut().last_result = Some(value);
        }
        self.last_result()
    }

    fn schedule_fire(&self) -> TimerId {
        let weak: Weak<Inner<A, R>> = Rc::downgrade(&self.inner);
        self.inner.scheduler.schedule(
            self.inner.wait,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.fire();
                }
            }),
        )
    }

    /// Drops the pending trailing call, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        let mut st = self.inner.state.borrow_mut();
        st.pending_args = None;
        match st.timer.take() {
            Some(id) => {
                self.inner.scheduler.cancel(id);
                log::debug!("debounce: cancelled pending call");
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.inner.state.borrow().timer.is_some()
    }

    pub fn last_result(&self) -> Option<R> {
        self.inner.state.borrow().last_result.clone()
    }

    pub fn wait(&self) -> Duration {
        self.inner.wait
    }
}

/// Debounces `f` on this thread's [`current_scheduler`].
pub fn debounce<A: 'static, R: Clone + 'static>(
    f: impl Fn(A) -> R + 'static,
    wait_ms: i64,
    options: DebounceOptions,
) -> Result<Debounce<A, R>> {
    Debounce::with_scheduler(current_scheduler(), f, wait_ms, options)
}
