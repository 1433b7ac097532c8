//! # Throttle
//!
//! A throttled computation runs at most once per `wait` window. Which calls of
//! a burst get to run is chosen with [`Edges`]:
//!
//! - `LEADING`: the call that opens a window runs immediately.
//! - `TRAILING`: the last call made inside a window runs when the window ends.
//!
//! Both edges are on by default. Disabling both is rejected at construction,
//! since nothing would ever run.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use web_time::{Duration, Instant};

use crate::error::{HookError, Result, wait_from_millis};
use crate::scheduler::{Scheduler, TimerId, current_scheduler};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Edges: u8 {
        const LEADING = 1;
        const TRAILING = 1 << 1;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThrottleOptions {
    pub edges: Edges,
}

impl Default for ThrottleOptions {
    fn default() -> Self {
        Self { edges: Edges::all() }
    }
}

impl ThrottleOptions {
    pub fn leading(mut self, on: bool) -> Self {
        self.edges.set(Edges::LEADING, on);
        self
    }

    pub fn trailing(mut self, on: bool) -> Self {
        self.edges.set(Edges::TRAILING, on);
        self
    }
}

struct State<A, R> {
    timer: Option<TimerId>,
    pending_args: Option<A>,
    /// Start of the current window: the last execution, or the call that
    /// opened a window without executing (leading edge disabled).
    window_start: Option<Instant>,
    last_invoke: Option<Instant>,
    last_result: Option<R>,
}

struct Inner<A, R> {
    f: Box<dyn Fn(A) -> R>,
    wait: Duration,
    edges: Edges,
    scheduler: Rc<dyn Scheduler>,
    state: RefCell<State<A, R>>,
}

impl<A: 'static, R: 'static> Inner<A, R> {
    fn fire_trailing(&self) {
        let args = {
            let mut st = self.state.borrow_mut();
            st.timer = None;
            let args = st.pending_args.take();
            if args.is_some() {
                let now = self.scheduler.now();
                st.window_start = Some(now);
                st.last_invoke = Some(now);
            }
            args
        };
        if let Some(args) = args {
            log::debug!("throttle: trailing call");
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

/// Handle to a throttled computation. Clones share the same window.
pub struct Throttle<A, R> {
    inner: Rc<Inner<A, R>>,
}

impl<A, R> Clone for Throttle<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: 'static, R: Clone + 'static> Throttle<A, R> {
    pub fn with_scheduler(
        scheduler: Rc<dyn Scheduler>,
        f: impl Fn(A) -> R + 'static,
        wait_ms: i64,
        options: ThrottleOptions,
    ) -> Result<Self> {
        let wait = wait_from_millis("throttle", wait_ms)?;
        if options.edges.is_empty() {
            return Err(HookError::invalid(
                "throttle",
                "leading and trailing edges cannot both be disabled",
            ));
        }
        Ok(Self {
            inner: Rc::new(Inner {
                f: Box::new(f),
                wait,
                edges: options.edges,
                scheduler,
                state: RefCell::new(State {
                    timer: None,
                    pending_args: None,
                    window_start: None,
                    last_invoke: None,
                    last_result: None,
                }),
            }),
        })
    }

    /// Registers a call. Returns the result of the most recent execution,
    /// which is not necessarily this call's.
    pub fn call(&self, args: A) -> Option<R> {
        let inner = &self.inner;
        let now = inner.scheduler.now();

        let run_now = {
            let mut st = inner.state.borrow_mut();
            let elapsed = st.window_start.map(|start| now.saturating_duration_since(start));

            match elapsed {
                Some(elapsed) if elapsed < inner.wait => {
                    if inner.edges.contains(Edges::TRAILING) {
                        st.pending_args = Some(args);
                        if st.timer.is_none() {
                            st.timer = Some(self.schedule_trailing(inner.wait - elapsed));
                        }
                    }
                    None
                }
                _ => {
                    // window over: a trailing timer still queued here is stale
                    if let Some(id) = st.timer.take() {
                        inner.scheduler.cancel(id);
                    }
                    st.pending_args = None;
                    st.window_start = Some(now);

                    if inner.edges.contains(Edges::LEADING) {
                        st.last_invoke = Some(now);
                        Some(args)
                    } else {
                        st.pending_args = Some(args);
                        st.timer = Some(self.schedule_trailing(inner.wait));
                        None
                    }
                }
            }
        };

        if let Some(args) = run_now {
            let value = (inner.f)(args);
            inner.state.borrow_mut().last_result = Some(value);
        }
        self.last_result()
    }

    fn schedule_trailing(&self, delay: Duration) -> TimerId {
        let weak: Weak<Inner<A, R>> = Rc::downgrade(&self.inner);
        self.inner.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.fire_trailing();
                }
            }),
        )
    }

    /// Drops the pending trailing call without running it. The current
    /// window is kept, so the next call still waits it out.
    pub fn cancel(&self) -> bool {
        let mut st = self.inner.state.borrow_mut();
        st.pending_args = None;
        match st.timer.take() {
            Some(id) => {
                self.inner.scheduler.cancel(id);
                log::debug!("throttle: cancelled trailing call");
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

    /// When the computation last actually ran.
    pub fn last_invoke(&self) -> Option<Instant> {
        self.inner.state.borrow().last_invoke
    }

    pub fn wait(&self) -> Duration {
        self.inner.wait
    }

    pub fn edges(&self) -> Edges {
        self.inner.edges
    }
}

/// Throttles `f` on this thread's [`current_scheduler`].
pub fn throttle<A: 'static, R: Clone + 'static>(
    f: impl Fn(A) -> R + 'static,
    wait_ms: i64,
    options: ThrottleOptions,
) -> Result<Throttle<A, R>> {
    Throttle::with_scheduler(current_scheduler(), f, wait_ms, options)
}
