//! # Schedulers
//!
//! Every timing hook talks to time through the [`Scheduler`] trait instead of
//! calling into a host timer directly. A scheduler knows the current time,
//! can run a task after a delay, and can cancel a task that has not run yet.
//!
//! Two implementations live here:
//!
//! - [`ManualScheduler`]: a virtual clock. Nothing happens until the owner
//!   calls [`ManualScheduler::advance`]. Tests and deterministic hosts use it.
//! - [`LoopScheduler`]: wall clock. A native single-threaded host loop calls
//!   [`LoopScheduler::run_due`] whenever it wakes up.
//!
//! The browser scheduler (`setTimeout`) lives in `hookline-web`.
//!
//! ```rust
//! use std::rc::Rc;
//! use hookline_core::*;
//!
//! let sched = Rc::new(ManualScheduler::new());
//! let hits = Rc::new(std::cell::Cell::new(0));
//! let h = hits.clone();
//! sched.schedule(Duration::from_millis(10), Box::new(move || h.set(h.get() + 1)));
//!
//! sched.advance(Duration::from_millis(9));
//! assert_eq!(hits.get(), 0);
//! sched.advance(Duration::from_millis(1));
//! assert_eq!(hits.get(), 1);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};
use web_time::{Duration, Instant};

new_key_type! {
    /// Handle to a scheduled task. Generational, so a stale handle never
    /// cancels a task scheduled later in the same slot.
    pub struct TimerId;
}

pub type Task = Box<dyn FnOnce()>;

/// Deferred-callback capability consumed by the timing hooks.
pub trait Scheduler {
    fn now(&self) -> Instant;

    /// Runs `task` once, `delay` after `now()`.
    fn schedule(&self, delay: Duration, task: Task) -> TimerId;

    /// Prevents a not-yet-run task from running. Returns `false` if the task
    /// already ran or was already cancelled.
    fn cancel(&self, id: TimerId) -> bool;
}

struct Pending {
    deadline: Instant,
    seq: u64,
    task: Task,
}

/// Deadline-ordered task queue. Ties run in scheduling order.
#[derive(Default)]
struct TimerQueue {
    tasks: SlotMap<TimerId, Pending>,
    order: BTreeMap<(Instant, u64), TimerId>,
    seq: u64,
}

impl TimerQueue {
    fn push(&mut self, deadline: Instant, task: Task) -> TimerId {
        let seq = self.seq;
        self.seq += 1;
        let id = self.tasks.insert(Pending {
            deadline,
            seq,
            task,
        });
        self.order.insert((deadline, seq), id);
        id
    }

    /// Unlinks the task and hands it back. Callers drop it only after
    /// releasing the queue, since dropping a task can cancel other timers.
    fn remove(&mut self, id: TimerId) -> Option<Task> {
        let p = self.tasks.remove(id)?;
        self.order.remove(&(p.deadline, p.seq));
        Some(p.task)
    }

    fn pop_due(&mut self, now: Instant) -> Option<(Instant, Task)> {
        let (&(deadline, _), _) = self.order.first_key_value()?;
        if deadline > now {
            return None;
        }
        let (_, id) = self.order.pop_first()?;
        self.tasks.remove(id).map(|p| (p.deadline, p.task))
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.order.first_key_value().map(|(&(deadline, _), _)| deadline)
    }

    fn len(&self) -> usize {
        self.tasks.len()
    }
}

/// Virtual clock. Time only moves when [`advance`](Self::advance) is called.
pub struct ManualScheduler {
    origin: Instant,
    now: Cell<Instant>,
    queue: RefCell<TimerQueue>,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        let origin = Instant::now();
        Self {
            origin,
            now: Cell::new(origin),
            queue: RefCell::new(TimerQueue::default()),
        }
    }

    /// Virtual time elapsed since construction.
    pub fn elapsed(&self) -> Duration {
        self.now.get().saturating_duration_since(self.origin)
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Moves the clock forward by `by`, running every task that falls due on
    /// the way in deadline order. While a task runs, `now()` reports that
    /// task's deadline. Tasks scheduled by running tasks are picked up too if
    /// they fall inside the window. Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now.get() + by;
        let mut fired = 0;
        loop {
            let next = self.queue.borrow_mut().pop_due(target);
            let Some((deadline, task)) = next else {
                break;
            };
            if deadline > self.now.get() {
                self.now.set(deadline);
            }
            task();
            fired += 1;
        }
        self.now.set(target);
        fired
    }

    /// Advances until the queue is empty. Never returns while a self-rescheduling
    /// task (a running [`Interval`](crate::Interval)) is live.
    pub fn run_until_idle(&self) -> usize {
        let mut fired = 0;
        loop {
            let next = self.queue.borrow().next_deadline();
            let Some(deadline) = next else {
                return fired;
            };
            fired += self.advance(deadline.saturating_duration_since(self.now.get()));
        }
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> Instant {
        self.now.get()
    }

    fn schedule(&self, delay: Duration, task: Task) -> TimerId {
        self.queue.borrow_mut().push(self.now.get() + delay, task)
    }

    fn cancel(&self, id: TimerId) -> bool {
        let task = self.queue.borrow_mut().remove(id);
        task.is_some()
    }
}

/// Wall-clock scheduler for a native single-threaded host loop.
#[derive(Default)]
pub struct LoopScheduler {
    queue: RefCell<TimerQueue>,
}

impl LoopScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.borrow().next_deadline()
    }

    /// Runs every task whose deadline has passed. Returns how many ran.
    pub fn run_due(&self) -> usize {
        let mut fired = 0;
        loop {
            let next = self.queue.borrow_mut().pop_due(Instant::now());
            let Some((_, task)) = next else {
                return fired;
            };
            task();
            fired += 1;
        }
    }

    /// Blocks the current thread, running tasks as they fall due, until the
    /// queue is empty.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn run_until_idle(&self) -> usize {
        let mut fired = 0;
        loop {
            fired += self.run_due();
            match self.next_deadline() {
                Some(deadline) => {
                    std::thread::sleep(deadline.saturating_duration_since(Instant::now()))
                }
                None => return fired,
            }
        }
    }
}

impl Scheduler for LoopScheduler {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn schedule(&self, delay: Duration, task: Task) -> TimerId {
        self.queue.borrow_mut().push(Instant::now() + delay, task)
    }

    fn cancel(&self, id: TimerId) -> bool {
        let task = self.queue.borrow_mut().remove(id);
        task.is_some()
    }
}

thread_local! {
    static CURRENT: RefCell<Option<Rc<dyn Scheduler>>> = const { RefCell::new(None) };
    static DEFAULT_LOOP: Rc<LoopScheduler> = Rc::new(LoopScheduler::new());
}

/// Installs the scheduler used by [`debounce`](crate::debounce),
/// [`throttle`](crate::throttle) and [`interval`](crate::interval) on this
/// thread. Returns the previously installed one. Hooks already constructed
/// keep the scheduler they were built with.
pub fn set_scheduler(scheduler: Rc<dyn Scheduler>) -> Option<Rc<dyn Scheduler>> {
    CURRENT.with(|c| c.borrow_mut().replace(scheduler))
}

/// Removes the installed scheduler, falling back to [`default_loop`].
pub fn clear_scheduler() -> Option<Rc<dyn Scheduler>> {
    CURRENT.with(|c| c.borrow_mut().take())
}

/// This thread's built-in [`LoopScheduler`]. It backs [`current_scheduler`]
/// while nothing is installed; the host drives it with [`run_due_timers`].
pub fn default_loop() -> Rc<LoopScheduler> {
    DEFAULT_LOOP.with(Rc::clone)
}

/// The scheduler installed on this thread, or [`default_loop`].
pub fn current_scheduler() -> Rc<dyn Scheduler> {
    if let Some(installed) = CURRENT.with(|c| c.borrow().clone()) {
        return installed;
    }
    log::trace!("no scheduler installed; using the thread's default loop");
    let fallback: Rc<dyn Scheduler> = default_loop();
    fallback
}

/// Runs the due tasks of [`default_loop`]. Returns how many ran.
pub fn run_due_timers() -> usize {
    default_loop().run_due()
}

/// Blocks until [`default_loop`] has no tasks left.
#[cfg(not(target_arch = "wasm32"))]
pub fn run_timers_until_idle() -> usize {
    default_loop().run_until_idle()
}
