//! # Timing, memoization and ids
//!
//! Hookline is a small set of independent hooks. Each one is built once per
//! call site and hands back a handle you keep calling:
//!
//! - `memoize`: caches results by structural argument equality, optionally
//!   bounded with FIFO eviction.
//! - `debounce`: collapses a burst of calls into one trailing (or leading)
//!   execution.
//! - `throttle`: runs at most once per window, with leading/trailing edge
//!   control and cancellation.
//! - `interval`: a repeating timer with start/stop.
//! - `IdRegistry` / `generate_id`: stable, collision-free ids for keys.
//!
//! ## Time
//!
//! Hooks never touch a host timer directly. They are given a [`Scheduler`]
//! (or use the one installed on the current thread), which makes every
//! timing behaviour testable against a virtual clock:
//!
//! ```rust
//! use std::rc::Rc;
//! use hookline_core::*;
//!
//! let sched = Rc::new(ManualScheduler::new());
//! set_scheduler(sched.clone());
//!
//! let search = debounce(|q: String| q.len(), 250, DebounceOptions::default()).unwrap();
//! search.call("r".into());
//! search.call("rust".into());
//!
//! sched.advance(Duration::from_millis(250));
//! assert_eq!(search.last_result(), Some(4));
//! ```
//!
//! Hosts install a real scheduler with `set_scheduler`, or the browser
//! scheduler from `hookline-web`. Until one is installed, each thread uses its
//! own `LoopScheduler`, which the host loop drives with `run_due_timers`.
//!
//! ## Threading
//!
//! Everything except the process-wide id registry is single-threaded
//! (`Rc`/`RefCell`) and runs on whichever thread owns the handle. Timer
//! callbacks run from inside the scheduler's dispatch (`advance`, `run_due`,
//! or the browser's timeout handler), so a panicking computation unwinds out
//! of that dispatch call and not out of the `call` that queued it.
//!
//! ## Memoization
//!
//! ```rust
//! use hookline_core::*;
//!
//! let factorial = memoize_with(|n: u64| (1..=n).product::<u64>(), MemoOptions::default().max_size(64));
//! assert_eq!(factorial.call(5), 120);
//! assert!(factorial.is_cached(&5));
//! ```

pub mod cache;
pub mod debounce;
pub mod error;
pub mod id;
pub mod interval;
pub mod key;
pub mod memo;
pub mod prelude;
pub mod scheduler;
pub mod throttle;


pub use prelude::*;
