pub use crate::cache::CacheStore;
pub use crate::debounce::{Debounce, DebounceOptions, debounce};
pub use crate::error::{HookError, Result};
pub use crate::id::{
    ElementKey, IdKey, IdNamespace, IdOptions, IdRegistry, MAX_ATTEMPTS, ObjectKey, generate_id,
    has_id, release_id, reset_ids, set_id_namespace,
};
pub use crate::interval::{Interval, interval};
pub use crate::key::{CacheKey, KeyEncoder, encode_key};
pub use crate::memo::{
    FallibleMemo, Memo, MemoOptions, MemoStats, memoize, memoize_fallible, memoize_with,
};
#[cfg(not(target_arch = "wasm32"))]
pub use crate::scheduler::run_timers_until_idle;
pub use crate::scheduler::{
    LoopScheduler, ManualScheduler, Scheduler, Task, TimerId, clear_scheduler, current_scheduler,
    default_loop, run_due_timers, set_scheduler,
};
pub use crate::throttle::{Edges, Throttle, ThrottleOptions, throttle};
pub use web_time::{Duration, Instant};
