use std::rc::Rc;

use hookline_core::{Scheduler, Task, TimerId, set_id_namespace, set_scheduler};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_time::{Duration, Instant};

use crate::slots::TaskSlots;

// Globals rather than `Window` methods, so workers get timers too.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = setTimeout, catch)]
    fn set_timeout(handler: &js_sys::Function, timeout: i32) -> Result<i32, JsValue>;

    #[wasm_bindgen(js_name = clearTimeout)]
    fn clear_timeout(handle: i32);

    #[wasm_bindgen(js_name = queueMicrotask)]
    fn queue_microtask(callback: &js_sys::Function);
}

/// Runs tasks through the global `setTimeout`.
///
/// If the host refuses a timeout the task is queued as a microtask instead,
/// so it runs early rather than never.
#[derive(Clone, Default)]
pub struct TimeoutScheduler {
    slots: TaskSlots,
}

impl TimeoutScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for TimeoutScheduler {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn schedule(&self, delay: Duration, task: Task) -> TimerId {
        let id = self.slots.insert(task);

        let slots = self.slots.clone();
        // a cleared timeout never calls back, leaving this small shim behind
        let callback = Closure::once_into_js(move || {
            slots.dispatch(id);
        });
        let callback: &js_sys::Function = callback.unchecked_ref();
        let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);

        match set_timeout(callback, millis) {
            Ok(handle) => self.slots.set_handle(id, handle),
            Err(err) => {
                log::error!("TimeoutScheduler: setTimeout failed ({err:?}); running as a microtask");
                queue_microtask(callback);
            }
        }
        id
    }

    fn cancel(&self, id: TimerId) -> bool {
        match self.slots.cancel(id) {
            Some(handle) => {
                if let Some(handle) = handle {
                    clear_timeout(handle);
                }
                true
            }
            None => false,
        }
    }
}

/// Treats any id already present in the document as taken.
#[derive(Clone, Copy, Debug, Default)]
pub struct DomIdNamespace;

impl hookline_core::IdNamespace for DomIdNamespace {
    fn contains(&self, id: &str) -> bool {
        web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(id))
            .is_some()
    }
}

/// Installs the browser hosts for the current thread: panic hook, console
/// logger, the `setTimeout` scheduler and the DOM id namespace.
pub fn init(level: log::Level) {
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    let _ = console_log::init_with_level(level);
    set_scheduler(Rc::new(TimeoutScheduler::new()));
    set_id_namespace(Some(Box::new(DomIdNamespace)));
    log::info!("hookline: browser scheduler installed");
}

#[wasm_bindgen(js_name = initHookline)]
pub fn init_default() {
    init(log::Level::Info);
}
