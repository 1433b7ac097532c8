use std::cell::RefCell;
use std::rc::Rc;

use hookline_core::{Task, TimerId};
use slotmap::SlotMap;

struct Entry {
    handle: Option<i32>,
    task: Task,
}

/// Tasks waiting on a host timer, keyed by the id handed to hooks.
///
/// The host callback only carries the key, so cancelling releases the task
/// right away even though the host may still call back later.
#[derive(Clone, Default)]
pub(crate) struct TaskSlots {
    entries: Rc<RefCell<SlotMap<TimerId, Entry>>>,
}

impl TaskSlots {
    pub(crate) fn insert(&self, task: Task) -> TimerId {
        self.entries.borrow_mut().insert(Entry { handle: None, task })
    }

    /// Records the host handle once the host accepted the timer.
    pub(crate) fn set_handle(&self, id: TimerId, handle: i32) {
        if let Some(entry) = self.entries.borrow_mut().get_mut(id) {
            entry.handle = Some(handle);
        }
    }

    /// Runs the task for `id` if it is still live. Returns whether it ran.
    pub(crate) fn dispatch(&self, id: TimerId) -> bool {
        let entry = self.entries.borrow_mut().remove(id);
        match entry {
            Some(entry) => {
                (entry.task)();
                true
            }
            None => false,
        }
    }

    /// Forgets the task for `id`. `Some(handle)` is the host timer to clear;
    /// `Some(None)` means the task was live but had no host timer.
    pub(crate) fn cancel(&self, id: TimerId) -> Option<Option<i32>> {
        let entry = self.entries.borrow_mut().remove(id);
        entry.map(|e| e.handle)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}
