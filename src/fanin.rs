//! Fan-in join for concurrent subtask results
//!
//! Used by the RPC layer to merge the responses of N outbound calls into a
//! single callback. The aggregate callback runs exactly once, on whichever
//! thread delivers the final result, with results ordered by slot index.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

type Callback<T> = Box<dyn FnOnce(Vec<T>) + Send>;

/// Join point for `total` concurrent subtasks each producing a `T`.
pub struct FanIn<T> {
    slots: Mutex<Vec<Option<T>>>,
    finished: AtomicU32,
    total: u32,
    callback: Mutex<Option<Callback<T>>>,
}

impl<T: Send + 'static> FanIn<T> {
    pub fn new(total: u32, callback: impl FnOnce(Vec<T>) + Send + 'static) -> Arc<Self> {
        let mut slots = Vec::with_capacity(total as usize);
        slots.resize_with(total as usize, || None);
        Arc::new(FanIn {
            slots: Mutex::new(slots),
            finished: AtomicU32::new(0),
            total,
            callback: Mutex::new(Some(Box::new(callback))),
        })
    }

    /// Delivery closure for slot `index`. Each slot must be delivered exactly
    /// once; the closure that completes the set invokes the aggregate
    /// callback and releases the shared state.
    ///
    /// The counter increment is AcqRel so the completing thread observes
    /// every other thread's slot write.
    pub fn delivery(self: Arc<Self>, index: u32) -> impl FnOnce(T) {
        let state = self;
        move |value| {
            state.slots.lock()[index as usize] = Some(value);
            if state.finished.fetch_add(1, Ordering::AcqRel) + 1 == state.total {
                let callback = state.callback.lock().take();
                let slots = std::mem::take(&mut *state.slots.lock());
                if let Some(callback) = callback {
                    callback(slots.into_iter().flatten().collect());
                }
            }
        }
    }
}
