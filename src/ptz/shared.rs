use std::sync::{Arc, Mutex, MutexGuard};

use super::control::PtzEvent;
use super::crop::VirtualPtz;
use super::state::PtzState;

/// The single critical section both timing domains go through.
///
/// The frame loop and the operator-event path each hold the lock for one
/// bounded read-modify-write; no I/O happens under it.
#[derive(Clone, Debug, Default)]
pub struct SharedPtz {
    inner: Arc<Mutex<VirtualPtz>>,
}

impl SharedPtz {
    pub fn new(ptz: VirtualPtz) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ptz)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VirtualPtz> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            log::warn!("ptz state lock poisoned; continuing with last state");
            poisoned.into_inner()
        })
    }

    /// Run `f` with exclusive access to the virtual PTZ.
    pub fn with<R>(&self, f: impl FnOnce(&mut VirtualPtz) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    pub fn apply_event(&self, event: PtzEvent) -> PtzState {
        self.with(|ptz| {
            ptz.apply_event(event);
            ptz.state().clone()
        })
    }

    pub fn snapshot(&self) -> PtzState {
        self.with(|ptz| ptz.state().clone())
    }
}
