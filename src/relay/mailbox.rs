use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Outcome of a bounded wait on a mailbox.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recv<T> {
    Value(T),
    Timeout,
    Closed,
}

/// Counters for one mailbox.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MailboxStats {
    pub published: u64,
    /// Values overwritten before anyone took them.
    pub superseded: u64,
    pub closed: bool,
}

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    fresh: bool,
    closed: bool,
    published: u64,
    superseded: u64,
}

/// Single-slot, last-value-wins channel.
///
/// Publishing never blocks and never queues: a new value replaces the
/// previous one. A consumer that reads late sees only the most recent value.
/// Clones share the same slot.
#[derive(Debug)]
pub struct Mailbox<T> {
    inner: Arc<(Mutex<Slot<T>>, Condvar)>,
}

impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new((
                Mutex::new(Slot {
                    value: None,
                    fresh: false,
                    closed: false,
                    published: 0,
                    superseded: 0,
                }),
                Condvar::new(),
            )),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot<T>> {
        self.inner
            .0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the slot's value. Returns `false` once the mailbox is closed.
    pub fn publish(&self, value: T) -> bool {
        let mut slot = self.slot();
        if slot.closed {
            return false;
        }
        if slot.fresh {
            slot.superseded += 1;
        }
        slot.value = Some(value);
        slot.fresh = true;
        slot.published += 1;
        drop(slot);
        self.inner.1.notify_all();
        true
    }

    /// Take the unseen value, if any, without waiting.
    pub fn take(&self) -> Option<T>
    where
        T: Clone,
    {
        let mut slot = self.slot();
        if !slot.fresh {
            return None;
        }
        slot.fresh = false;
        slot.value.clone()
    }

    /// The most recent value, seen or not.
    pub fn latest(&self) -> Option<T>
    where
        T: Clone,
    {
        self.slot().value.clone()
    }

    /// Wait up to `timeout` for an unseen value.
    ///
    /// A closed mailbox reports `Closed` even if an unseen value remains.
    pub fn recv_timeout(&self, timeout: Duration) -> Recv<T>
    where
        T: Clone,
    {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot();
        loop {
            if slot.closed {
                return Recv::Closed;
            }
            if slot.fresh {
                slot.fresh = false;
                return match slot.value.clone() {
                    Some(value) => Recv::Value(value),
                    None => Recv::Timeout,
                };
            }
            let now = Instant::now();
            if now >= deadline {
                return Recv::Timeout;
            }
            slot = match self.inner.1.wait_timeout(slot, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    /// Close the mailbox and wake every waiter. Idempotent.
    pub fn close(&self) {
        let mut slot = self.slot();
        slot.closed = true;
        drop(slot);
        self.inner.1.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.slot().closed
    }

    pub fn stats(&self) -> MailboxStats {
        let slot = self.slot();
        MailboxStats {
            published: slot.published,
            superseded: slot.superseded,
            closed: slot.closed,
        }
    }
}
