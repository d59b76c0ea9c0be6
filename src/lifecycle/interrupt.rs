//! Cooperative per-thread interruption.
//!
//! Every thread has exactly one [`Interrupt`] flag, obtained through
//! [`Interrupt::current`]. Raising the flag never preempts the thread; it
//! wakes it if parked and lets the code running on it notice at its next
//! poll. The flag is sticky: it stays raised until someone clears it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, Thread, ThreadId};
use std::time::{Duration, Instant};

use crate::core::Interrupted;

thread_local! {
    static CURRENT: Interrupt = Interrupt::for_thread(thread::current());
}

#[derive(Debug)]
struct Inner {
    raised: AtomicBool,
    thread: Thread,
}

/// Interruption flag of one thread. Cheap to clone and `Send + Sync`.
#[derive(Clone, Debug)]
pub struct Interrupt {
    inner: Arc<Inner>,
}

impl Interrupt {
    fn for_thread(thread: Thread) -> Self {
        Self {
            inner: Arc::new(Inner {
                raised: AtomicBool::new(false),
                thread,
            }),
        }
    }

    /// The flag of the calling thread.
    #[must_use]
    pub fn current() -> Self {
        CURRENT.with(Clone::clone)
    }

    /// Id of the thread this flag belongs to.
    #[must_use]
    pub fn thread_id(&self) -> ThreadId {
        self.inner.thread.id()
    }

    /// Raise the flag and wake the owning thread if it is parked.
    pub fn interrupt(&self) {
        self.inner.raised.store(true, Ordering::SeqCst);
        self.inner.thread.unpark();
    }

    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.inner.raised.load(Ordering::SeqCst)
    }

    /// Lower the flag, returning whether it was raised.
    pub fn clear(&self) -> bool {
        self.inner.raised.swap(false, Ordering::SeqCst)
    }

    /// Return `Err(Interrupted)` if the flag is raised.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_interrupted() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, returning early with `Err(Interrupted)` once the
    /// flag is raised. The flag is left raised.
    ///
    /// Must be called on the thread owning this flag, otherwise `interrupt()`
    /// cannot wake the sleeper and it only notices at the end of the sleep.
    pub fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        let deadline = Instant::now() + duration;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::park_timeout(deadline - now);
        }
    }
}
