//! Timer that interrupts a worker shortly before its deadline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::trace;

use super::interrupt::Interrupt;

/// A scheduled one-shot interruption.
///
/// The timer runs on its own thread. Cancelling drops the wake-up channel and
/// joins the thread, so once [`Watchdog::cancel`] returns the target can no
/// longer be interrupted by this watchdog.
#[derive(Debug)]
pub struct Watchdog {
    cancel_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    fired: Arc<AtomicBool>,
}

impl Watchdog {
    /// Interrupt `target` after `delay` unless cancelled first.
    pub fn schedule(delay: Duration, target: Interrupt) -> std::io::Result<Self> {
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let handle = thread::Builder::new()
            .name("search-watchdog".into())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = cancel_rx.recv_timeout(delay) {
                    flag.store(true, Ordering::SeqCst);
                    trace!(thread = ?target.thread_id(), "watchdog fired");
                    target.interrupt();
                }
            })?;

        Ok(Self {
            cancel_tx: Some(cancel_tx),
            handle: Some(handle),
            fired,
        })
    }

    /// Shared flag that becomes true when the watchdog fires.
    #[must_use]
    pub fn fired_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.fired)
    }

    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Stop the timer and wait for its thread to exit.
    pub fn cancel(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        drop(self.cancel_tx.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_fires_after_delay() {
        let target = Interrupt::current();
        target.clear();

        let watchdog = Watchdog::schedule(Duration::from_millis(10), target.clone()).unwrap();
        let start = Instant::now();
        let slept = target.sleep(Duration::from_secs(5));

        assert!(slept.is_err());
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(watchdog.has_fired());
        watchdog.cancel();
        assert!(target.clear());
    }

    #[test]
    fn test_cancel_prevents_interrupt() {
        let target = Interrupt::current();
        target.clear();

        let watchdog = Watchdog::schedule(Duration::from_millis(50), target.clone()).unwrap();
        let fired = watchdog.fired_flag();
        watchdog.cancel();

        thread::sleep(Duration::from_millis(80));
        assert!(!fired.load(Ordering::SeqCst));
        assert!(!target.is_interrupted());
    }
}
