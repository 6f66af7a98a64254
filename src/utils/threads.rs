//! A small threading toolkit used by the scheduler.
//!
//! `CancelToken` is a generalization of the safe, condvar-backed flag word
//! this crate's ancestor used for its own cooperative cancellation: instead
//! of a 32-bit flag set, the scheduler only needs a single sticky boolean
//! that every worker checks between block boundaries, and that the
//! serializer can flip the instant the first worker reports an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative cancellation flag shared between the scheduler's workers
/// and its serializer.
///
/// Workers check [`CancelToken::is_cancelled`] between block boundaries
/// (never mid-block, per the scheduler's cancellation policy) and stop
/// pulling new work once it is set. Cancellation is sticky: once set, a
/// token never clears.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn cancel_is_visible_across_threads() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        let worker_token = token.clone();
        let handle = thread::spawn(move || {
            while !worker_token.is_cancelled() {
                thread::yield_now();
            }
        });

        token.cancel();
        handle.join().unwrap();
        assert!(token.is_cancelled());
    }
}
