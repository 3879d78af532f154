//! Cooperative cancellation for long layouts.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::error::TrellisError;

/// A cloneable flag the caller flips to abandon a running layout.
///
/// Every clone observes the same flag. The engine polls it between nested
/// problems and before crossing minimization; a cancelled layout returns
/// [`TrellisError::Cancelled`] and never a partial result.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns [`TrellisError::Cancelled`] once cancellation was requested.
    pub(crate) fn check(&self) -> Result<(), TrellisError> {
        if self.is_cancelled() {
            Err(TrellisError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn test_new_token_is_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancellationToken::new();
        let observer = token.clone();

        token.cancel();
        token.cancel();

        assert!(observer.is_cancelled());
        assert!(matches!(observer.check(), Err(TrellisError::Cancelled)));
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let token = CancellationToken::new();
        let remote = token.clone();

        thread::spawn(move || remote.cancel())
            .join()
            .expect("cancelling thread panicked");

        assert!(token.is_cancelled());
    }
}
