//! Cooperative cancellation for long runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::error::SignalError;

/// Shared flag a caller flips to abandon a run between bars.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<(), SignalError> {
        if self.is_cancelled() {
            Err(SignalError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_cancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
    }

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let handle = token.clone();
        handle.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(SignalError::Cancelled)));
    }
}
