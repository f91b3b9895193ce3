use crossbeam::atomic::AtomicCell;
use std::sync::Arc;

/// Cooperative cancellation flag shared between a blocking resolve or capture and whoever wants
/// to stop it. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicCell<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load()
    }

    /// Clears the flag so the token can be reused for the next operation.
    pub fn reset(&self) {
        self.cancelled.store(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!token.is_cancelled());

        thread::spawn(move || other.cancel()).join().unwrap();
        assert!(token.is_cancelled());

        token.reset();
        assert!(!token.is_cancelled());
    }
}
