use std::sync::{Arc, Mutex, PoisonError};

/// Write-only sink the worker uses to surface failures to whoever observes it.
pub trait ErrorReporter: Send + Sync {
    fn set_error(&self, message: &str);
}

/// Holds the most recent error message; a new error replaces the old one.
///
/// Clones share the same slot, so the host keeps one clone to read from and
/// hands another to the worker.
#[derive(Debug, Clone, Default)]
pub struct ErrorSlot {
    current: Arc<Mutex<Option<String>>>,
}

impl ErrorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reads and clears the slot.
    pub fn take(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl ErrorReporter for ErrorSlot {
    fn set_error(&self, message: &str) {
        log::warn!("{message}");
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_empty() {
        let slot = ErrorSlot::new();
        assert_eq!(slot.current(), None);
    }

    #[test]
    fn test_latest_error_wins() {
        let slot = ErrorSlot::new();
        slot.set_error("first");
        slot.set_error("second");
        assert_eq!(slot.current().as_deref(), Some("second"));
    }

    #[test]
    fn test_take_clears() {
        let slot = ErrorSlot::new();
        slot.set_error("boom");
        assert_eq!(slot.take().as_deref(), Some("boom"));
        assert_eq!(slot.current(), None);
    }

    #[test]
    fn test_clones_share_the_slot() {
        let host = ErrorSlot::new();
        let reporter: Arc<dyn ErrorReporter> = Arc::new(host.clone());
        reporter.set_error("from worker");
        assert_eq!(host.current().as_deref(), Some("from worker"));
    }
}
