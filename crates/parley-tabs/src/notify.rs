//! User-visible notices
//!
//! The manager never renders anything itself. Capacity warnings and recovery
//! notices go through a `Notifier` the UI layer supplies.

pub trait Notifier: Send + Sync {
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
}

/// Routes notices into the log. Used when no UI surface is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn warn(&self, message: &str) {
        tracing::warn!(target: "parley::notice", "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "parley::notice", "{}", message);
    }
}
