//! EventHandler port - Callback invoked by the event router.

use crate::domain::foundation::EventEnvelope;

/// Handler for one dispatched envelope.
///
/// Dispatch is synchronous and in registration order, so implementations
/// should be:
/// - **Quick** - anything slow belongs on a spawned task
/// - **Idempotent** - a server may resend an event after a reconnect
///
/// # Example
///
/// ```ignore
/// struct MetricsLogger;
///
/// impl EventHandler for MetricsLogger {
///     fn handle(&self, envelope: &EventEnvelope) {
///         tracing::info!(payload = %envelope.payload, "metrics changed");
///     }
///
///     fn name(&self) -> &'static str {
///         "MetricsLogger"
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    fn handle(&self, envelope: &EventEnvelope);

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that trait is object-safe
    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn EventHandler) {}

    #[allow(dead_code)]
    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn event_handler_is_send_sync() {
        #[allow(dead_code)]
        fn check<T: EventHandler>() {
            assert_send_sync::<T>();
        }
    }
}
