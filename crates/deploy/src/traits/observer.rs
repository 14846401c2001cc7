use crate::LifecycleEvent;

/// Receives lifecycle events from a deployment run, in order.
///
/// Observers are notified synchronously and must not block. A run behaves the same with or
/// without observers.
pub trait DeploymentObserver: Send + Sync {
    fn on_event(&self, event: &LifecycleEvent);
}

impl<T: DeploymentObserver + ?Sized> DeploymentObserver for std::sync::Arc<T> {
    fn on_event(&self, event: &LifecycleEvent) {
        (**self).on_event(event)
    }
}
