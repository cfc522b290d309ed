pub mod broadcast;

/// User-facing notifications. Fire-and-forget: nothing is returned and
/// delivery failures are not reported back.
pub trait Notifier: Send + Sync {
    fn notify_success(&self, message: &str);
    fn notify_error(&self, message: &str);
}
