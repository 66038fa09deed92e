//! Capabilities the poll loop drives but does not own.

use crate::fragment::Renderable;

/// The render target for delivered updates.
///
/// Each update replaces one identified child of one container. Writes are
/// last-wins: the target never accumulates units.
pub trait RenderSink {
    /// Substitute the child `old_child_id` of `container_id` with `unit`.
    fn replace(&mut self, container_id: &str, old_child_id: &str, unit: Renderable);
}

/// Blocking user notification for application errors.
///
/// The call returns once the message has been shown (or acknowledged);
/// the retry delay starts only afterwards.
pub trait Notifier {
    /// Show `message` to the user.
    fn notify(&mut self, message: &str);
}

impl<S: RenderSink + ?Sized> RenderSink for &mut S {
    fn replace(&mut self, container_id: &str, old_child_id: &str, unit: Renderable) {
        (**self).replace(container_id, old_child_id, unit);
    }
}

impl<N: Notifier + ?Sized> Notifier for &mut N {
    fn notify(&mut self, message: &str) {
        (**self).notify(message);
    }
}
