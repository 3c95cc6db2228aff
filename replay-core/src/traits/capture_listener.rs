use crate::models::error::CaptureError;

/// Event listener for capture session notifications.
///
/// Methods are called from whichever thread performs the transition —
/// a control call or the capture thread itself — never while internal
/// locks are held. Implementations should marshal to their own thread
/// if needed and must not call back into the session.
pub trait CaptureListener: Send + Sync {
    /// Called on every transition of the capturing flag: `true` when
    /// frames start flowing into the buffer, `false` on pause, stop or
    /// interruption.
    fn on_state_changed(&self, is_capturing: bool);

    /// Called when the source fails mid-run, before the accompanying
    /// `on_state_changed(false)`.
    fn on_interrupted(&self, error: &CaptureError);
}
