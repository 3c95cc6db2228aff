use chrono::{DateTime, Utc};

/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle → capturing ↔ paused
///   ↑        ↓         ↓
///   └────────┴─────────┘   (stop / interruption)
/// ```
///
/// The snapshot gate is not a state: a running snapshot stalls the
/// producer for at most one frame and never leaves `Capturing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing,
    Paused,
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }
}

/// What `ReplaySession::start` observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A capture thread was spawned and the device opened.
    Started,
    /// Capture was already live; the manual hold is registered and the
    /// running buffer keeps filling.
    AlreadyRunning,
}

/// Point-in-time view of a session for introspection and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionInfo {
    pub state: CaptureState,
    /// Wall-clock time the current capture run began.
    pub started_at: Option<DateTime<Utc>>,
    /// Outstanding call-overlay holds keeping capture alive.
    pub overlay_holds: u32,
    /// Outstanding pause holds parking the producer.
    pub pause_holds: u32,
    /// Bytes currently retained in the ring.
    pub buffered_bytes: usize,
}

impl SessionInfo {
    pub fn is_call_overlay_active(&self) -> bool {
        self.overlay_holds > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_helpers() {
        assert!(CaptureState::Idle.is_idle());
        assert!(CaptureState::Capturing.is_capturing());
        assert!(CaptureState::Paused.is_paused());
        assert!(!CaptureState::Paused.is_capturing());
    }

    #[test]
    fn overlay_flag_derives_from_holds() {
        let info = SessionInfo {
            state: CaptureState::Capturing,
            started_at: None,
            overlay_holds: 2,
            pause_holds: 0,
            buffered_bytes: 0,
        };
        assert!(info.is_call_overlay_active());
    }
}
