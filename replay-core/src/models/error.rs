use thiserror::Error;

/// Errors that can occur across capture, snapshotting, and persistence.
///
/// WAV sink I/O uses plain `std::io::Error` and is not wrapped here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The capture device could not be opened. Returned synchronously
    /// from `start`; capture never began and the session stays idle.
    #[error("capture unavailable: {0}")]
    CaptureUnavailable(String),

    /// The capture source failed mid-run (device unplugged, stream
    /// stalled, stream ended). Delivered through the listener; the
    /// session returns to idle with its buffered audio intact.
    #[error("capture interrupted: {0}")]
    CaptureInterrupted(String),

    /// A producer handed the ring a frame it cannot accept. This is a
    /// programming error, not a runtime condition.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Configuration validation failed, or an operation was attempted
    /// in a state that does not permit it.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The persistence collaborator failed to store a clip.
    #[error("storage error: {0}")]
    Storage(String),
}
