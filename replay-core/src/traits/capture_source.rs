use crate::models::config::AudioConfig;
use crate::models::error::CaptureError;

/// A live, opened audio input delivering raw PCM bytes.
///
/// Sources are consumed by exactly one capture thread and are not
/// required to be `Send`: platform audio handles are frequently
/// thread-affine, so the thread that opens a source is the thread that
/// reads and drops it.
pub trait CaptureSource {
    /// Block until one frame of PCM is available and copy it into `buf`.
    ///
    /// Returns the number of bytes written, at most `buf.len()`.
    /// `Ok(0)` signals end of stream. Implementations must detect a
    /// stalled device and return `CaptureInterrupted` rather than block
    /// the capture thread forever.
    fn read_frame(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError>;
}

/// Factory for platform-specific capture sources.
///
/// `open` is called on the capture thread itself so the produced
/// source never crosses threads. Implemented by `replay-cpal`'s
/// microphone backend and by scripted sources in tests.
pub trait CaptureBackend: Send + Sync {
    /// Whether an input device is currently available.
    fn is_available(&self) -> bool;

    /// Open a source delivering PCM in the layout `config` describes.
    ///
    /// Dropping the returned source releases the device.
    fn open(&self, config: &AudioConfig) -> Result<Box<dyn CaptureSource>, CaptureError>;
}
