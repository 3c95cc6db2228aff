//! # replay-core
//!
//! Platform-agnostic rolling replay buffer for audio capture.
//!
//! A dedicated capture thread feeds a fixed-capacity ring buffer with
//! the most recent N seconds of microphone audio; at any moment the
//! buffer can be snapshotted race-free, optionally trimmed down to its
//! speech regions, encoded as a canonical WAV file and handed to a
//! persist target. Platform backends (see `replay-cpal`) implement the
//! `CaptureBackend` trait and plug into the generic `ReplaySession`.
//!
//! ## Architecture
//!
//! ```text
//! replay-core (this crate)
//! ├── traits/       ← CaptureBackend, CaptureSource, CaptureListener, PersistTarget
//! ├── models/       ← AudioConfig, CaptureError, CaptureState, Snapshot, SavedClip
//! ├── processing/   ← RingBuffer, PCM codecs, VoiceActivityTrimmer, WAV encoding
//! ├── session/      ← ReplaySession (capture loop), SnapshotCoordinator
//! └── storage/      ← ClipSaver, DirectoryTarget, metadata sidecars
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::clip::{ClipMetadata, SavedClip};
pub use models::config::{AudioConfig, BitDepth, SampleEncoding};
pub use models::error::CaptureError;
pub use models::snapshot::Snapshot;
pub use models::state::{CaptureState, SessionInfo, StartOutcome};
pub use processing::ring_buffer::RingBuffer;
pub use processing::trimmer::{TrimConfig, VoiceActivityTrimmer};
pub use session::coordinator::SnapshotCoordinator;
pub use session::replay::ReplaySession;
pub use storage::dir_target::DirectoryTarget;
pub use storage::handoff::ClipSaver;
pub use traits::capture_listener::CaptureListener;
pub use traits::capture_source::{CaptureBackend, CaptureSource};
pub use traits::persist_target::PersistTarget;
