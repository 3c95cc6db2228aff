//! # replay-cpal
//!
//! Cross-platform microphone backend for replay-core, built on cpal.
//!
//! Provides:
//! - `CpalBackend`: a `CaptureBackend` over the host's input devices,
//!   converting any native format to the session's mono target PCM
//! - `devices`: input device listing helpers
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use replay_core::{AudioConfig, ReplaySession};
//! use replay_cpal::CpalBackend;
//!
//! let backend = Arc::new(CpalBackend::default_device());
//! let session = Arc::new(ReplaySession::new(AudioConfig::default(), backend)?);
//! session.start()?;
//! // ... later: session.coordinator().pause_and_snapshot()
//! ```

pub mod backend;
pub mod devices;

pub use backend::CpalBackend;
