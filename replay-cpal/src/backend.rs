//! cpal microphone backend.
//!
//! Opens an input device through the host's default cpal backend and
//! converts its native stream (any rate, channel count, or sample
//! format) into the session's mono target PCM. The stream callback
//! never blocks: chunks go through a bounded channel, and a full
//! channel drops the chunk with a warning.

use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use log::{info, warn};

use replay_core::processing::pcm;
use replay_core::{AudioConfig, CaptureBackend, CaptureError, CaptureSource};

/// Callback chunks buffered between the audio thread and the session.
/// At ~10-50 ms per cpal callback this covers several hundred
/// milliseconds of scheduling jitter.
const CHANNEL_CAPACITY: usize = 32;

/// How long a read waits for the device before reporting a stall.
const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_millis(500);

type Chunk = Result<Vec<u8>, CaptureError>;

/// Microphone capture through cpal.
///
/// Device resolution and stream construction happen in `open`, on the
/// session's capture thread; the backend itself holds only the device
/// selection and is freely shared across threads.
pub struct CpalBackend {
    device_name: Option<String>,
    stall_timeout: Duration,
}

impl CpalBackend {
    /// Capture from the system default input device.
    pub fn default_device() -> Self {
        Self {
            device_name: None,
            stall_timeout: DEFAULT_STALL_TIMEOUT,
        }
    }

    /// Capture from a specific input device, matched by cpal name.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
            stall_timeout: DEFAULT_STALL_TIMEOUT,
        }
    }

    /// Override how long a silent device is tolerated before the
    /// session treats the stream as stalled.
    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    fn resolve_device(&self, host: &cpal::Host) -> Result<cpal::Device, CaptureError> {
        match &self.device_name {
            Some(name) => host
                .input_devices()
                .map_err(|e| {
                    CaptureError::CaptureUnavailable(format!("cannot list input devices: {e}"))
                })?
                .find(|device| device.name().map(|n| &n == name).unwrap_or(false))
                .ok_or_else(|| {
                    CaptureError::CaptureUnavailable(format!("input device not found: {name}"))
                }),
            None => host
                .default_input_device()
                .ok_or_else(|| CaptureError::CaptureUnavailable("no default input device".into())),
        }
    }
}

impl CaptureBackend for CpalBackend {
    fn is_available(&self) -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    /// Sequence:
    /// 1. Resolve the input device (default or by name).
    /// 2. Query its native input format.
    /// 3. Build a typed stream converting samples to normalized f32.
    /// 4. Downmix, resample and encode each callback to target PCM.
    /// 5. Hand chunks to the caller through a bounded channel.
    fn open(&self, config: &AudioConfig) -> Result<Box<dyn CaptureSource>, CaptureError> {
        let host = cpal::default_host();
        let device = self.resolve_device(&host)?;
        let device_name = device.name().unwrap_or_else(|_| "<unnamed>".into());

        let supported = device.default_input_config().map_err(|e| {
            CaptureError::CaptureUnavailable(format!("no usable input format: {e}"))
        })?;
        let sample_format = supported.sample_format();
        let stream_config: cpal::StreamConfig = supported.into();

        info!(
            "opening '{}': {} Hz, {} ch, {:?} -> {} Hz mono, {}-bit",
            device_name,
            stream_config.sample_rate.0,
            stream_config.channels,
            sample_format,
            config.sample_rate_hz,
            config.bit_depth.bits,
        );

        let (tx, rx) = bounded::<Chunk>(CHANNEL_CAPACITY);
        let stream = match sample_format {
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, config, tx),
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, config, tx),
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, config, tx),
            other => {
                return Err(CaptureError::CaptureUnavailable(format!(
                    "unsupported sample format: {other:?}"
                )))
            }
        }?;

        stream.play().map_err(|e| {
            CaptureError::CaptureUnavailable(format!("cannot start input stream: {e}"))
        })?;

        Ok(Box::new(ChannelSource {
            _stream: Some(stream),
            rx,
            pending: Vec::new(),
            pending_pos: 0,
            stall_timeout: self.stall_timeout,
        }))
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    config: &AudioConfig,
    tx: Sender<Chunk>,
) -> Result<cpal::Stream, CaptureError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = stream_config.channels as usize;
    let source_rate = stream_config.sample_rate.0 as f64;
    let target_rate = config.sample_rate_hz as f64;
    let depth = config.bit_depth;
    let err_tx = tx.clone();

    device
        .build_input_stream(
            stream_config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let samples: Vec<f32> = data.iter().map(|s| f32::from_sample(*s)).collect();
                let mono = pcm::downmix_to_mono(&samples, channels);
                let resampled = pcm::resample_linear(&mono, source_rate, target_rate);
                let bytes = pcm::encode_samples(&resampled, depth);
                // Zero-length reads mean end of stream; never send one.
                if bytes.is_empty() {
                    return;
                }
                match tx.try_send(Ok(bytes)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!("capture channel full, dropping a {}-sample chunk", data.len());
                    }
                    Err(TrySendError::Disconnected(_)) => {}
                }
            },
            move |err: cpal::StreamError| {
                let _ = err_tx.try_send(Err(CaptureError::CaptureInterrupted(format!(
                    "input stream error: {err}"
                ))));
            },
            None,
        )
        .map_err(|e| CaptureError::CaptureUnavailable(format!("cannot build input stream: {e}")))
}

/// Capture source fed by the cpal callback thread.
///
/// Chunks arrive at whatever size cpal delivers; `read_frame` slices
/// them to the caller's buffer. Dropping the source drops the stream,
/// which stops the device.
struct ChannelSource {
    _stream: Option<cpal::Stream>,
    rx: Receiver<Chunk>,
    pending: Vec<u8>,
    pending_pos: usize,
    stall_timeout: Duration,
}

#[cfg(test)]
impl ChannelSource {
    fn from_parts(rx: Receiver<Chunk>, stall_timeout: Duration) -> Self {
        Self {
            _stream: None,
            rx,
            pending: Vec::new(),
            pending_pos: 0,
            stall_timeout,
        }
    }
}

impl CaptureSource for ChannelSource {
    fn read_frame(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        if self.pending_pos >= self.pending.len() {
            match self.rx.recv_timeout(self.stall_timeout) {
                Ok(Ok(bytes)) => {
                    self.pending = bytes;
                    self.pending_pos = 0;
                }
                Ok(Err(error)) => return Err(error),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(CaptureError::CaptureInterrupted("audio input stalled".into()))
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(0),
            }
        }

        let n = (self.pending.len() - self.pending_pos).min(buf.len());
        buf[..n].copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + n]);
        self.pending_pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_source_slices_chunks_to_the_caller() {
        let (tx, rx) = bounded::<Chunk>(4);
        let mut source = ChannelSource::from_parts(rx, Duration::from_secs(1));
        tx.send(Ok((1..=10).collect())).unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(source.read_frame(&mut buf).unwrap(), 4);
        assert_eq!(buf, [1, 2, 3, 4]);
        assert_eq!(source.read_frame(&mut buf).unwrap(), 4);
        assert_eq!(buf, [5, 6, 7, 8]);
        assert_eq!(source.read_frame(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[9, 10]);
    }

    #[test]
    fn channel_source_reports_a_stall() {
        let (_tx, rx) = bounded::<Chunk>(4);
        let mut source = ChannelSource::from_parts(rx, Duration::from_millis(30));

        let mut buf = [0u8; 4];
        let error = source.read_frame(&mut buf).unwrap_err();
        assert!(error.to_string().contains("stalled"));
    }

    #[test]
    fn channel_source_ends_when_the_stream_is_gone() {
        let (tx, rx) = bounded::<Chunk>(4);
        let mut source = ChannelSource::from_parts(rx, Duration::from_secs(1));
        drop(tx);

        let mut buf = [0u8; 4];
        assert_eq!(source.read_frame(&mut buf).unwrap(), 0);
    }

    #[test]
    fn channel_source_surfaces_stream_errors() {
        let (tx, rx) = bounded::<Chunk>(4);
        let mut source = ChannelSource::from_parts(rx, Duration::from_secs(1));
        tx.send(Err(CaptureError::CaptureInterrupted(
            "input stream error: device unplugged".into(),
        )))
        .unwrap();

        let mut buf = [0u8; 4];
        let error = source.read_frame(&mut buf).unwrap_err();
        assert!(error.to_string().contains("device unplugged"));
    }
}
