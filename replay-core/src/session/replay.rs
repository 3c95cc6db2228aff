use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::{Condvar, Mutex};

use crate::models::config::AudioConfig;
use crate::models::error::CaptureError;
use crate::models::snapshot::Snapshot;
use crate::models::state::{CaptureState, SessionInfo, StartOutcome};
use crate::processing::ring_buffer::RingBuffer;
use crate::session::coordinator::SnapshotCoordinator;
use crate::traits::capture_listener::CaptureListener;
use crate::traits::capture_source::CaptureBackend;

/// Milliseconds of audio per capture frame.
const FRAME_MS: u32 = 20;

/// How long `start` waits for the capture thread to open the device.
const OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// What started, or keeps alive, the current capture run.
#[derive(Debug, Clone, Copy)]
enum Trigger {
    Manual,
    CallOverlay,
}

/// Why the capture loop exited.
enum Finish {
    Stopped,
    Interrupted(CaptureError),
}

/// Control-plane state, protected by `Shared::control`.
pub(crate) struct ControlState {
    pub(crate) state: CaptureState,
    /// Outstanding user-trigger hold (`start` / `stop`).
    pub(crate) manual_hold: bool,
    /// Outstanding call-overlay holds (`begin_call_overlay` refcount).
    pub(crate) overlay_holds: u32,
    /// Outstanding pause holds (`pause` refcount).
    pub(crate) pause_holds: u32,
    /// Raised by the coordinator while a snapshot copy is in progress;
    /// the producer parks before its next read or write.
    pub(crate) snapshot_gate: bool,
    /// Tells the capture thread to tear down at its next check.
    pub(crate) stop_requested: bool,
    /// A capture thread is between spawn and open completion.
    pub(crate) opening: bool,
    /// Outcome of the open handshake, consumed by the `start` waiter.
    pub(crate) open_outcome: Option<Result<(), CaptureError>>,
    pub(crate) started_at: Option<DateTime<Utc>>,
}

impl ControlState {
    fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            manual_hold: false,
            overlay_holds: 0,
            pause_holds: 0,
            snapshot_gate: false,
            stop_requested: false,
            opening: false,
            open_outcome: None,
            started_at: None,
        }
    }
}

/// State shared between the control surface, the capture thread and the
/// snapshot coordinator. Lock order where both are needed: `control`
/// before `ring`; the capture thread never holds both at once, and no
/// listener is invoked while either is held.
pub(crate) struct Shared {
    pub(crate) control: Mutex<ControlState>,
    pub(crate) cond: Condvar,
    pub(crate) ring: Mutex<RingBuffer>,
    pub(crate) config: Mutex<AudioConfig>,
    pub(crate) listener: Mutex<Option<Arc<dyn CaptureListener>>>,
}

/// Rolling replay capture session.
///
/// Owns the dedicated capture thread and the ring buffer holding the
/// most recent audio. All control methods take `&self`: inject the
/// session as `Arc<ReplaySession>` into whichever trigger needs it
/// (record button, call-state listener, notification action).
///
/// ```text
/// [CaptureBackend] → capture thread → [RingBuffer (last N seconds)]
///                                             │ pause_and_snapshot()
///                                             ▼
///                        [Snapshot] → trim → WAV → PersistTarget
/// ```
///
/// Two kinds of trigger keep capture alive: the manual hold
/// (`start`/`stop`) and the call-overlay refcount
/// (`begin_call_overlay`/`end_call_overlay`). Capture tears down only
/// when the manual hold is released and no overlay holds remain; the
/// buffer survives teardown and can still be snapshotted.
pub struct ReplaySession {
    shared: Arc<Shared>,
    backend: Arc<dyn CaptureBackend>,
    coordinator: SnapshotCoordinator,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl ReplaySession {
    pub fn new(
        config: AudioConfig,
        backend: Arc<dyn CaptureBackend>,
    ) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::InvalidConfig)?;
        let shared = Arc::new(Shared {
            control: Mutex::new(ControlState::new()),
            cond: Condvar::new(),
            ring: Mutex::new(RingBuffer::new(config.capacity_bytes())),
            config: Mutex::new(config),
            listener: Mutex::new(None),
        });
        Ok(Self {
            coordinator: SnapshotCoordinator::new(Arc::clone(&shared)),
            shared,
            backend,
            worker: Mutex::new(None),
        })
    }

    pub fn set_listener(&self, listener: Arc<dyn CaptureListener>) {
        *self.shared.listener.lock() = Some(listener);
    }

    /// Manual trigger: ensure capture is running and register the
    /// manual hold.
    ///
    /// Spawns the capture thread and blocks until the device opens (or
    /// `OPEN_TIMEOUT` passes). If a session is already live the hold is
    /// registered without touching it.
    pub fn start(&self) -> Result<StartOutcome, CaptureError> {
        self.ensure_running(Trigger::Manual)
    }

    /// Call-overlay trigger: ensure capture is running and add one
    /// overlay hold.
    pub fn begin_call_overlay(&self) -> Result<StartOutcome, CaptureError> {
        self.ensure_running(Trigger::CallOverlay)
    }

    /// Release the manual hold; tear capture down if it was the last.
    ///
    /// Returns `true` when capture actually stopped. The ring contents
    /// are retained and can still be snapshotted while idle. Safe from
    /// any thread except a listener callback.
    pub fn stop(&self) -> bool {
        {
            let mut control = self.shared.control.lock();
            control.manual_hold = false;
            if control.state.is_idle() && !control.opening {
                debug!("stop ignored: no live session");
                return false;
            }
            if control.overlay_holds > 0 {
                info!(
                    "manual hold released, {} overlay hold(s) keep capture running",
                    control.overlay_holds
                );
                return false;
            }
            control.stop_requested = true;
        }
        self.shared.cond.notify_all();
        self.join_worker();
        true
    }

    /// Release one overlay hold; tear capture down if it was the last
    /// and the manual hold is clear. Returns `true` when capture
    /// actually stopped.
    pub fn end_call_overlay(&self) -> bool {
        {
            let mut control = self.shared.control.lock();
            if control.overlay_holds == 0 {
                warn!("end_call_overlay without a matching begin");
                return false;
            }
            control.overlay_holds -= 1;
            if control.overlay_holds > 0 || control.manual_hold {
                debug!(
                    "overlay hold released ({} remaining, manual hold: {})",
                    control.overlay_holds, control.manual_hold
                );
                return false;
            }
            if control.state.is_idle() && !control.opening {
                return false;
            }
            control.stop_requested = true;
        }
        self.shared.cond.notify_all();
        self.join_worker();
        true
    }

    /// Add one pause hold. The producer finishes any in-flight frame,
    /// then parks; buffer contents are untouched apart from the gap in
    /// new data. No-op (logged) without a live session.
    pub fn pause(&self) {
        let became_paused = {
            let mut control = self.shared.control.lock();
            if control.state.is_idle() && !control.opening {
                debug!("pause ignored: no live session");
                return;
            }
            control.pause_holds += 1;
            debug!("pause hold added ({} outstanding)", control.pause_holds);
            if control.pause_holds == 1 && control.state.is_capturing() {
                control.state = CaptureState::Paused;
                true
            } else {
                false
            }
        };
        self.shared.cond.notify_all();
        if became_paused {
            info!("capture paused");
            Self::notify_state_changed(&self.shared, false);
        }
    }

    /// Release one pause hold; the producer resumes once none remain.
    /// No-op (logged) without an outstanding hold.
    pub fn resume(&self) {
        let became_active = {
            let mut control = self.shared.control.lock();
            if control.pause_holds == 0 {
                debug!("resume ignored: no pause hold outstanding");
                return;
            }
            control.pause_holds -= 1;
            debug!("pause hold released ({} outstanding)", control.pause_holds);
            if control.pause_holds == 0 && control.state.is_paused() {
                control.state = CaptureState::Capturing;
                true
            } else {
                false
            }
        };
        self.shared.cond.notify_all();
        if became_active {
            info!("capture resumed");
            Self::notify_state_changed(&self.shared, true);
        }
    }

    /// Logically empty the ring. Works in any state; a concurrent frame
    /// write lands in the emptied buffer.
    pub fn reset(&self) {
        self.shared.ring.lock().reset();
        info!("replay buffer reset");
    }

    /// Race-free copy of everything currently buffered, oldest byte
    /// first. Works in any state: while capturing the producer is
    /// stalled for at most one in-flight frame plus the copy; while
    /// idle the retained buffer is snapshotted directly.
    pub fn pause_and_snapshot(&self) -> Snapshot {
        self.coordinator.pause_and_snapshot()
    }

    pub fn coordinator(&self) -> &SnapshotCoordinator {
        &self.coordinator
    }

    /// Swap in a new configuration and rebuild the ring at its
    /// capacity. Only valid while idle; buffered audio is discarded
    /// because the byte layout changes with the config.
    pub fn reconfigure(&self, config: AudioConfig) -> Result<(), CaptureError> {
        config.validate().map_err(CaptureError::InvalidConfig)?;
        let mut control = self.shared.control.lock();
        if !control.state.is_idle() || control.opening {
            return Err(CaptureError::InvalidConfig(
                "capture must be stopped before reconfiguring".into(),
            ));
        }
        *self.shared.config.lock() = config;
        *self.shared.ring.lock() = RingBuffer::new(config.capacity_bytes());
        drop(control);
        info!(
            "reconfigured: {} Hz, {}-bit, {} s buffer",
            config.sample_rate_hz, config.bit_depth.bits, config.buffer_duration_s
        );
        Ok(())
    }

    /// Strictly `state == Capturing`: false while paused, opening or
    /// idle.
    pub fn is_capturing(&self) -> bool {
        self.shared.control.lock().state.is_capturing()
    }

    pub fn config(&self) -> AudioConfig {
        *self.shared.config.lock()
    }

    /// Playback duration of the audio currently buffered.
    pub fn buffered_duration(&self) -> Duration {
        let bytes = self.shared.ring.lock().len();
        self.config().duration_for(bytes)
    }

    pub fn session_info(&self) -> SessionInfo {
        let (state, started_at, overlay_holds, pause_holds) = {
            let control = self.shared.control.lock();
            (
                control.state,
                control.started_at,
                control.overlay_holds,
                control.pause_holds,
            )
        };
        SessionInfo {
            state,
            started_at,
            overlay_holds,
            pause_holds,
            buffered_bytes: self.shared.ring.lock().len(),
        }
    }

    // --- Internal helpers ---

    fn ensure_running(&self, trigger: Trigger) -> Result<StartOutcome, CaptureError> {
        {
            let mut control = self.shared.control.lock();
            if !control.state.is_idle() || control.opening {
                match trigger {
                    Trigger::Manual => control.manual_hold = true,
                    Trigger::CallOverlay => control.overlay_holds += 1,
                }
                debug!(
                    "capture already live, hold registered (manual: {}, overlay: {})",
                    control.manual_hold, control.overlay_holds
                );
                return Ok(StartOutcome::AlreadyRunning);
            }
            control.opening = true;
            control.open_outcome = None;
            control.stop_requested = false;
        }

        // A previous run's thread may still be unwinding; collect it
        // before spawning the next one.
        self.join_worker();

        if let Err(error) = self.spawn_worker(trigger) {
            self.shared.control.lock().opening = false;
            return Err(error);
        }

        let deadline = Instant::now() + OPEN_TIMEOUT;
        let mut control = self.shared.control.lock();
        loop {
            if let Some(outcome) = control.open_outcome.take() {
                return outcome.map(|()| StartOutcome::Started);
            }
            if self
                .shared
                .cond
                .wait_until(&mut control, deadline)
                .timed_out()
            {
                // Abandon the open: the capture thread releases the
                // source once it finally returns.
                control.stop_requested = true;
                return Err(CaptureError::CaptureUnavailable(
                    "timed out waiting for the capture source to open".into(),
                ));
            }
        }
    }

    fn spawn_worker(&self, trigger: Trigger) -> Result<(), CaptureError> {
        let shared = Arc::clone(&self.shared);
        let backend = Arc::clone(&self.backend);
        let handle = thread::Builder::new()
            .name("replay-capture".into())
            .spawn(move || Self::capture_loop(shared, backend, trigger))
            .map_err(|error| {
                CaptureError::CaptureUnavailable(format!(
                    "failed to spawn capture thread: {error}"
                ))
            })?;
        *self.worker.lock() = Some(handle);
        Ok(())
    }

    fn join_worker(&self) {
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }

    /// Body of the capture thread: open the source on this thread
    /// (platform audio handles are thread-affine), publish the outcome,
    /// then pump frames until stopped or interrupted.
    fn capture_loop(shared: Arc<Shared>, backend: Arc<dyn CaptureBackend>, trigger: Trigger) {
        let config = *shared.config.lock();
        let opened = backend.open(&config);

        let (mut source, flowing) = {
            let mut control = shared.control.lock();
            if control.stop_requested {
                // The waiter gave up (or stop() arrived mid-open);
                // release the source without ever going live.
                control.opening = false;
                control.stop_requested = false;
                control.open_outcome = Some(Err(CaptureError::CaptureUnavailable(
                    "capture stopped while the source was opening".into(),
                )));
                drop(control);
                shared.cond.notify_all();
                debug!("capture open abandoned");
                return;
            }
            match opened {
                Ok(source) => {
                    control.opening = false;
                    control.open_outcome = Some(Ok(()));
                    match trigger {
                        Trigger::Manual => control.manual_hold = true,
                        Trigger::CallOverlay => control.overlay_holds += 1,
                    }
                    control.state = if control.pause_holds > 0 {
                        CaptureState::Paused
                    } else {
                        CaptureState::Capturing
                    };
                    control.started_at = Some(Utc::now());
                    let flowing = control.state.is_capturing();
                    (source, flowing)
                }
                Err(error) => {
                    control.opening = false;
                    control.open_outcome = Some(Err(error.clone()));
                    drop(control);
                    shared.cond.notify_all();
                    warn!("capture source failed to open: {error}");
                    return;
                }
            }
        };
        shared.cond.notify_all();

        if flowing {
            info!(
                "capture started ({} Hz, {}-bit, {} s buffer)",
                config.sample_rate_hz, config.bit_depth.bits, config.buffer_duration_s
            );
            Self::notify_state_changed(&shared, true);
        } else {
            info!("capture started parked under a pause hold");
        }

        let frame_len = config
            .frame_bytes(FRAME_MS)
            .min(config.capacity_bytes())
            .max(1);
        let mut frame = vec![0u8; frame_len];

        let reason = 'capture: loop {
            // Park point: wait out pause holds and snapshot gates, leave
            // on stop. No locks are held during the blocking read below.
            {
                let mut control = shared.control.lock();
                loop {
                    if control.stop_requested {
                        break 'capture Finish::Stopped;
                    }
                    if control.pause_holds > 0 || control.snapshot_gate {
                        shared.cond.wait(&mut control);
                    } else {
                        break;
                    }
                }
            }

            let filled = match source.read_frame(&mut frame) {
                Ok(0) => {
                    break 'capture Finish::Interrupted(CaptureError::CaptureInterrupted(
                        "capture source ended".into(),
                    ))
                }
                Ok(filled) => filled,
                Err(error) => break 'capture Finish::Interrupted(error),
            };
            if filled > frame.len() {
                break 'capture Finish::Interrupted(CaptureError::InvalidFrame(format!(
                    "source reported {filled} bytes for a {} byte frame",
                    frame.len()
                )));
            }

            // A snapshot or pause raised between the read and here
            // defers this write; a stop request wins and discards the
            // frame.
            {
                let mut control = shared.control.lock();
                while (control.snapshot_gate || control.pause_holds > 0)
                    && !control.stop_requested
                {
                    shared.cond.wait(&mut control);
                }
                if control.stop_requested {
                    break 'capture Finish::Stopped;
                }
            }

            if let Err(error) = shared.ring.lock().write(&frame[..filled]) {
                break 'capture Finish::Interrupted(error);
            }
        };

        // Release the device before the teardown becomes observable.
        drop(source);
        match reason {
            Finish::Stopped => Self::finish_stopped(&shared),
            Finish::Interrupted(error) => Self::finish_interrupted(&shared, error),
        }
    }

    /// Orderly teardown: back to idle, all holds cleared, buffer
    /// retained.
    fn finish_stopped(shared: &Shared) {
        let was_flowing = {
            let mut control = shared.control.lock();
            let was_flowing = control.state.is_capturing();
            control.state = CaptureState::Idle;
            control.manual_hold = false;
            control.overlay_holds = 0;
            control.pause_holds = 0;
            control.stop_requested = false;
            control.started_at = None;
            was_flowing
        };
        shared.cond.notify_all();
        info!("capture stopped, buffer retained");
        if was_flowing {
            Self::notify_state_changed(shared, false);
        }
    }

    /// Source-failure teardown. A stop request that raced the failure
    /// wins: the run ends as a plain stop and no interruption is
    /// surfaced.
    fn finish_interrupted(shared: &Shared, error: CaptureError) {
        let was_flowing = {
            let mut control = shared.control.lock();
            if control.stop_requested {
                drop(control);
                Self::finish_stopped(shared);
                return;
            }
            let was_flowing = control.state.is_capturing();
            control.state = CaptureState::Idle;
            control.manual_hold = false;
            control.overlay_holds = 0;
            control.pause_holds = 0;
            control.started_at = None;
            was_flowing
        };
        shared.cond.notify_all();
        warn!("capture interrupted: {error}");
        Self::notify_interrupted(shared, &error);
        if was_flowing {
            Self::notify_state_changed(shared, false);
        }
    }

    fn notify_state_changed(shared: &Shared, is_capturing: bool) {
        let listener = shared.listener.lock().clone();
        if let Some(listener) = listener {
            listener.on_state_changed(is_capturing);
        }
    }

    fn notify_interrupted(shared: &Shared, error: &CaptureError) {
        let listener = shared.listener.lock().clone();
        if let Some(listener) = listener {
            listener.on_interrupted(error);
        }
    }
}

impl Drop for ReplaySession {
    fn drop(&mut self) {
        {
            let mut control = self.shared.control.lock();
            control.manual_hold = false;
            control.overlay_holds = 0;
            control.stop_requested = true;
        }
        self.shared.cond.notify_all();
        if let Some(handle) = self.worker.get_mut().take() {
            let _ = handle.join();
        }
    }
}
