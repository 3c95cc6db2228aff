use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::models::snapshot::Snapshot;
use crate::session::replay::Shared;

/// Serializes buffer extraction against the capture thread.
///
/// The producer checks the snapshot gate before every read and every
/// write, so raising the gate and then taking the ring lock yields a
/// consistent copy: any in-flight frame write finishes first and no new
/// write can begin until the gate drops. The caller is stalled for at
/// most one frame write plus the copy, and capture resumes on its own —
/// there is no separate resume step to forget.
pub struct SnapshotCoordinator {
    shared: Arc<Shared>,
    /// One extraction at a time; later callers queue here.
    serial: Mutex<()>,
}

impl SnapshotCoordinator {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            serial: Mutex::new(()),
        }
    }

    /// Copy everything currently buffered, oldest byte first.
    ///
    /// Works in any state; while idle this reads the retained buffer
    /// without involving a producer. A concurrent stop wins the race:
    /// the copy still returns whatever was captured up to the stop
    /// point, and capture is not restarted afterwards.
    pub fn pause_and_snapshot(&self) -> Snapshot {
        let _serial = self.serial.lock();
        let config = *self.shared.config.lock();

        {
            let mut control = self.shared.control.lock();
            control.snapshot_gate = true;
        }

        // Taking the ring lock waits out any in-flight frame write.
        let data = self.shared.ring.lock().snapshot();

        {
            let mut control = self.shared.control.lock();
            control.snapshot_gate = false;
        }
        self.shared.cond.notify_all();

        debug!("snapshot captured {} bytes", data.len());
        Snapshot::new(data, config)
    }
}
