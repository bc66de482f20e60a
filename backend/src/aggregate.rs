// Derived-state aggregation over the boat feed.
//
// Everything here is synchronous and clock-free: `apply` and `on_timer` take
// an explicit `now_ms`, so the whole pipeline is deterministic under test and
// the async driver stays a thin shell around it.

use helmstation_shared::{
    DashboardSnapshot, FeedMessage, LivenessState, Pose, StatusNotice, STATE_REPORT_CODE,
};
use tracing::debug;

use crate::ring_buffer::RingBuffer;

#[derive(Debug, Clone, Copy)]
pub struct AggregateConfig {
    pub history_cap: usize,
    pub track_cap: usize,
    pub offline_timeout_ms: u64,
    pub status_display_ms: u64,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            history_cap: crate::config::DEFAULT_HISTORY_CAP,
            track_cap: crate::config::DEFAULT_TRACK_CAP,
            offline_timeout_ms: crate::config::DEFAULT_OFFLINE_TIMEOUT_MS,
            status_display_ms: crate::config::DEFAULT_STATUS_DISPLAY_MS,
        }
    }
}

/// One derived-state change, emitted in the order it took effect.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Liveness(LivenessState),
    Pose(Pose),
    Status(Option<StatusNotice>),
    Message(FeedMessage),
}

/// Owns every derived signal. Single writer: the update task is the only
/// holder, so no two updates can interleave mid-computation.
pub struct Aggregator {
    history: RingBuffer<FeedMessage>,
    pose: Option<Pose>,
    track: RingBuffer<Pose>,
    liveness: LivenessMonitor,
    status: StatusAnnotator,
}

impl Aggregator {
    pub fn new(cfg: AggregateConfig, now_ms: u64) -> Self {
        Self {
            history: RingBuffer::new(cfg.history_cap),
            pose: None,
            track: RingBuffer::new(cfg.track_cap),
            liveness: LivenessMonitor::new(cfg.offline_timeout_ms, now_ms),
            status: StatusAnnotator::new(cfg.status_display_ms),
        }
    }

    /// Apply one accepted message. Any message resets liveness; the pose and
    /// status derivations react only to their own message kinds; every
    /// message enters the history window.
    pub fn apply(&mut self, msg: FeedMessage, now_ms: u64) -> Vec<Update> {
        let mut updates = Vec::new();

        if self.liveness.reset(now_ms) {
            updates.push(Update::Liveness(LivenessState::Online));
        }

        match &msg {
            FeedMessage::Serial { msg: code, id, .. } => {
                if let Some(pose) = msg.as_state_report() {
                    let pose = *pose;
                    self.pose = Some(pose);
                    self.track.push(pose);
                    updates.push(Update::Pose(pose));
                } else if *code == STATE_REPORT_CODE {
                    // fail closed: no partial coordinates reach the scene
                    debug!(id = *id, "state report with malformed payload, pose withheld");
                }
            }
            FeedMessage::Status { text, details, .. } => {
                let notice = StatusNotice {
                    text: text.clone(),
                    details: details.clone(),
                };
                self.status.post(notice.clone(), now_ms);
                updates.push(Update::Status(Some(notice)));
            }
            FeedMessage::Ping { .. } => {}
        }

        self.history.push(msg.clone());
        updates.push(Update::Message(msg));
        updates
    }

    /// Advance the timer-based signals to `now_ms`. A deadline superseded by
    /// a later reset has already moved, so a stale wake-up finds nothing due.
    pub fn on_timer(&mut self, now_ms: u64) -> Vec<Update> {
        let mut updates = Vec::new();
        if self.liveness.expire_if_due(now_ms) {
            updates.push(Update::Liveness(LivenessState::Offline));
        }
        if self.status.expire_if_due(now_ms) {
            updates.push(Update::Status(None));
        }
        updates
    }

    /// Earliest pending deadline, if any timer is armed.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        match (self.liveness.deadline_ms(), self.status.deadline_ms()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            log: self.history.snapshot(),
            pose: self.pose,
            track: self.track.snapshot(),
            liveness: self.liveness.state(),
            status: self.status.current().cloned(),
        }
    }
}

/// Silence detector: any traffic restarts the countdown, expiry flips
/// offline. Starts online pending the first timeout.
struct LivenessMonitor {
    timeout_ms: u64,
    state: LivenessState,
    deadline_ms: Option<u64>,
}

impl LivenessMonitor {
    fn new(timeout_ms: u64, now_ms: u64) -> Self {
        Self {
            timeout_ms,
            state: LivenessState::Online,
            deadline_ms: Some(now_ms + timeout_ms),
        }
    }

    /// Returns true when this reset brought the feed back online.
    fn reset(&mut self, now_ms: u64) -> bool {
        let was_offline = self.state.is_offline();
        self.state = LivenessState::Online;
        self.deadline_ms = Some(now_ms + self.timeout_ms);
        was_offline
    }

    fn expire_if_due(&mut self, now_ms: u64) -> bool {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.state = LivenessState::Offline;
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }

    fn deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }

    fn state(&self) -> LivenessState {
        self.state
    }
}

/// Toast-style status display: only the newest notice is ever shown, each
/// new one restarts the display window.
struct StatusAnnotator {
    display_ms: u64,
    current: Option<StatusNotice>,
    deadline_ms: Option<u64>,
}

impl StatusAnnotator {
    fn new(display_ms: u64) -> Self {
        Self {
            display_ms,
            current: None,
            deadline_ms: None,
        }
    }

    fn post(&mut self, notice: StatusNotice, now_ms: u64) {
        self.current = Some(notice);
        self.deadline_ms = Some(now_ms + self.display_ms);
    }

    fn expire_if_due(&mut self, now_ms: u64) -> bool {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.current = None;
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }

    fn deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }

    fn current(&self) -> Option<&StatusNotice> {
        self.current.as_ref()
    }
}
