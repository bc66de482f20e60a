use serde::{Deserialize, Serialize};

/// Serial sub-type code of the position report consumed by the pose
/// projection. Other codes are carried through for the log view only.
pub const STATE_REPORT_CODE: u32 = 1;
pub const STATE_REQUEST_CODE: u32 = 2;
pub const CONTROL_CODE: u32 = 3;

/// One event from the boat feed, keyed by the wire field `type`.
/// Anything that fails to deserialize into this shape is not a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedMessage {
    Ping {
        #[serde(rename = "_id")]
        id: u64,
    },
    Serial {
        #[serde(rename = "_id")]
        id: u64,
        /// Sub-type code deciding the shape of `parsed`.
        msg: u32,
        /// Original frame as received off the boat bus, for the raw log.
        raw_data: String,
        #[serde(default)]
        parsed: SerialPayload,
    },
    Status {
        #[serde(rename = "_id")]
        id: u64,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
}

impl FeedMessage {
    pub fn id(&self) -> u64 {
        match self {
            FeedMessage::Ping { id }
            | FeedMessage::Serial { id, .. }
            | FeedMessage::Status { id, .. } => *id,
        }
    }

    /// The pose carried by this message, if it is a well-formed position
    /// report. A serial frame tagged with the state-report code whose payload
    /// is missing the numeric fields yields `None` rather than a partial pose.
    pub fn as_state_report(&self) -> Option<&Pose> {
        match self {
            FeedMessage::Serial {
                msg: STATE_REPORT_CODE,
                parsed: SerialPayload::State(pose),
                ..
            } => Some(pose),
            _ => None,
        }
    }
}

/// Parsed payload of a serial frame. Variant resolution follows the sub-type
/// taxonomy of the boat bus; unrecognized shapes are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SerialPayload {
    /// Code 1: position report.
    State(Pose),
    /// Code 3: actuator control command.
    Control {
        node_id: u8,
        #[serde(rename = "type")]
        kind: u8,
        u: f64,
    },
    /// Code 2: request for a node's state.
    StateRequest { node_id: u8 },
    /// Everything else, kept as-is for the log view.
    Opaque(serde_json::Value),
}

impl Default for SerialPayload {
    fn default() -> Self {
        SerialPayload::Opaque(serde_json::Value::Null)
    }
}

/// Vehicle pose: position, heading in degrees, optional commanded setpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub phi: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sp_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sp_y: Option<f64>,
}

/// Feed recency classification. Online until the silence timeout elapses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LivenessState {
    #[default]
    Online,
    Offline,
}

impl LivenessState {
    pub fn is_offline(&self) -> bool {
        matches!(self, LivenessState::Offline)
    }
}

/// The single most recent status text, shown for a bounded duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusNotice {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Full derived-state snapshot published after every update. Consumers only
/// ever read these; nothing downstream mutates aggregation state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    /// History window, arrival order, oldest first.
    pub log: Vec<FeedMessage>,
    pub pose: Option<Pose>,
    /// Track buffer, oldest first. Capped independently of the log window.
    pub track: Vec<Pose>,
    pub liveness: LivenessState,
    pub status: Option<StatusNotice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_round_trips() {
        let raw = r#"{"_id":7,"type":"ping"}"#;
        let msg: FeedMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg, FeedMessage::Ping { id: 7 });
        let back = serde_json::to_string(&msg).unwrap();
        let again: FeedMessage = serde_json::from_str(&back).unwrap();
        assert_eq!(again, msg);
    }

    #[test]
    fn state_report_parses_as_pose() {
        let raw = r#"{"_id":2,"type":"serial","msg":1,"raw_data":"aa01...",
                      "parsed":{"x":1.0,"y":2.0,"phi":90.0,"sp_x":4.0,"sp_y":5.0}}"#;
        let msg: FeedMessage = serde_json::from_str(raw).unwrap();
        let pose = msg.as_state_report().expect("state report expected");
        assert_eq!(pose.x, 1.0);
        assert_eq!(pose.y, 2.0);
        assert_eq!(pose.phi, 90.0);
        assert_eq!(pose.sp_x, Some(4.0));
    }

    #[test]
    fn state_report_without_setpoint_parses() {
        let raw = r#"{"_id":3,"type":"serial","msg":1,"raw_data":"",
                      "parsed":{"x":0.5,"y":-1.5,"phi":180.0}}"#;
        let msg: FeedMessage = serde_json::from_str(raw).unwrap();
        let pose = msg.as_state_report().unwrap();
        assert_eq!(pose.sp_x, None);
        assert_eq!(pose.sp_y, None);
    }

    #[test]
    fn malformed_state_payload_is_not_a_pose() {
        // phi missing: payload lands in the opaque variant, projector gets None
        let raw = r#"{"_id":4,"type":"serial","msg":1,"raw_data":"",
                      "parsed":{"x":1.0,"y":2.0}}"#;
        let msg: FeedMessage = serde_json::from_str(raw).unwrap();
        assert!(msg.as_state_report().is_none());
        match msg {
            FeedMessage::Serial { parsed: SerialPayload::Opaque(_), .. } => {}
            other => panic!("expected opaque payload, got {other:?}"),
        }
    }

    #[test]
    fn pose_payload_under_other_code_is_not_a_report() {
        let raw = r#"{"_id":5,"type":"serial","msg":4,"raw_data":"",
                      "parsed":{"x":1.0,"y":2.0,"phi":0.0}}"#;
        let msg: FeedMessage = serde_json::from_str(raw).unwrap();
        assert!(msg.as_state_report().is_none());
    }

    #[test]
    fn control_and_state_request_payloads_resolve() {
        let control = r#"{"_id":6,"type":"serial","msg":3,"raw_data":"",
                          "parsed":{"node_id":2,"type":1,"u":0.25}}"#;
        let msg: FeedMessage = serde_json::from_str(control).unwrap();
        match msg {
            FeedMessage::Serial { parsed: SerialPayload::Control { node_id, kind, u }, .. } => {
                assert_eq!((node_id, kind), (2, 1));
                assert_eq!(u, 0.25);
            }
            other => panic!("expected control payload, got {other:?}"),
        }

        let request = r#"{"_id":7,"type":"serial","msg":2,"raw_data":"",
                          "parsed":{"node_id":9}}"#;
        let msg: FeedMessage = serde_json::from_str(request).unwrap();
        match msg {
            FeedMessage::Serial { parsed: SerialPayload::StateRequest { node_id }, .. } => {
                assert_eq!(node_id, 9);
            }
            other => panic!("expected state request payload, got {other:?}"),
        }
    }

    #[test]
    fn unknown_tag_and_missing_id_fail_validation() {
        assert!(serde_json::from_str::<FeedMessage>(r#"{"_id":1,"type":"hello"}"#).is_err());
        assert!(serde_json::from_str::<FeedMessage>(r#"{"type":"ping"}"#).is_err());
        assert!(serde_json::from_str::<FeedMessage>(r#"{"_id":"one","type":"ping"}"#).is_err());
        assert!(serde_json::from_str::<FeedMessage>("42").is_err());
    }

    #[test]
    fn status_details_are_optional() {
        let raw = r#"{"_id":8,"type":"status","text":"armed"}"#;
        let msg: FeedMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(
            msg,
            FeedMessage::Status { id: 8, text: "armed".into(), details: None }
        );
    }
}
