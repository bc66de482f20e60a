use std::path::Path;
use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tracing::warn;

use helmstation_shared::{DashboardSnapshot, FeedMessage, LivenessState, Pose, StatusNotice};

use crate::aggregate::Update;
use crate::scene::{asset_service, SceneAssets};
use crate::state::AppState;

/// Public router constructor
pub fn router(state: Arc<AppState>, assets_dir: &Path, static_dir: &Path) -> Router {
    let static_dir = ServeDir::new(static_dir)
        .precompressed_br()
        .precompressed_gzip();

    Router::new()
        .route("/api/recent", get(get_recent))
        .route("/api/pose", get(get_pose))
        .route("/api/track", get(get_track))
        .route("/api/banner", get(get_banner))
        .route("/api/scene", get(get_scene))
        .route("/ws", get(ws_handler))
        .nest_service("/assets", asset_service(assets_dir))
        // anything that doesn't match the above routes goes to the static files
        .fallback_service(static_dir)
        .layer(CompressionLayer::new())
        .with_state(state)
}

/// Outgoing WebSocket messages to the dashboard.
/// This is what the client deserializes:
///   { "ty": "snapshot", "data": { ...DashboardSnapshot... } }
///   { "ty": "message",  "data": { ...FeedMessage... } }
///   { "ty": "pose",     "data": { ...Pose... } }
///   { "ty": "liveness", "data": "online" | "offline" }
///   { "ty": "status",   "data": { ...StatusNotice... } | null }
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "ty", content = "data", rename_all = "snake_case")]
pub enum WsOutMsg {
    Snapshot(DashboardSnapshot),
    Message(FeedMessage),
    Pose(Pose),
    Liveness(LivenessState),
    Status(Option<StatusNotice>),
}

impl From<Update> for WsOutMsg {
    fn from(update: Update) -> Self {
        match update {
            Update::Message(msg) => WsOutMsg::Message(msg),
            Update::Pose(pose) => WsOutMsg::Pose(pose),
            Update::Liveness(state) => WsOutMsg::Liveness(state),
            Update::Status(notice) => WsOutMsg::Status(notice),
        }
    }
}

/// Banner state for the offline/status overlay. Visible whenever the feed
/// is silent or a status notice is live.
#[derive(Debug, Serialize)]
pub struct BannerMsg {
    pub offline: bool,
    pub status: Option<StatusNotice>,
    pub visible: bool,
}

pub fn banner(snapshot: &DashboardSnapshot) -> BannerMsg {
    let offline = snapshot.liveness.is_offline();
    BannerMsg {
        offline,
        visible: offline || snapshot.status.is_some(),
        status: snapshot.status.clone(),
    }
}

async fn get_recent(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // history window, arrival order, oldest first
    Json(state.snapshot_rx.borrow().log.clone())
}

async fn get_pose(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.snapshot_rx.borrow().pose)
}

async fn get_track(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.snapshot_rx.borrow().track.clone())
}

async fn get_banner(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(banner(&state.snapshot_rx.borrow()))
}

async fn get_scene(State(state): State<Arc<AppState>>) -> Json<SceneAssets> {
    Json(state.scene.clone())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
    let mut events_rx = state.events_tx.subscribe();
    let (mut sender, mut receiver) = socket.split();

    // full snapshot first, incremental events after
    let hello = WsOutMsg::Snapshot(state.snapshot_rx.borrow().clone());
    if send_msg(&mut sender, &hello).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            recv = events_rx.recv() => {
                match recv {
                    Ok(event) => {
                        if send_msg(&mut sender, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // slow client missed events; re-sync with a fresh snapshot
                        warn!(missed, "ws client lagged, resending snapshot");
                        let snapshot = WsOutMsg::Snapshot(state.snapshot_rx.borrow().clone());
                        if send_msg(&mut sender, &snapshot).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Ping(payload))) => {
                        if sender.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(?err, "ws error");
                        break;
                    }
                }
            }
        }
    }
}

async fn send_msg(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &WsOutMsg,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(msg).unwrap_or_default();
    sender.send(Message::Text(Utf8Bytes::from(text))).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_is_visible_iff_offline_or_status_present() {
        let mut snapshot = DashboardSnapshot::default();
        assert!(!banner(&snapshot).visible);

        snapshot.status = Some(StatusNotice {
            text: "armed".into(),
            details: None,
        });
        let b = banner(&snapshot);
        assert!(b.visible && !b.offline);

        snapshot.status = None;
        snapshot.liveness = LivenessState::Offline;
        let b = banner(&snapshot);
        assert!(b.visible && b.offline);
    }

    #[test]
    fn ws_messages_carry_the_ty_tag() {
        let text = serde_json::to_string(&WsOutMsg::Liveness(LivenessState::Offline)).unwrap();
        assert_eq!(text, r#"{"ty":"liveness","data":"offline"}"#);

        let text = serde_json::to_string(&WsOutMsg::Status(None)).unwrap();
        assert_eq!(text, r#"{"ty":"status","data":null}"#);
    }
}
