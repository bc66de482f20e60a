use tokio::sync::{broadcast, watch};

use helmstation_shared::DashboardSnapshot;

use crate::scene::SceneAssets;
use crate::web::WsOutMsg;

#[derive(Clone)]
pub struct AppState {
    /// Latest derived-state snapshot published by the update task.
    pub snapshot_rx: watch::Receiver<DashboardSnapshot>,

    /// Incremental derived-state events → websocket clients.
    pub events_tx: broadcast::Sender<WsOutMsg>,

    /// Scene asset availability, probed once at startup.
    pub scene: SceneAssets,
}
