use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tower_http::services::ServeDir;
use tracing::warn;

/// Ground/environment texture for the 3D scene.
pub const GROUND_ASSET: &str = "ground.png";
/// Boat model for the vehicle marker.
pub const VEHICLE_ASSET: &str = "boat.glb";

/// Which scene assets are actually present on disk. An absent asset is
/// reported as `None`; the client renders a primitive fallback instead.
#[derive(Debug, Clone, Serialize)]
pub struct SceneAssets {
    pub ground_url: Option<String>,
    pub vehicle_url: Option<String>,
}

/// Probe the assets directory once at startup. Missing files are logged and
/// degrade rendering; they never fail startup.
pub async fn probe_scene_assets(assets_dir: &Path) -> SceneAssets {
    SceneAssets {
        ground_url: probe(assets_dir, GROUND_ASSET).await,
        vehicle_url: probe(assets_dir, VEHICLE_ASSET).await,
    }
}

async fn probe(dir: &Path, name: &str) -> Option<String> {
    let path: PathBuf = dir.join(name);
    if fs::try_exists(&path).await.unwrap_or(false) {
        Some(format!("/assets/{name}"))
    } else {
        warn!(
            path = %path.display(),
            "scene asset missing, client falls back to a primitive shape"
        );
        None
    }
}

/// Service that serves `/assets/*` out of the configured directory.
pub fn asset_service(assets_dir: &Path) -> ServeDir {
    ServeDir::new(assets_dir)
}
