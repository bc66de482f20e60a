// Built-in feed generator: a boat running laps around a buoy circle with a
// little noise, plus the ping/status chatter a real bench produces. Used
// when no live feed is reachable or when FEED_SIMULATE is set.

use std::f64::consts::TAU;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::info;

use helmstation_shared::{FeedMessage, Pose, SerialPayload, STATE_REPORT_CODE};

const TICK: Duration = Duration::from_millis(250);
const LOOP_RADIUS_M: f64 = 40.0;
const LOOP_PERIOD_TICKS: u64 = 240;

const STATUS_ROTATION: [&str; 4] = [
    "autopilot engaged",
    "waypoint reached",
    "battery nominal",
    "gps fix ok",
];

pub async fn simulator_task(tx: mpsc::Sender<FeedMessage>) {
    info!("feed simulator running");
    let mut ticker = interval(TICK);
    let mut id: u64 = 0;
    let mut tick: u64 = 0;

    loop {
        ticker.tick().await;
        tick += 1;
        id += 1;

        let msg = if tick % 40 == 0 {
            FeedMessage::Status {
                id,
                text: STATUS_ROTATION[(tick / 40) as usize % STATUS_ROTATION.len()].to_string(),
                details: None,
            }
        } else if tick % 10 == 0 {
            FeedMessage::Ping { id }
        } else {
            state_report(id, tick)
        };

        if tx.send(msg).await.is_err() {
            return;
        }
    }
}

fn state_report(id: u64, tick: u64) -> FeedMessage {
    let angle = TAU * (tick % LOOP_PERIOD_TICKS) as f64 / LOOP_PERIOD_TICKS as f64;
    let jitter = (rand::random::<f64>() - 0.5) * 0.4;
    // setpoint leads the boat slightly along the loop
    let sp_angle = angle + TAU / 32.0;
    let pose = Pose {
        x: LOOP_RADIUS_M * angle.cos() + jitter,
        y: LOOP_RADIUS_M * angle.sin() + jitter,
        phi: (angle.to_degrees() + 90.0) % 360.0,
        sp_x: Some(LOOP_RADIUS_M * sp_angle.cos()),
        sp_y: Some(LOOP_RADIUS_M * sp_angle.sin()),
    };
    FeedMessage::Serial {
        id,
        msg: STATE_REPORT_CODE,
        raw_data: format!("sim:{id}"),
        parsed: SerialPayload::State(pose),
    }
}
