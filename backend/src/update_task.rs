// Single-writer driver for the aggregation core: the only place derived
// state is mutated. Messages and timer expiries are serialized through one
// select loop, then published as a full snapshot plus incremental events.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tracing::debug;

use helmstation_shared::{DashboardSnapshot, FeedMessage};

use crate::aggregate::{AggregateConfig, Aggregator, Update};
use crate::web::WsOutMsg;

pub fn monotonic_ms(start: Instant) -> u64 {
    Instant::now().duration_since(start).as_millis() as u64
}

pub async fn update_task(
    start: Instant,
    cfg: AggregateConfig,
    mut feed_rx: mpsc::Receiver<FeedMessage>,
    snapshot_tx: watch::Sender<DashboardSnapshot>,
    events_tx: broadcast::Sender<WsOutMsg>,
) {
    let mut agg = Aggregator::new(cfg, monotonic_ms(start));
    let mut feed_open = true;

    loop {
        // Deadlines are recomputed every turn; a deadline superseded by a
        // reset simply never comes due. Nothing is spawned, nothing dangles.
        let wake_at = agg
            .next_deadline_ms()
            .map(|ms| start + Duration::from_millis(ms));

        tokio::select! {
            msg = feed_rx.recv(), if feed_open => {
                match msg {
                    Some(msg) => {
                        let updates = agg.apply(msg, monotonic_ms(start));
                        publish(&agg, updates, &snapshot_tx, &events_tx);
                    }
                    None => {
                        debug!("feed channel closed, timers only from here on");
                        feed_open = false;
                    }
                }
            }
            _ = sleep_until_or_never(wake_at), if wake_at.is_some() => {
                let updates = agg.on_timer(monotonic_ms(start));
                publish(&agg, updates, &snapshot_tx, &events_tx);
            }
            else => break,
        }
    }
}

async fn sleep_until_or_never(wake_at: Option<Instant>) {
    match wake_at {
        Some(at) => tokio::time::sleep_until(at).await,
        // branch is disabled by its precondition; never polled
        None => std::future::pending::<()>().await,
    }
}

fn publish(
    agg: &Aggregator,
    updates: Vec<Update>,
    snapshot_tx: &watch::Sender<DashboardSnapshot>,
    events_tx: &broadcast::Sender<WsOutMsg>,
) {
    if updates.is_empty() {
        return;
    }
    let _ = snapshot_tx.send(agg.snapshot());
    for update in updates {
        let _ = events_tx.send(WsOutMsg::from(update));
    }
}
