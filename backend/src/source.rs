// Feed adapter: one persistent client connection to the boat's message
// feed. Transport and shape validation only; everything accepted goes into
// the pipeline channel untouched.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use helmstation_shared::FeedMessage;

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Connect to the feed endpoint and pump decoded messages into `tx` until
/// the pipeline side shuts down. Disconnects are retried on a fixed delay;
/// the liveness monitor makes the gap visible in the meantime.
pub async fn feed_task(url: String, tx: mpsc::Sender<FeedMessage>) {
    loop {
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                info!(%url, "feed connected");
                read_feed(stream, &tx).await;
                info!(%url, "feed disconnected");
            }
            Err(err) => {
                warn!(%url, %err, "feed connect failed");
            }
        }
        if tx.is_closed() {
            return;
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn read_feed(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    tx: &mpsc::Sender<FeedMessage>,
) {
    let (mut sink, mut frames) = stream.split();
    while let Some(frame) = frames.next().await {
        match frame {
            Ok(WsMessage::Text(raw)) => {
                if let Some(msg) = decode_event(raw.as_str()) {
                    if tx.send(msg).await.is_err() {
                        return;
                    }
                }
            }
            Ok(WsMessage::Ping(payload)) => {
                if sink.send(WsMessage::Pong(payload)).await.is_err() {
                    return;
                }
            }
            Ok(WsMessage::Close(_)) => return,
            Ok(_) => {}
            Err(err) => {
                warn!(%err, "feed stream error");
                return;
            }
        }
    }
}

/// Shape validation for one raw feed event. An event that is not a
/// well-formed message is dropped here with a diagnostic; callers never see
/// it and nothing is retried.
pub fn decode_event(raw: &str) -> Option<FeedMessage> {
    match serde_json::from_str::<FeedMessage>(raw) {
        Ok(msg) => Some(msg),
        Err(err) => {
            debug!(%err, raw, "dropping malformed feed event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_events() {
        let msg = decode_event(r#"{"_id":1,"type":"ping"}"#).unwrap();
        assert_eq!(msg.id(), 1);
        let msg = decode_event(
            r#"{"_id":2,"type":"serial","msg":1,"raw_data":"aa01","parsed":{"x":1,"y":2,"phi":3}}"#,
        )
        .unwrap();
        assert!(msg.as_state_report().is_some());
    }

    #[test]
    fn drops_malformed_events() {
        assert!(decode_event("not json").is_none());
        assert!(decode_event("[1,2,3]").is_none());
        assert!(decode_event(r#"{"type":"ping"}"#).is_none());
        assert!(decode_event(r#"{"_id":1,"type":"mystery"}"#).is_none());
    }
}
