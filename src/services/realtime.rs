use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Redis channel shared by every API instance.
pub const REDIS_CHANNEL: &str = "realtime:changes";

const LOCAL_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    Translations,
    Content,
    Episodes,
}

impl ChangeTable {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeTable::Translations => "translations",
            ChangeTable::Content => "content",
            ChangeTable::Episodes => "episodes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row-level change, as pushed to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: ChangeTable,
    pub kind: ChangeKind,
    pub record: Value,
    /// Instance that produced the event; used to drop our own Redis echoes.
    pub origin: Uuid,
}

/// Fan-out of row changes to in-process subscribers (translation cache,
/// websocket clients) and, when Redis is configured, to other instances.
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
    instance_id: Uuid,
    redis: Option<redis::aio::MultiplexedConnection>,
}

impl ChangeFeed {
    pub fn new(redis: Option<redis::aio::MultiplexedConnection>) -> Self {
        let (tx, _) = broadcast::channel(LOCAL_BUFFER);
        Self {
            tx,
            instance_id: Uuid::new_v4(),
            redis,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Never fails: a change that cannot be forwarded is logged and dropped.
    pub async fn publish(&self, table: ChangeTable, kind: ChangeKind, record: Value) {
        let event = ChangeEvent {
            table,
            kind,
            record,
            origin: self.instance_id,
        };

        // Err only means nobody is listening right now.
        let _ = self.tx.send(event.clone());

        if let Some(conn) = &self.redis {
            let mut conn = conn.clone();
            let payload = match serde_json::to_string(&event) {
                Ok(p) => p,
                Err(e) => {
                    warn!("change feed: failed to encode event: {e}");
                    return;
                }
            };
            let res: redis::RedisResult<i64> = redis::cmd("PUBLISH")
                .arg(REDIS_CHANNEL)
                .arg(payload)
                .query_async(&mut conn)
                .await;
            if let Err(e) = res {
                warn!("change feed: redis publish failed: {e}");
            }
        }
    }

    /// Re-broadcast changes published by other instances.
    pub fn spawn_redis_bridge(&self, client: redis::Client) {
        let tx = self.tx.clone();
        let instance_id = self.instance_id;

        tokio::spawn(async move {
            let mut pubsub = match client.get_async_pubsub().await {
                Ok(c) => c,
                Err(e) => {
                    error!("Redis pubsub error: {}", e);
                    return;
                }
            };
            if let Err(e) = pubsub.subscribe(REDIS_CHANNEL).await {
                error!("Redis subscribe error: {}", e);
                return;
            }
            info!("change feed bridged to redis channel {REDIS_CHANNEL}");

            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(_) => continue,
                };
                match serde_json::from_str::<ChangeEvent>(&payload) {
                    Ok(event) if event.origin != instance_id => {
                        let _ = tx.send(event);
                    }
                    Ok(_) => {}
                    Err(e) => warn!("change feed: ignoring malformed event: {e}"),
                }
            }
            warn!("change feed: redis subscription ended");
        });
    }
}
