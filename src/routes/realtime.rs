use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::{
    middleware::auth::decode_access_token,
    services::realtime::{ChangeEvent, ChangeKind, ChangeTable},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct RealtimeParams {
    pub table: Option<ChangeTable>,
    /// Admin access token; admins also see unpublished rows.
    pub token: Option<String>,
}

/// GET /realtime: WebSocket stream of row changes.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<RealtimeParams>,
) -> Response {
    let is_admin = params
        .token
        .as_deref()
        .and_then(|t| decode_access_token(t, &state.config.jwt_secret).ok())
        .is_some_and(|user| user.role.is_admin());

    ws.on_upgrade(move |socket| handle_socket(socket, state, params.table, is_admin))
}

/// Fields that identify a row; all a visitor gets for a row they may no
/// longer see.
const IDENTITY_FIELDS: [&str; 5] = ["id", "language_code", "page_key", "section_key", "key"];

/// What a client is sent for `event`, if anything. Visitors never see the
/// body of an unpublished row: inserts of hidden rows are dropped and an
/// unpublish arrives as a delete carrying only the row's identity.
fn project(event: &ChangeEvent, table: Option<ChangeTable>, is_admin: bool) -> Option<ChangeEvent> {
    if table.is_some_and(|t| t != event.table) {
        return None;
    }
    let hidden = event.record.get("is_published").and_then(Value::as_bool) == Some(false);
    if is_admin || !hidden {
        return Some(event.clone());
    }
    if event.kind == ChangeKind::Insert {
        return None;
    }

    let identity: Map<String, Value> = event
        .record
        .as_object()
        .into_iter()
        .flatten()
        .filter(|(field, _)| IDENTITY_FIELDS.contains(&field.as_str()))
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect();
    Some(ChangeEvent {
        kind: ChangeKind::Delete,
        record: Value::Object(identity),
        ..event.clone()
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    table: Option<ChangeTable>,
    is_admin: bool,
) {
    let (mut sender, mut receiver) = socket.split();
    let mut changes = state.feed.subscribe();
    info!(
        "realtime client connected (table={}, admin={is_admin})",
        table.map_or("*", ChangeTable::as_str)
    );

    // Change feed → WebSocket
    let mut feed_task = tokio::spawn(async move {
        loop {
            let event = match changes.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("realtime client lagged, {skipped} events dropped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let Some(event) = project(&event, table, is_admin) else {
                continue;
            };
            let payload = match serde_json::to_string(&event) {
                Ok(p) => p,
                Err(_) => continue,
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    // Client frames are only read to notice disconnects
    let mut client_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut feed_task) => client_task.abort(),
        _ = (&mut client_task) => feed_task.abort(),
    }

    info!("realtime client disconnected");
}
