use axum::{
    debug_handler,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::AppState;
use crate::chat::event::{ClientEvent, ServerEvent};
use crate::chat::{disconnect, dispatch};
use crate::error::ChatError;

#[debug_handler]
pub async fn chat_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(async move |socket| handle_socket(state, socket).await)
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let conn_id = Uuid::now_v7();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    state.hub.lock().await.register(conn_id, tx);
    tracing::debug!(%conn_id, "connection open");

    let (mut sink, mut stream) = socket.split();

    let writer_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = stream.next().await {
        let Message::Text(text) = frame else {
            continue;
        };
        let event = match serde_json::from_str::<ClientEvent>(&text) {
            Ok(event) => event,
            Err(err) => {
                let hub = state.hub.lock().await;
                hub.send_to(
                    conn_id,
                    ChatError::Validation(format!("unrecognized event: {err}")).into_event(),
                );
                continue;
            }
        };
        if let Err(err) = dispatch(&state, conn_id, event).await {
            let hub = state.hub.lock().await;
            hub.send_to(conn_id, err.into_event());
        }
    }

    disconnect(&state, conn_id).await;
    writer_task.abort();
    tracing::debug!(%conn_id, "connection closed");
}
