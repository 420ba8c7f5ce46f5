use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};

use super::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (handle, mut outbound) = state.router.connect();
    let (mut sink, mut stream) = socket.split();

    // Ends once the router drops the connection's sender on disconnect,
    // after flushing whatever is still queued
    let writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            if sink.send(Message::Text(event.to_json().into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Err(err) = state.router.handle_text(&handle, text.as_str()).await {
                    tracing::error!(%handle, error = %err, "storage failure, shutting down");
                    state.fatal.trip();
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(%handle, error = %err, "websocket read failed");
                break;
            }
        }
    }

    if let Err(err) = state.router.disconnect(&handle).await {
        tracing::error!(%handle, error = %err, "storage failure on disconnect, shutting down");
        state.fatal.trip();
    }
    if let Err(err) = writer.await {
        tracing::debug!(%handle, error = %err, "websocket writer ended abnormally");
    }
}
