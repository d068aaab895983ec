// WebSocket transport for the telemetry stream
use crate::application::supervisor::{FrameStream, TelemetryConnector};
use anyhow::Context;
use async_trait::async_trait;
use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl TelemetryConnector for WebSocketConnector {
    async fn connect(&self) -> anyhow::Result<FrameStream> {
        let (socket, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .with_context(|| format!("Failed to connect to telemetry stream at {}", self.url))?;

        // Only text frames carry snapshots; control and binary frames are dropped.
        let frames = socket.filter_map(|message| async move {
            match message {
                Ok(Message::Text(text)) => Some(Ok(text)),
                Ok(_) => None,
                Err(e) => Some(Err(anyhow::Error::new(e).context("telemetry stream read failed"))),
            }
        });
        Ok(frames.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ws::{Message as WsMessage, WebSocketUpgrade};
    use axum::routing::get;
    use axum::Router;

    #[tokio::test]
    async fn test_yields_text_frames_until_close() {
        let router = Router::new().route(
            "/",
            get(|ws: WebSocketUpgrade| async move {
                ws.on_upgrade(|mut socket| async move {
                    let _ = socket.send(WsMessage::Text("first".to_string())).await;
                    let _ = socket.send(WsMessage::Binary(vec![1, 2, 3])).await;
                    let _ = socket.send(WsMessage::Text("second".to_string())).await;
                    let _ = socket.send(WsMessage::Close(None)).await;
                })
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let connector = WebSocketConnector::new(format!("ws://{addr}/"));
        let mut stream = connector.connect().await.unwrap();
        let mut frames = Vec::new();
        while let Some(Ok(frame)) = stream.next().await {
            frames.push(frame);
        }

        assert_eq!(frames, vec!["first".to_string(), "second".to_string()]);
    }

    #[tokio::test]
    async fn test_connect_failure_is_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = WebSocketConnector::new(format!("ws://{addr}/"))
            .connect()
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("Failed to connect"));
    }
}
