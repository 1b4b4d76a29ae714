//! Transport for the real-time channel
//!
//! [`SyncTransport`] opens connections; [`SyncConnection`] yields text
//! frames until the peer goes away. The production implementation speaks
//! WebSocket through `tokio-tungstenite`.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::{ClientError, ClientResult};

/// Opens connections to the push server
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn connect(&self) -> ClientResult<Box<dyn SyncConnection>>;
}

/// An open push connection
#[async_trait]
pub trait SyncConnection: Send {
    /// Next text frame, or `None` once the connection is closed
    async fn next_frame(&mut self) -> Option<ClientResult<String>>;
}

/// WebSocket transport
#[derive(Debug, Clone)]
pub struct WsTransport {
    url: String,
}

impl WsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SyncTransport for WsTransport {
    async fn connect(&self) -> ClientResult<Box<dyn SyncConnection>> {
        let (stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ClientError::Network(format!("WebSocket connect to {} failed: {}", self.url, e)))?;

        tracing::debug!(url = %self.url, "WebSocket connected");
        Ok(Box::new(WsConnection { stream }))
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl SyncConnection for WsConnection {
    async fn next_frame(&mut self) -> Option<ClientResult<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => {
                        tracing::debug!("Ignoring non-UTF-8 binary frame");
                        continue;
                    }
                },
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "WebSocket closed by server");
                    return None;
                }
                // Pings are answered by tungstenite itself
                Ok(_) => continue,
                Err(e) => return Some(Err(ClientError::Network(e.to_string()))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ws::{Message as AxumMessage, WebSocket, WebSocketUpgrade};
    use axum::response::Response;
    use axum::routing::get;
    use axum::Router;

    async fn push_counts(ws: WebSocketUpgrade) -> Response {
        ws.on_upgrade(|mut socket: WebSocket| async move {
            let frames = [
                r#"{"type":"connected","connectionId":"c1"}"#,
                r#"{"type":"attendeeCountUpdated","eventId":"e1","peopleAttend":3}"#,
            ];
            for frame in frames {
                if socket.send(AxumMessage::Text(frame.to_string())).await.is_err() {
                    return;
                }
            }
            let _ = socket.send(AxumMessage::Close(None)).await;
        })
    }

    async fn serve() -> String {
        let app = Router::new().route("/ws", get(push_counts));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("ws://{}/ws", addr)
    }

    #[tokio::test]
    async fn test_ws_transport_reads_text_frames_until_close() {
        let transport = WsTransport::new(serve().await);
        let mut connection = transport.connect().await.unwrap();

        let first = connection.next_frame().await.unwrap().unwrap();
        assert!(first.contains("connected"));
        let second = connection.next_frame().await.unwrap().unwrap();
        assert!(second.contains("peopleAttend"));
        assert!(connection.next_frame().await.is_none());
    }

    #[tokio::test]
    async fn test_ws_transport_connect_failure_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = WsTransport::new(format!("ws://{}/ws", addr));
        let err = transport.connect().await.err().unwrap();
        assert!(matches!(err, ClientError::Network(_)));
    }
}
