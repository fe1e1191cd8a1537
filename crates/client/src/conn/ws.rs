// tokio-tungstenite transport for the session connection.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use quillpad_common::protocol::ClientFrame;

use super::EditorTransport;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Production transport over a real WebSocket.
#[derive(Default)]
pub struct WsTransport {
    stream: Option<WsStream>,
}

impl WsTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EditorTransport for WsTransport {
    async fn connect(&mut self, url: &str) -> Result<()> {
        let (stream, _response) =
            connect_async(url).await.with_context(|| format!("failed to connect to `{url}`"))?;
        self.stream = Some(stream);
        Ok(())
    }

    async fn send(&mut self, frame: &ClientFrame) -> Result<()> {
        let stream = self.stream.as_mut().context("websocket is not connected")?;
        let payload = serde_json::to_string(frame).context("failed to serialize frame")?;
        stream
            .send(Message::Text(payload.into()))
            .await
            .context("failed to send websocket message")
    }

    async fn recv(&mut self) -> Result<Option<String>> {
        let stream = self.stream.as_mut().context("websocket is not connected")?;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.to_string())),
                // Legacy peers occasionally deliver text content in
                // binary frames; decode best-effort.
                Some(Ok(Message::Binary(bytes))) => {
                    return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()));
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Err(error)) => {
                    return Err(anyhow::Error::new(error).context("websocket receive failed"));
                }
                None => return Ok(None),
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.close(None).await;
        }
    }
}
