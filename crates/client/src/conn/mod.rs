// Session connection manager: one WebSocket per editing session.
//
// Owns connect / join / send / recv / close for a single session, plus
// the capped-backoff reconnect policy. A connection is never shared
// across sessions and never reused across a page-identity change.
//
// Transport is abstracted via `EditorTransport` for testability.
// The tokio-tungstenite implementation lives in the `ws` module.

pub mod ws;

use std::net::IpAddr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use quillpad_common::protocol::{parse_inbound, ClientFrame, Inbound, PageId};

// ── Reconnect policy ────────────────────────────────────────────────

/// Reconnection parameters. The delay doubles per consecutive failure,
/// bounded by `max_delay`; after `max_attempts` failures the connection
/// stays down until the session is torn down and recreated.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            max_attempts: 5,
        }
    }
}

// ── Transport trait ─────────────────────────────────────────────────

/// Abstraction over the wire for testability.
///
/// Production uses tokio-tungstenite (`ws::WsTransport`); tests use a
/// scripted mock that records sent frames.
#[allow(async_fn_in_trait)]
pub trait EditorTransport {
    /// Open the socket to `url`.
    async fn connect(&mut self, url: &str) -> Result<()>;

    /// Send one frame.
    async fn send(&mut self, frame: &ClientFrame) -> Result<()>;

    /// Receive the next text payload. Returns `None` on clean close.
    async fn recv(&mut self) -> Result<Option<String>>;

    /// Close the socket.
    async fn close(&mut self);
}

// ── Connection state ────────────────────────────────────────────────

/// Lifecycle state of the session connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
    Errored,
}

// ── Join identity ───────────────────────────────────────────────────

/// What the join frame announces: the session identity as currently
/// known. Reconnects rejoin with the latest ids, which may differ from
/// the descriptor's after the server assigned a block or a real page.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinIdentity {
    pub page_id: PageId,
    pub block_id: Option<Uuid>,
    pub is_new_page: bool,
}

impl JoinIdentity {
    fn join_frame(&self) -> ClientFrame {
        ClientFrame::Join {
            page_id: self.page_id.clone(),
            block_id: self.block_id,
            is_new_page: self.is_new_page,
        }
    }
}

// ── Connection ──────────────────────────────────────────────────────

/// One live connection for one session.
pub struct SessionConnection<T: EditorTransport> {
    url: String,
    transport: T,
    state: ConnectionState,
    policy: ReconnectPolicy,
    consecutive_failures: u32,
}

impl<T: EditorTransport> SessionConnection<T> {
    pub fn new(url: impl Into<String>, transport: T) -> Self {
        Self {
            url: url.into(),
            transport,
            state: ConnectionState::Closed,
            policy: ReconnectPolicy::default(),
            consecutive_failures: 0,
        }
    }

    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Open the socket and send the join frame for `identity`.
    ///
    /// At most one connection is open per session; opening twice
    /// without a close in between is a caller error.
    pub async fn open(&mut self, identity: &JoinIdentity) -> Result<()> {
        if self.state == ConnectionState::Open {
            return Err(anyhow!("connection is already open"));
        }
        validate_sync_url(&self.url)?;
        self.state = ConnectionState::Connecting;

        if let Err(error) = self.transport.connect(&self.url).await {
            self.state = ConnectionState::Errored;
            self.consecutive_failures += 1;
            return Err(error.context("websocket connection failed"));
        }

        if let Err(error) = self.transport.send(&identity.join_frame()).await {
            self.transport.close().await;
            self.state = ConnectionState::Errored;
            self.consecutive_failures += 1;
            return Err(error.context("failed to send join frame"));
        }

        self.state = ConnectionState::Open;
        self.consecutive_failures = 0;
        info!(page_id = %identity.page_id, is_new_page = identity.is_new_page, "editing session joined");
        Ok(())
    }

    /// Send one frame. Calling this while the connection is not open is
    /// a caller error, surfaced rather than silently retried.
    pub async fn send(&mut self, frame: &ClientFrame) -> Result<()> {
        if self.state != ConnectionState::Open {
            return Err(anyhow!("cannot send: connection is {:?}", self.state));
        }
        if let Err(error) = self.transport.send(frame).await {
            self.state = ConnectionState::Errored;
            self.consecutive_failures += 1;
            return Err(error.context("failed to send frame"));
        }
        Ok(())
    }

    /// Receive and classify the next inbound payload. `None` means the
    /// server closed the connection.
    pub async fn recv(&mut self) -> Result<Option<Inbound>> {
        if self.state != ConnectionState::Open {
            return Err(anyhow!("cannot receive: connection is {:?}", self.state));
        }
        match self.transport.recv().await {
            Ok(Some(raw)) => Ok(Some(parse_inbound(&raw))),
            Ok(None) => {
                self.state = ConnectionState::Closed;
                warn!("connection closed by server");
                Ok(None)
            }
            Err(error) => {
                self.state = ConnectionState::Errored;
                self.consecutive_failures += 1;
                Err(error.context("transport error while receiving"))
            }
        }
    }

    /// Close the connection.
    pub async fn close(&mut self) {
        self.transport.close().await;
        self.state = ConnectionState::Closed;
    }

    /// Backoff before the next reconnect attempt.
    pub fn reconnect_delay(&self) -> Duration {
        let exp = self.consecutive_failures.min(6);
        let delay = self.policy.base_delay.saturating_mul(1u32 << exp);
        delay.min(self.policy.max_delay)
    }

    /// Whether another reconnect attempt is allowed under the policy.
    pub fn should_reconnect(&self) -> bool {
        self.consecutive_failures < self.policy.max_attempts
    }
}

fn validate_sync_url(value: &str) -> Result<()> {
    let parsed = Url::parse(value).with_context(|| format!("invalid sync url `{value}`"))?;
    match parsed.scheme() {
        "wss" => Ok(()),
        "ws" if is_loopback_host(parsed.host_str()) => Ok(()),
        _ => Err(anyhow!("sync url must use wss (ws is allowed only for localhost testing)")),
    }
}

fn is_loopback_host(host: Option<&str>) -> bool {
    let Some(host) = host else {
        return false;
    };
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.parse::<IpAddr>().is_ok_and(|addr| addr.is_loopback())
}
