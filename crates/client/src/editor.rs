// The editing session driver.
//
// Composes the negotiated descriptor, the connection, the reconciler
// and the outbound debouncer into one live page editor. Local edits
// come in through `edit_content`/`edit_title` (or the `next_event`
// loop), remote frames leave through the reconciler, and the pending-
// creation record keeps the create-page-on-first-keystroke race to a
// single request.

use std::time::Instant;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use quillpad_common::block::{BlockList, Document};
use quillpad_common::protocol::{ClientFrame, Inbound};
use quillpad_common::types::Page;

use crate::conn::{EditorTransport, JoinIdentity, SessionConnection};
use crate::outbound::{DebounceConfig, UpdateDebouncer};
use crate::reconcile::{Applied, EditorSurface, Reconciler};
use crate::session::{PendingCreation, SessionDescriptor, SessionMode};

/// What the session loop observed.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A remote payload was applied (or skipped).
    Remote(Applied),
    /// A local input line arrived; the caller interprets it.
    Input(String),
    /// Debounced updates were flushed to the wire.
    Flushed,
    /// The connection dropped; collaboration is frozen until a
    /// reconnect succeeds or the session is torn down.
    Disconnected,
    /// The local input stream ended; tear the session down.
    InputClosed,
}

/// One live editing session over one connection.
pub struct EditorSession<T: EditorTransport, S: EditorSurface> {
    descriptor: SessionDescriptor,
    conn: SessionConnection<T>,
    reconciler: Reconciler<S>,
    outbound: UpdateDebouncer,
    pending_creation: Option<PendingCreation>,
    created_page: Option<Page>,
    user_id: Option<i64>,
}

impl<T: EditorTransport, S: EditorSurface> EditorSession<T, S> {
    pub fn new(
        descriptor: SessionDescriptor,
        sync_url: impl Into<String>,
        transport: T,
        surface: S,
        debounce: DebounceConfig,
        user_id: Option<i64>,
    ) -> Self {
        let conn = SessionConnection::new(sync_url, transport);
        let outbound = UpdateDebouncer::new(debounce, descriptor.read_only);
        let reconciler = Reconciler::new(&descriptor, surface);
        Self {
            descriptor,
            conn,
            reconciler,
            outbound,
            pending_creation: None,
            created_page: None,
            user_id,
        }
    }

    pub fn descriptor(&self) -> &SessionDescriptor {
        &self.descriptor
    }

    pub fn read_only(&self) -> bool {
        self.descriptor.read_only
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    pub fn document(&self) -> &Document {
        self.reconciler.document()
    }

    /// The page the server materialized for this session, if any.
    pub fn created_page(&self) -> Option<&Page> {
        self.created_page.as_ref()
    }

    pub fn connection(&self) -> &SessionConnection<T> {
        &self.conn
    }

    fn join_identity(&self) -> JoinIdentity {
        JoinIdentity {
            page_id: self.reconciler.page_id().clone(),
            block_id: self.reconciler.block_id(),
            is_new_page: self.reconciler.mode() == SessionMode::New,
        }
    }

    /// Open the connection and join the session.
    pub async fn open(&mut self) -> Result<()> {
        let identity = self.join_identity();
        self.conn.open(&identity).await
    }

    /// Reconnect with capped exponential backoff, rejoining with the
    /// session's current identity. Returns false once attempts run out.
    pub async fn reconnect_with_backoff(&mut self) -> bool {
        while self.conn.should_reconnect() {
            let delay = self.conn.reconnect_delay();
            debug!(?delay, "waiting before reconnect attempt");
            sleep(delay).await;
            let identity = self.join_identity();
            match self.conn.open(&identity).await {
                Ok(()) => {
                    info!("reconnected");
                    return true;
                }
                Err(error) => warn!(error = %error, "reconnect attempt failed"),
            }
        }
        false
    }

    /// Fold a locally-authored body change into the session.
    pub fn edit_content(&mut self, body: BlockList) {
        if self.descriptor.read_only {
            debug!("read-only session: dropping local content edit");
            return;
        }
        self.reconciler.record_local_body(body.clone());
        self.outbound.push_content(&body);
    }

    /// Fold a local title keystroke into the session. In new-page mode
    /// the first keystroke asks the server to materialize the page;
    /// repeats are guarded by the pending-creation record.
    pub async fn edit_title(&mut self, title: &str) -> Result<()> {
        if self.descriptor.read_only {
            debug!("read-only session: dropping local title edit");
            return Ok(());
        }
        self.reconciler.record_local_title(title.to_string());
        self.ensure_page_created().await?;

        // Title updates only route once the page has a real id.
        if !self.reconciler.page_id().is_placeholder() {
            self.outbound.push_title(if title.is_empty() { "Untitled" } else { title });
        }
        Ok(())
    }

    async fn ensure_page_created(&mut self) -> Result<()> {
        if self.reconciler.mode() != SessionMode::New || self.pending_creation.is_some() {
            return Ok(());
        }
        if !self.conn.is_connected() {
            debug!("not connected; deferring page creation");
            return Ok(());
        }

        let placeholder = self.reconciler.page_id().clone();
        let frame = ClientFrame::CreatePage {
            title: "Untitled".to_string(),
            workspace_id: self.descriptor.workspace_id,
            page_id: placeholder.clone(),
            created_by: self.user_id,
            parent_page_id: None,
        };
        self.conn.send(&frame).await?;
        // Set only after the send succeeded, so a failed request can be
        // retried by the next keystroke.
        self.pending_creation = Some(PendingCreation::new(placeholder));
        Ok(())
    }

    /// Send debounced updates that are due. While disconnected, sends
    /// stay disabled and pending updates are kept.
    pub async fn flush_due(&mut self) -> Result<()> {
        if !self.conn.is_connected() {
            return Ok(());
        }
        let frames =
            self.outbound.drain_ready(self.reconciler.page_id(), self.reconciler.block_id());
        for frame in frames {
            self.conn.send(&frame).await?;
        }
        Ok(())
    }

    /// When the next debounced update becomes due.
    pub fn next_flush_deadline(&self) -> Option<Instant> {
        self.outbound.next_deadline()
    }

    /// Receive and apply the next inbound payload.
    /// `Ok(None)` means the server closed the connection.
    pub async fn next_inbound(&mut self) -> Result<Option<Applied>> {
        let Some(inbound) = self.conn.recv().await? else {
            return Ok(None);
        };
        Ok(Some(self.apply_inbound(inbound)))
    }

    fn apply_inbound(&mut self, inbound: Inbound) -> Applied {
        let applied = self.reconciler.apply(inbound);
        if let Applied::PageCreated(page) = &applied {
            self.pending_creation = None;
            self.created_page = Some(page.clone());
        }
        applied
    }

    /// Wait for the next thing the session loop should handle: an
    /// inbound payload, a local input line, or a due flush.
    ///
    /// Transport failures surface as `Disconnected` (with the error
    /// logged), matching the freeze-until-reconnect error model.
    pub async fn next_event(&mut self, input: &mut mpsc::Receiver<String>) -> Result<SessionEvent> {
        if !self.conn.is_connected() {
            // Frozen: only local input can arrive.
            return Ok(match input.recv().await {
                Some(line) => SessionEvent::Input(line),
                None => SessionEvent::InputClosed,
            });
        }

        enum Raced {
            Inbound(Result<Option<Inbound>>),
            Input(Option<String>),
            Flush,
        }

        let deadline = self.outbound.next_deadline();
        let raced = tokio::select! {
            inbound = self.conn.recv() => Raced::Inbound(inbound),
            line = input.recv() => Raced::Input(line),
            _ = flush_timer(deadline) => Raced::Flush,
        };

        match raced {
            Raced::Inbound(Ok(Some(inbound))) => {
                Ok(SessionEvent::Remote(self.apply_inbound(inbound)))
            }
            Raced::Inbound(Ok(None)) => Ok(SessionEvent::Disconnected),
            Raced::Inbound(Err(error)) => {
                warn!(error = %error, "transport error; collaboration frozen");
                Ok(SessionEvent::Disconnected)
            }
            Raced::Input(Some(line)) => Ok(SessionEvent::Input(line)),
            Raced::Input(None) => Ok(SessionEvent::InputClosed),
            Raced::Flush => {
                if let Err(error) = self.flush_due().await {
                    warn!(error = %error, "flush failed; collaboration frozen");
                    return Ok(SessionEvent::Disconnected);
                }
                Ok(SessionEvent::Flushed)
            }
        }
    }

    /// Tear the session down: close the connection and discard the
    /// in-flight creation record and any pending sends.
    pub async fn close(&mut self) {
        self.conn.close().await;
        self.pending_creation = None;
        self.outbound.clear();
    }
}

async fn flush_timer(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}
