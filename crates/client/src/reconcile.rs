// Echo-suppression reconciler: the inbound half of the session protocol.
//
// The transport broadcasts every accepted update back to its sender, so
// every inbound content payload is compared against the last-known local
// state and identical values are skipped. Skipping is what keeps a stale
// echo from stomping a newer local edit or resetting the cursor while
// the user is typing. Frames tagged with another page's id are late
// arrivals from a torn-down session and are dropped outright.

use tracing::{debug, info, warn};
use uuid::Uuid;

use quillpad_common::block::{self, BlockList, Document};
use quillpad_common::protocol::{Inbound, PageId, ServerFrame};
use quillpad_common::types::Page;

use crate::session::{SessionDescriptor, SessionMode};

/// Where the reconciler renders.
///
/// One idempotent operation per concern keeps the protocol logic
/// independent of the rendering mechanism.
pub trait EditorSurface {
    /// Re-render the whole body.
    fn apply_document(&mut self, body: &BlockList);

    /// Update the rendered title.
    fn apply_title(&mut self, title: &str);

    /// Move focus to the title field (after page creation).
    fn focus_title(&mut self);
}

/// What an inbound payload did to local state.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// The initial snapshot replaced the body.
    Initial,
    /// Remote content replaced the body.
    Content,
    /// A remote title was applied.
    Title,
    /// Our create request was acknowledged with a real page.
    PageCreated(Page),
    /// Echo, read-only, stale or unrecognized payload; nothing changed.
    Skipped,
}

/// The protocol state machine for one session.
pub struct Reconciler<S: EditorSurface> {
    surface: S,
    document: Document,
    page_id: PageId,
    block_id: Option<Uuid>,
    mode: SessionMode,
    read_only: bool,
}

impl<S: EditorSurface> Reconciler<S> {
    pub fn new(descriptor: &SessionDescriptor, surface: S) -> Self {
        Self {
            surface,
            document: Document::default(),
            page_id: descriptor.page_id.clone(),
            block_id: descriptor.block_id,
            mode: descriptor.mode,
            read_only: descriptor.read_only,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The page id frames should currently route to. Starts as the
    /// descriptor's id and flips to the real id on `page_created`.
    pub fn page_id(&self) -> &PageId {
        &self.page_id
    }

    pub fn block_id(&self) -> Option<Uuid> {
        self.block_id
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Record a locally-authored body so a later echo compares equal.
    pub fn record_local_body(&mut self, body: BlockList) {
        self.document.body = body;
    }

    /// Record a locally-authored title.
    pub fn record_local_title(&mut self, title: String) {
        self.document.title = title;
    }

    /// Apply one inbound payload to local state.
    pub fn apply(&mut self, inbound: Inbound) -> Applied {
        match inbound {
            Inbound::Frame(frame) => self.apply_frame(frame),
            Inbound::Legacy(raw) => self.apply_legacy(&raw),
            Inbound::Unknown { tag } => {
                warn!(tag, "dropping frame with unrecognized type");
                Applied::Skipped
            }
        }
    }

    fn apply_frame(&mut self, frame: ServerFrame) -> Applied {
        match frame {
            ServerFrame::InitialData { data, block_id } => self.apply_initial(data, block_id),
            ServerFrame::TextUpdate { content, block_id, page_id } => {
                self.apply_text(&content, block_id, page_id)
            }
            ServerFrame::TitleUpdate { title, page_id } => self.apply_remote_title(title, page_id),
            ServerFrame::PageCreated { original_page_id, page } => {
                self.apply_page_created(original_page_id, page)
            }
            ServerFrame::PageCreatedBroadcast { page } => {
                debug!(page_id = page.id, "another session created a page");
                Applied::Skipped
            }
        }
    }

    fn apply_initial(&mut self, data: Option<String>, block_id: Option<Uuid>) -> Applied {
        if self.mode != SessionMode::Existing {
            debug!("ignoring initial_data outside an existing-page session");
            return Applied::Skipped;
        }
        self.adopt_block_id(block_id);
        let Some(data) = data else {
            return Applied::Skipped;
        };
        // Wholesale replace; the snapshot is authoritative at join time.
        self.document.body = block::decode(&data);
        self.surface.apply_document(&self.document.body);
        Applied::Initial
    }

    fn apply_text(
        &mut self,
        content: &str,
        block_id: Option<Uuid>,
        page_id: Option<PageId>,
    ) -> Applied {
        if self.is_stale(page_id.as_ref()) {
            return Applied::Skipped;
        }
        if self.read_only {
            debug!("read-only session: ignoring remote content");
            return Applied::Skipped;
        }
        self.adopt_block_id(block_id);

        let body = block::decode(content);
        if body == self.document.body {
            // Self-echo (or a no-op duplicate). Re-rendering would reset
            // the cursor under the user's fingers.
            return Applied::Skipped;
        }
        self.document.body = body;
        self.surface.apply_document(&self.document.body);
        Applied::Content
    }

    fn apply_remote_title(&mut self, title: String, page_id: Option<PageId>) -> Applied {
        if self.is_stale(page_id.as_ref()) {
            return Applied::Skipped;
        }
        if self.read_only {
            debug!("read-only session: ignoring remote title");
            return Applied::Skipped;
        }
        // Title is small; reapplying is cheap and keeps ordering simple.
        self.document.title = title;
        self.surface.apply_title(&self.document.title);
        Applied::Title
    }

    fn apply_page_created(&mut self, original_page_id: PageId, page: Page) -> Applied {
        if self.mode != SessionMode::New {
            debug!("ignoring page_created outside a new-page session");
            return Applied::Skipped;
        }
        if original_page_id != self.page_id {
            warn!(
                original = %original_page_id,
                live = %self.page_id,
                "page_created for a different placeholder"
            );
            return Applied::Skipped;
        }

        self.page_id = PageId::Assigned(page.id);
        // Subsequent sends route to the real page.
        self.mode = SessionMode::Existing;
        self.document.title =
            if page.title.is_empty() { "Untitled".to_string() } else { page.title.clone() };
        self.surface.apply_title(&self.document.title);
        if !self.read_only {
            self.surface.focus_title();
        }
        info!(page_id = page.id, "page created for this session");
        Applied::PageCreated(page)
    }

    fn apply_legacy(&mut self, raw: &str) -> Applied {
        if self.read_only {
            return Applied::Skipped;
        }
        debug!("treating unstructured payload as legacy plain-text content");
        let body = BlockList::from_plain_text(raw);
        if body == self.document.body {
            return Applied::Skipped;
        }
        self.document.body = body;
        self.surface.apply_document(&self.document.body);
        Applied::Content
    }

    fn adopt_block_id(&mut self, block_id: Option<Uuid>) {
        if self.block_id.is_none() {
            if let Some(id) = block_id {
                debug!(%id, "adopted block id from server");
                self.block_id = Some(id);
            }
        }
    }

    fn is_stale(&self, page_id: Option<&PageId>) -> bool {
        match page_id {
            Some(id) if id != &self.page_id => {
                warn!(frame_page = %id, live_page = %self.page_id, "dropping frame for a different page");
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use quillpad_common::block::Block;
    use quillpad_common::protocol::parse_inbound;
    use quillpad_common::role::Role;

    use crate::session::SessionDescriptor;

    use super::*;

    // ── Recording surface ──────────────────────────────────────────

    #[derive(Debug, Default)]
    struct RecordingSurface {
        body_renders: u32,
        title_renders: u32,
        focus_calls: u32,
        last_body: BlockList,
        last_title: String,
    }

    impl EditorSurface for RecordingSurface {
        fn apply_document(&mut self, body: &BlockList) {
            self.body_renders += 1;
            self.last_body = body.clone();
        }

        fn apply_title(&mut self, title: &str) {
            self.title_renders += 1;
            self.last_title = title.to_string();
        }

        fn focus_title(&mut self) {
            self.focus_calls += 1;
        }
    }

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).single().expect("test timestamp should be valid")
    }

    fn server_page(id: i64, title: &str) -> Page {
        Page {
            id,
            workspace_id: 3,
            title: title.into(),
            content: None,
            parent_page_id: None,
            created_by: Some(10),
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn existing_session(page_id: i64) -> SessionDescriptor {
        let caps = Role::Editor.capabilities();
        SessionDescriptor::negotiate_at(Some(&server_page(page_id, "Notes")), 3, &caps, 1_000)
            .expect("editor session")
    }

    fn read_only_session(page_id: i64) -> SessionDescriptor {
        let caps = Role::Viewer.capabilities();
        SessionDescriptor::negotiate_at(Some(&server_page(page_id, "Notes")), 3, &caps, 1_000)
            .expect("viewer session")
    }

    fn new_session() -> SessionDescriptor {
        let caps = Role::Editor.capabilities();
        SessionDescriptor::negotiate_at(None, 3, &caps, 5).expect("new-page session")
    }

    fn body(lines: &[&str]) -> BlockList {
        BlockList { blocks: lines.iter().map(|l| Block::paragraph(l)).collect() }
    }

    fn text_update(content: &str) -> Inbound {
        Inbound::Frame(ServerFrame::TextUpdate {
            content: content.into(),
            block_id: None,
            page_id: None,
        })
    }

    // ── initial_data ───────────────────────────────────────────────

    #[test]
    fn initial_data_replaces_body_wholesale() {
        let mut rec = Reconciler::new(&existing_session(1), RecordingSurface::default());
        let frame = Inbound::Frame(ServerFrame::InitialData {
            data: Some(block::encode(&body(&["alpha", "beta"]))),
            block_id: None,
        });
        assert_eq!(rec.apply(frame), Applied::Initial);
        assert_eq!(rec.document().body, body(&["alpha", "beta"]));
        assert_eq!(rec.surface().body_renders, 1);
    }

    #[test]
    fn initial_data_is_ignored_in_new_mode() {
        let mut rec = Reconciler::new(&new_session(), RecordingSurface::default());
        let frame = Inbound::Frame(ServerFrame::InitialData {
            data: Some(block::encode(&body(&["alpha"]))),
            block_id: None,
        });
        assert_eq!(rec.apply(frame), Applied::Skipped);
        assert!(rec.document().body.is_empty());
    }

    #[test]
    fn initial_data_adopts_block_id() {
        let mut rec = Reconciler::new(&existing_session(1), RecordingSurface::default());
        let id = Uuid::new_v4();
        let frame = Inbound::Frame(ServerFrame::InitialData { data: None, block_id: Some(id) });
        rec.apply(frame);
        assert_eq!(rec.block_id(), Some(id));
    }

    // ── text_update: echo suppression ──────────────────────────────

    #[test]
    fn self_echo_does_not_rerender() {
        let mut rec = Reconciler::new(&existing_session(1), RecordingSurface::default());
        let ours = body(&["typing away"]);
        rec.record_local_body(ours.clone());

        // The server echoes our own update back.
        let applied = rec.apply(text_update(&block::encode(&ours)));
        assert_eq!(applied, Applied::Skipped);
        assert_eq!(rec.surface().body_renders, 0, "echo must not trigger a re-render");
        assert_eq!(rec.document().body, ours);
    }

    #[test]
    fn remote_change_rerenders() {
        let mut rec = Reconciler::new(&existing_session(1), RecordingSurface::default());
        rec.record_local_body(body(&["ours"]));

        let applied = rec.apply(text_update(&block::encode(&body(&["theirs"]))));
        assert_eq!(applied, Applied::Content);
        assert_eq!(rec.surface().body_renders, 1);
        assert_eq!(rec.document().body, body(&["theirs"]));
    }

    #[test]
    fn repeated_identical_updates_render_once() {
        let mut rec = Reconciler::new(&existing_session(1), RecordingSurface::default());
        let content = block::encode(&body(&["same"]));

        assert_eq!(rec.apply(text_update(&content)), Applied::Content);
        assert_eq!(rec.apply(text_update(&content)), Applied::Skipped);
        assert_eq!(rec.apply(text_update(&content)), Applied::Skipped);
        assert_eq!(rec.surface().body_renders, 1);
    }

    #[test]
    fn text_update_adopts_block_id_only_once() {
        let mut rec = Reconciler::new(&existing_session(1), RecordingSurface::default());
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        rec.apply(Inbound::Frame(ServerFrame::TextUpdate {
            content: block::encode(&body(&["a"])),
            block_id: Some(first),
            page_id: None,
        }));
        rec.apply(Inbound::Frame(ServerFrame::TextUpdate {
            content: block::encode(&body(&["b"])),
            block_id: Some(second),
            page_id: None,
        }));
        assert_eq!(rec.block_id(), Some(first));
    }

    // ── read-only suppression ──────────────────────────────────────

    #[test]
    fn read_only_ignores_remote_mutations() {
        let mut rec = Reconciler::new(&read_only_session(1), RecordingSurface::default());

        let applied = rec.apply(text_update(&block::encode(&body(&["theirs"]))));
        assert_eq!(applied, Applied::Skipped);

        let applied = rec.apply(Inbound::Frame(ServerFrame::TitleUpdate {
            title: "New title".into(),
            page_id: None,
        }));
        assert_eq!(applied, Applied::Skipped);

        assert_eq!(rec.surface().body_renders, 0);
        assert_eq!(rec.surface().title_renders, 0);
        assert!(rec.document().body.is_empty());
    }

    // ── title_update ───────────────────────────────────────────────

    #[test]
    fn title_applies_unconditionally() {
        let mut rec = Reconciler::new(&existing_session(1), RecordingSurface::default());
        rec.record_local_title("Draft".into());

        // Even an identical title re-applies; it is cheap and keeps
        // ordering simple.
        let frame =
            Inbound::Frame(ServerFrame::TitleUpdate { title: "Draft".into(), page_id: None });
        assert_eq!(rec.apply(frame), Applied::Title);
        assert_eq!(rec.surface().title_renders, 1);
        assert_eq!(rec.document().title, "Draft");
    }

    // ── page_created ───────────────────────────────────────────────

    #[test]
    fn page_created_resolves_the_placeholder() {
        let descriptor = new_session();
        let placeholder = descriptor.page_id.clone();
        let mut rec = Reconciler::new(&descriptor, RecordingSurface::default());

        let applied = rec.apply(Inbound::Frame(ServerFrame::PageCreated {
            original_page_id: placeholder,
            page: server_page(42, "Untitled"),
        }));

        assert_eq!(applied, Applied::PageCreated(server_page(42, "Untitled")));
        assert_eq!(rec.page_id(), &PageId::Assigned(42));
        assert_eq!(rec.mode(), SessionMode::Existing);
        assert_eq!(rec.document().title, "Untitled");
        assert_eq!(rec.surface().focus_calls, 1, "title field gets focus for continued editing");
    }

    #[test]
    fn page_created_for_another_placeholder_is_skipped() {
        let mut rec = Reconciler::new(&new_session(), RecordingSurface::default());

        let applied = rec.apply(Inbound::Frame(ServerFrame::PageCreated {
            original_page_id: PageId::Placeholder("new-999".into()),
            page: server_page(42, "Untitled"),
        }));
        assert_eq!(applied, Applied::Skipped);
        assert!(rec.page_id().is_placeholder());
        assert_eq!(rec.mode(), SessionMode::New);
    }

    #[test]
    fn page_created_broadcast_changes_nothing() {
        let mut rec = Reconciler::new(&existing_session(1), RecordingSurface::default());
        let applied = rec.apply(Inbound::Frame(ServerFrame::PageCreatedBroadcast {
            page: server_page(99, "Elsewhere"),
        }));
        assert_eq!(applied, Applied::Skipped);
        assert_eq!(rec.surface().body_renders + rec.surface().title_renders, 0);
    }

    // ── teardown isolation ─────────────────────────────────────────

    #[test]
    fn late_frame_for_torn_down_session_does_not_mutate() {
        // Session for page A was torn down; a session for page B is live.
        let mut rec = Reconciler::new(&existing_session(2), RecordingSurface::default());
        rec.record_local_body(body(&["page B content"]));

        // A late frame tagged with page A's id arrives out of order.
        let late = Inbound::Frame(ServerFrame::TextUpdate {
            content: block::encode(&body(&["page A leftovers"])),
            block_id: None,
            page_id: Some(PageId::Assigned(1)),
        });
        assert_eq!(rec.apply(late), Applied::Skipped);
        assert_eq!(rec.document().body, body(&["page B content"]));
        assert_eq!(rec.surface().body_renders, 0);

        // A frame tagged for page B still applies.
        let fresh = Inbound::Frame(ServerFrame::TextUpdate {
            content: block::encode(&body(&["page B update"])),
            block_id: None,
            page_id: Some(PageId::Assigned(2)),
        });
        assert_eq!(rec.apply(fresh), Applied::Content);
    }

    // ── legacy / unknown payloads ──────────────────────────────────

    #[test]
    fn legacy_text_upgrades_to_paragraph_blocks() {
        let mut rec = Reconciler::new(&existing_session(1), RecordingSurface::default());
        let applied = rec.apply(parse_inbound("line one\n\nline two"));
        assert_eq!(applied, Applied::Content);
        assert_eq!(rec.document().body, body(&["line one", "line two"]));
    }

    #[test]
    fn unknown_tag_is_logged_and_dropped() {
        let mut rec = Reconciler::new(&existing_session(1), RecordingSurface::default());
        let applied = rec.apply(parse_inbound(r#"{"type":"cursor_moved","offset":3}"#));
        assert_eq!(applied, Applied::Skipped);
        assert!(rec.document().body.is_empty());
    }
}
