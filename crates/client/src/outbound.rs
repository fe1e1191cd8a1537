// Outbound update debouncer.
//
// Coalesces rapid local edits within a configurable window (default
// 300ms), last value wins per update kind. Pushes are a no-op for
// read-only sessions. Frames pick up the session's current page and
// block ids at drain time, so routing survives page creation.

use std::time::{Duration, Instant};

use tracing::debug;
use uuid::Uuid;

use quillpad_common::block::{self, BlockList};
use quillpad_common::protocol::{ClientFrame, PageId};

/// Default coalescing window.
const DEFAULT_DEBOUNCE_MS: u64 = 300;
/// Maximum allowed window.
const MAX_DEBOUNCE_MS: u64 = 2_000;

/// Configuration for the debouncer.
#[derive(Debug, Clone)]
pub struct DebounceConfig {
    pub window: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self { window: Duration::from_millis(DEFAULT_DEBOUNCE_MS) }
    }
}

impl DebounceConfig {
    /// Window in milliseconds, capped at 2000. Zero disables coalescing
    /// (every edit drains immediately).
    pub fn with_millis(ms: u64) -> Self {
        Self { window: Duration::from_millis(ms.min(MAX_DEBOUNCE_MS)) }
    }
}

struct PendingUpdate {
    value: String,
    last_seen: Instant,
}

/// Coalesces local edits into rate-limited outbound frames.
///
/// Call `push_content`/`push_title` on each local edit, then
/// `drain_ready` periodically to collect frames whose window elapsed.
pub struct UpdateDebouncer {
    config: DebounceConfig,
    read_only: bool,
    content: Option<PendingUpdate>,
    title: Option<PendingUpdate>,
}

impl UpdateDebouncer {
    pub fn new(config: DebounceConfig, read_only: bool) -> Self {
        Self { config, read_only, content: None, title: None }
    }

    /// Record a local body edit. Last value wins; the timer resets.
    pub fn push_content(&mut self, body: &BlockList) {
        self.push_content_at(body, Instant::now());
    }

    fn push_content_at(&mut self, body: &BlockList, now: Instant) {
        if self.read_only {
            debug!("read-only session: suppressing outbound content update");
            return;
        }
        self.content = Some(PendingUpdate { value: block::encode(body), last_seen: now });
    }

    /// Record a local title edit. Last value wins; the timer resets.
    pub fn push_title(&mut self, title: &str) {
        self.push_title_at(title, Instant::now());
    }

    fn push_title_at(&mut self, title: &str, now: Instant) {
        if self.read_only {
            debug!("read-only session: suppressing outbound title update");
            return;
        }
        self.title = Some(PendingUpdate { value: title.to_string(), last_seen: now });
    }

    /// Drain updates whose window has elapsed, as frames routed with the
    /// session's current ids.
    pub fn drain_ready(&mut self, page_id: &PageId, block_id: Option<Uuid>) -> Vec<ClientFrame> {
        self.drain_ready_at(page_id, block_id, Instant::now())
    }

    fn drain_ready_at(
        &mut self,
        page_id: &PageId,
        block_id: Option<Uuid>,
        now: Instant,
    ) -> Vec<ClientFrame> {
        let window = self.config.window;
        let mut ready = Vec::new();

        if let Some(pending) = self.content.take_if(|p| now.duration_since(p.last_seen) >= window) {
            ready.push(ClientFrame::TextUpdate {
                content: pending.value,
                page_id: page_id.clone(),
                block_id,
            });
        }
        if let Some(pending) = self.title.take_if(|p| now.duration_since(p.last_seen) >= window) {
            ready.push(ClientFrame::TitleUpdate {
                title: pending.value,
                page_id: page_id.clone(),
                block_id,
            });
        }

        ready
    }

    /// Number of update kinds still waiting in the window.
    pub fn pending_count(&self) -> usize {
        usize::from(self.content.is_some()) + usize::from(self.title.is_some())
    }

    /// When the earliest pending update becomes ready, or None if idle.
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.content.as_ref(), self.title.as_ref()]
            .into_iter()
            .flatten()
            .map(|p| p.last_seen + self.config.window)
            .min()
    }

    /// Discard everything pending (session teardown).
    pub fn clear(&mut self) {
        self.content = None;
        self.title = None;
    }
}

#[cfg(test)]
mod tests {
    use quillpad_common::block::Block;

    use super::*;

    fn body(text: &str) -> BlockList {
        BlockList { blocks: vec![Block::paragraph(text)] }
    }

    fn page_id() -> PageId {
        PageId::Assigned(7)
    }

    // ── Config ─────────────────────────────────────────────────────

    #[test]
    fn default_window_is_300ms() {
        assert_eq!(DebounceConfig::default().window, Duration::from_millis(300));
    }

    #[test]
    fn window_caps_at_two_seconds() {
        assert_eq!(DebounceConfig::with_millis(10_000).window, Duration::from_millis(2_000));
        assert_eq!(DebounceConfig::with_millis(150).window, Duration::from_millis(150));
    }

    // ── Coalescing ─────────────────────────────────────────────────

    #[test]
    fn rapid_content_edits_coalesce_last_wins() {
        let mut debouncer = UpdateDebouncer::new(DebounceConfig::default(), false);
        let now = Instant::now();

        debouncer.push_content_at(&body("a"), now);
        debouncer.push_content_at(&body("ab"), now + Duration::from_millis(50));
        debouncer.push_content_at(&body("abc"), now + Duration::from_millis(100));
        assert_eq!(debouncer.pending_count(), 1);

        // Not ready 200ms after the last push... (window is 300ms)
        let ready = debouncer.drain_ready_at(&page_id(), None, now + Duration::from_millis(300));
        assert!(ready.is_empty());

        // ...ready at 400ms.
        let ready = debouncer.drain_ready_at(&page_id(), None, now + Duration::from_millis(400));
        assert_eq!(ready.len(), 1);
        match &ready[0] {
            ClientFrame::TextUpdate { content, .. } => {
                assert_eq!(content, &block::encode(&body("abc")), "last value wins");
            }
            other => panic!("expected text_update, got {other:?}"),
        }
        assert_eq!(debouncer.pending_count(), 0);
    }

    #[test]
    fn content_and_title_are_tracked_independently() {
        let mut debouncer = UpdateDebouncer::new(DebounceConfig::default(), false);
        let now = Instant::now();

        debouncer.push_content_at(&body("text"), now);
        debouncer.push_title_at("Title", now + Duration::from_millis(200));
        assert_eq!(debouncer.pending_count(), 2);

        // At 300ms only the content window has elapsed.
        let ready = debouncer.drain_ready_at(&page_id(), None, now + Duration::from_millis(300));
        assert_eq!(ready.len(), 1);
        assert!(matches!(ready[0], ClientFrame::TextUpdate { .. }));

        // At 500ms the title follows.
        let ready = debouncer.drain_ready_at(&page_id(), None, now + Duration::from_millis(500));
        assert_eq!(ready.len(), 1);
        assert!(matches!(ready[0], ClientFrame::TitleUpdate { .. }));
    }

    #[test]
    fn zero_window_drains_immediately() {
        let mut debouncer = UpdateDebouncer::new(DebounceConfig::with_millis(0), false);
        let now = Instant::now();

        debouncer.push_title_at("T", now);
        let ready = debouncer.drain_ready_at(&page_id(), None, now);
        assert_eq!(ready.len(), 1);
    }

    // ── Read-only suppression ──────────────────────────────────────

    #[test]
    fn read_only_pushes_are_no_ops() {
        let mut debouncer = UpdateDebouncer::new(DebounceConfig::with_millis(0), true);
        let now = Instant::now();

        debouncer.push_content_at(&body("x"), now);
        debouncer.push_title_at("T", now);
        assert_eq!(debouncer.pending_count(), 0);
        assert!(debouncer.drain_ready_at(&page_id(), None, now).is_empty());
    }

    // ── Routing ids ────────────────────────────────────────────────

    #[test]
    fn frames_carry_ids_current_at_drain_time() {
        let mut debouncer = UpdateDebouncer::new(DebounceConfig::with_millis(0), false);
        let now = Instant::now();
        let block = Uuid::new_v4();

        // Pushed while the page was still a placeholder...
        debouncer.push_content_at(&body("x"), now);

        // ...drained after creation assigned the real ids.
        let ready = debouncer.drain_ready_at(&PageId::Assigned(42), Some(block), now);
        match &ready[0] {
            ClientFrame::TextUpdate { page_id, block_id, .. } => {
                assert_eq!(page_id, &PageId::Assigned(42));
                assert_eq!(block_id, &Some(block));
            }
            other => panic!("expected text_update, got {other:?}"),
        }
    }

    // ── Drain behavior ─────────────────────────────────────────────

    #[test]
    fn drain_is_idempotent() {
        let mut debouncer = UpdateDebouncer::new(DebounceConfig::default(), false);
        let now = Instant::now();

        debouncer.push_title_at("T", now);
        let later = now + Duration::from_millis(400);
        assert_eq!(debouncer.drain_ready_at(&page_id(), None, later).len(), 1);
        assert!(debouncer.drain_ready_at(&page_id(), None, later).is_empty());
    }

    #[test]
    fn next_deadline_tracks_earliest_pending() {
        let mut debouncer = UpdateDebouncer::new(DebounceConfig::default(), false);
        assert!(debouncer.next_deadline().is_none());

        let now = Instant::now();
        debouncer.push_content_at(&body("x"), now);
        debouncer.push_title_at("T", now + Duration::from_millis(100));
        assert_eq!(debouncer.next_deadline(), Some(now + Duration::from_millis(300)));
    }

    #[test]
    fn clear_discards_pending_updates() {
        let mut debouncer = UpdateDebouncer::new(DebounceConfig::with_millis(0), false);
        let now = Instant::now();

        debouncer.push_content_at(&body("x"), now);
        debouncer.push_title_at("T", now);
        debouncer.clear();
        assert_eq!(debouncer.pending_count(), 0);
        assert!(debouncer.drain_ready_at(&page_id(), None, now).is_empty());
    }
}
