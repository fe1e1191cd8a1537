// Session negotiation: fix the identity of one editing session before
// any network I/O, and gate it on the caller's workspace role.
//
// A descriptor is immutable. When the target page changes, the caller
// tears the session down and negotiates a new one — identity is never
// mutated in place.

use chrono::Utc;
use uuid::Uuid;

use quillpad_common::protocol::PageId;
use quillpad_common::role::{Capabilities, PermissionDenied};
use quillpad_common::types::Page;

/// Whether this session edits an existing page or creates a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    New,
    Existing,
}

/// Immutable identity of one editing session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDescriptor {
    pub page_id: PageId,
    pub block_id: Option<Uuid>,
    pub mode: SessionMode,
    pub read_only: bool,
    pub workspace_id: i64,
}

impl SessionDescriptor {
    /// Negotiate a session for `page` (or a new page when `None`) in
    /// `workspace_id`, gated on `caps`.
    ///
    /// Existing mode requires view access; new mode requires page
    /// creation. A denied session is cancelled here, before any
    /// connection is opened.
    pub fn negotiate(
        page: Option<&Page>,
        workspace_id: i64,
        caps: &Capabilities,
    ) -> Result<Self, PermissionDenied> {
        Self::negotiate_at(page, workspace_id, caps, Utc::now().timestamp_millis())
    }

    /// Like `negotiate` but with an explicit clock (for testing).
    pub fn negotiate_at(
        page: Option<&Page>,
        workspace_id: i64,
        caps: &Capabilities,
        now_millis: i64,
    ) -> Result<Self, PermissionDenied> {
        match page {
            Some(page) => {
                if !caps.can_view {
                    return Err(PermissionDenied::View);
                }
                Ok(Self {
                    page_id: PageId::Assigned(page.id),
                    block_id: None,
                    mode: SessionMode::Existing,
                    read_only: caps.read_only(),
                    workspace_id,
                })
            }
            None => {
                if !caps.can_create_pages {
                    return Err(PermissionDenied::CreatePages);
                }
                Ok(Self {
                    page_id: PageId::placeholder(now_millis),
                    block_id: None,
                    mode: SessionMode::New,
                    read_only: caps.read_only(),
                    workspace_id,
                })
            }
        }
    }

    pub fn is_new(&self) -> bool {
        self.mode == SessionMode::New
    }
}

/// Tracks an unacknowledged create request in new-page mode, so rapid
/// title keystrokes issue exactly one `create_page`.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCreation {
    placeholder: PageId,
}

impl PendingCreation {
    pub fn new(placeholder: PageId) -> Self {
        Self { placeholder }
    }

    /// Whether a `page_created` ack for `original_page_id` resolves
    /// this record.
    pub fn resolves(&self, original_page_id: &PageId) -> bool {
        &self.placeholder == original_page_id
    }
}
