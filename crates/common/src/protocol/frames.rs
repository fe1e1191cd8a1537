// Frame types for the page-sync WebSocket protocol.
//
// Frames are JSON objects tagged by a `type` field, with camelCase
// member names on the wire. The server broadcasts every accepted update
// back to its sender, so clients must expect their own frames to come
// back (see the reconciler in quillpad-client).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::types::Page;

/// Identity of a page on the wire: a stable numeric id once the page
/// exists, or a `new-<millis>` placeholder before creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum PageId {
    Assigned(i64),
    Placeholder(String),
}

impl PageId {
    /// Placeholder id for a not-yet-created page. `millis` makes it
    /// unique enough to disambiguate within one process lifetime.
    pub fn placeholder(millis: i64) -> Self {
        Self::Placeholder(format!("new-{millis}"))
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assigned(id) => write!(f, "{id}"),
            Self::Placeholder(s) => f.write_str(s),
        }
    }
}

impl From<i64> for PageId {
    fn from(id: i64) -> Self {
        Self::Assigned(id)
    }
}

/// Client → server frames.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    /// Initial handshake: attach this connection to a page/block session.
    Join {
        page_id: PageId,
        block_id: Option<Uuid>,
        is_new_page: bool,
    },

    /// Whole-body content update.
    TextUpdate {
        content: String,
        page_id: PageId,
        block_id: Option<Uuid>,
    },

    /// Title update.
    TitleUpdate {
        title: String,
        page_id: PageId,
        block_id: Option<Uuid>,
    },

    /// Ask the server to materialize a real page for a placeholder id.
    CreatePage {
        title: String,
        workspace_id: i64,
        page_id: PageId,
        created_by: Option<i64>,
        parent_page_id: Option<i64>,
    },
}

/// Server → client frames.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    /// Snapshot of the page body, sent right after a join.
    InitialData {
        data: Option<String>,
        #[serde(default)]
        block_id: Option<Uuid>,
    },

    /// A peer's (or our own echoed) content update.
    TextUpdate {
        content: String,
        #[serde(default)]
        block_id: Option<Uuid>,
        #[serde(default)]
        page_id: Option<PageId>,
    },

    /// A peer's (or our own echoed) title update.
    TitleUpdate {
        title: String,
        #[serde(default)]
        page_id: Option<PageId>,
    },

    /// The server materialized the page this session asked to create.
    PageCreated {
        original_page_id: PageId,
        page: Page,
    },

    /// Another session created an unrelated page.
    PageCreatedBroadcast { page: Page },
}

/// One inbound payload after best-effort classification.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A well-formed protocol frame.
    Frame(ServerFrame),
    /// Valid JSON carrying a `type` tag this client does not know
    /// (or a known tag with a malformed body). Callers log and drop.
    Unknown { tag: String },
    /// Anything else. Legacy peers send raw text content.
    Legacy(String),
}

/// Classify one incoming text payload.
pub fn parse_inbound(raw: &str) -> Inbound {
    if let Ok(frame) = serde_json::from_str::<ServerFrame>(raw) {
        return Inbound::Frame(frame);
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
        if let Some(Value::String(tag)) = map.get("type") {
            return Inbound::Unknown { tag: tag.clone() };
        }
    }
    Inbound::Legacy(raw.to_string())
}
