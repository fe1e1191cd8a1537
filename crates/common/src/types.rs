// Core domain types shared across all Quillpad crates.
//
// These mirror the REST collaborator's wire shapes, which use camelCase
// member names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::role::Role;

/// An authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A workspace is a top-level container for related pages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Membership record tying a user to a workspace with a role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMember {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

/// The workspaces visible to the caller, split by ownership.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceList {
    #[serde(default)]
    pub owned: Vec<Workspace>,
    #[serde(default)]
    pub shared: Vec<Workspace>,
}

impl WorkspaceList {
    /// Look a workspace up by id across both ownership buckets.
    pub fn find(&self, id: i64) -> Option<&Workspace> {
        self.owned.iter().chain(self.shared.iter()).find(|w| w.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.owned.is_empty() && self.shared.is_empty()
    }
}

/// A pending invitation to join a workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: i64,
    pub workspace_id: i64,
    pub workspace_name: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

/// A page within a workspace.
///
/// `content` is the codec's wire string (see `crate::block`); the server
/// stores it opaquely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: i64,
    pub workspace_id: i64,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub parent_page_id: Option<i64>,
    #[serde(default)]
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
