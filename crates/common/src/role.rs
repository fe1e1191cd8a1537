// Workspace roles and the capability set derived from them.
//
// A caller is Owner of a workspace when `workspace.owner_id` matches;
// otherwise the membership row decides. No row means no capabilities.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{User, Workspace, WorkspaceMember};

/// A caller's role within a workspace.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Editor,
    Viewer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Editor => "editor",
            Self::Viewer => "viewer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "owner" => Some(Self::Owner),
            "editor" => Some(Self::Editor),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }

    /// The capability set this role grants.
    pub fn capabilities(self) -> Capabilities {
        match self {
            Self::Owner => Capabilities {
                can_view: true,
                can_edit: true,
                can_delete: true,
                can_create_pages: true,
                can_manage_members: true,
                can_delete_workspace: true,
            },
            Self::Editor => Capabilities {
                can_view: true,
                can_edit: true,
                can_delete: true,
                can_create_pages: true,
                can_manage_members: false,
                can_delete_workspace: false,
            },
            Self::Viewer => Capabilities { can_view: true, ..Capabilities::none() },
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller may do in a workspace.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capabilities {
    pub can_view: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_create_pages: bool,
    pub can_manage_members: bool,
    pub can_delete_workspace: bool,
}

impl Capabilities {
    /// No capabilities at all (caller has no role in the workspace).
    pub fn none() -> Self {
        Self::default()
    }

    /// A session is read-only exactly when the caller cannot edit.
    pub fn read_only(&self) -> bool {
        !self.can_edit
    }
}

/// Resolve a user's role in a workspace: ownership outranks any
/// membership row.
pub fn resolve_role(
    user: &User,
    workspace: &Workspace,
    members: &[WorkspaceMember],
) -> Option<Role> {
    if workspace.owner_id == user.id {
        return Some(Role::Owner);
    }
    members.iter().find(|m| m.user_id == user.id).map(|m| m.role)
}

/// Why the permission gate cancelled a session.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PermissionDenied {
    #[error("you don't have permission to view this page")]
    View,
    #[error("you don't have permission to edit this page")]
    Edit,
    #[error("you don't have permission to create pages")]
    CreatePages,
}
