// Application context: the workspace/user/invitation state shared by
// every screen, constructed explicitly and passed by reference — not an
// ambient singleton.
//
// Initialization order: current user first, then workspaces and pending
// invitations; the member list refreshes whenever the active workspace
// changes. Logout clears every field even when the API call fails.

use anyhow::{bail, Context, Result};
use tracing::warn;

use quillpad_common::role::{resolve_role, Capabilities, Role};
use quillpad_common::types::{Invitation, User, Workspace, WorkspaceList, WorkspaceMember};

use crate::api::DirectoryApi;

#[derive(Debug, Default)]
pub struct AppContext {
    current_user: Option<User>,
    workspaces: WorkspaceList,
    active_workspace: Option<Workspace>,
    workspace_members: Vec<WorkspaceMember>,
    pending_invitations: Vec<Invitation>,
}

impl AppContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the current user, then workspaces and invitations, then
    /// select the active workspace (the remembered id if it is still
    /// visible, else the first owned workspace) and load its members.
    pub async fn initialize(
        &mut self,
        api: &impl DirectoryApi,
        remembered_workspace: Option<i64>,
    ) -> Result<()> {
        let user = api.current_user().await.context("failed to fetch current user")?;
        self.current_user = Some(user);

        self.workspaces = api.list_workspaces().await.context("failed to fetch workspaces")?;
        self.pending_invitations =
            api.pending_invitations().await.context("failed to fetch pending invitations")?;

        self.active_workspace = remembered_workspace
            .and_then(|id| self.workspaces.find(id).cloned())
            .or_else(|| self.workspaces.owned.first().cloned());
        self.refresh_members(api).await
    }

    /// Switch the active workspace and refresh its member list.
    pub async fn set_active_workspace(
        &mut self,
        api: &impl DirectoryApi,
        workspace_id: i64,
    ) -> Result<()> {
        let Some(workspace) = self.workspaces.find(workspace_id).cloned() else {
            bail!("workspace {workspace_id} is not visible to this user");
        };
        self.active_workspace = Some(workspace);
        self.refresh_members(api).await
    }

    async fn refresh_members(&mut self, api: &impl DirectoryApi) -> Result<()> {
        match &self.active_workspace {
            Some(workspace) => {
                self.workspace_members = api
                    .workspace_members(workspace.id)
                    .await
                    .context("failed to fetch workspace members")?;
            }
            None => self.workspace_members.clear(),
        }
        Ok(())
    }

    /// The caller's role in the active workspace.
    pub fn current_role(&self) -> Option<Role> {
        let user = self.current_user.as_ref()?;
        let workspace = self.active_workspace.as_ref()?;
        resolve_role(user, workspace, &self.workspace_members)
    }

    /// Capability set for the active workspace. No role means none.
    pub fn capabilities(&self) -> Capabilities {
        self.current_role().map(Role::capabilities).unwrap_or_else(Capabilities::none)
    }

    /// Best-effort API logout, then clear all session state.
    pub async fn logout(&mut self, api: &impl DirectoryApi) {
        if let Err(error) = api.logout().await {
            warn!(error = %error, "api logout failed; clearing local session anyway");
        }
        self.current_user = None;
        self.workspaces = WorkspaceList::default();
        self.active_workspace = None;
        self.workspace_members.clear();
        self.pending_invitations.clear();
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn workspaces(&self) -> &WorkspaceList {
        &self.workspaces
    }

    pub fn active_workspace(&self) -> Option<&Workspace> {
        self.active_workspace.as_ref()
    }

    pub fn workspace_members(&self) -> &[WorkspaceMember] {
        &self.workspace_members
    }

    pub fn pending_invitations(&self) -> &[Invitation] {
        &self.pending_invitations
    }
}
