// Typed clients for the REST collaborators (auth, workspaces, pages).
//
// The editing core treats these as black boxes: thin request/response
// wrappers with bearer auth, JSON bodies, and a bounded timeout. The
// endpoints use verb-style paths (`/page/get-by-id?pageId=...`) and
// camelCase payloads. The traits exist so the app context can run
// against scripted fakes in tests.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use quillpad_common::types::{Invitation, Page, User, Workspace, WorkspaceList, WorkspaceMember};

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Auth / workspace / invitation endpoints the app context consumes.
#[allow(async_fn_in_trait)]
pub trait DirectoryApi {
    async fn current_user(&self) -> Result<User>;
    async fn list_workspaces(&self) -> Result<WorkspaceList>;
    async fn workspace_members(&self, workspace_id: i64) -> Result<Vec<WorkspaceMember>>;
    async fn pending_invitations(&self) -> Result<Vec<Invitation>>;
    async fn logout(&self) -> Result<()>;
}

/// Page CRUD endpoints.
#[allow(async_fn_in_trait)]
pub trait PagesApi {
    async fn create_page(&self, request: &NewPage) -> Result<Page>;
    async fn get_page(&self, page_id: i64) -> Result<Page>;
    async fn list_pages(&self, workspace_id: i64) -> Result<Vec<Page>>;
    async fn update_page(&self, page_id: i64, request: &UpdatePage) -> Result<Page>;
    async fn delete_page(&self, page_id: i64) -> Result<()>;
}

/// Body for `page/create`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPage {
    pub title: String,
    pub workspace_id: i64,
    pub parent_page_id: Option<i64>,
    pub content: String,
}

/// Body for `page/update`. Absent members are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Serialize)]
struct NewWorkspace<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct MembersResponse {
    members: Vec<WorkspaceMember>,
}

/// reqwest-backed implementation of the REST collaborators.
pub struct HttpApi {
    http: reqwest::Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpApi {
    /// `base_url` is the API root, e.g. `http://localhost:3333/api`.
    pub fn new(mut base_url: Url, auth_token: Option<String>) -> Result<Self> {
        // A trailing slash keeps Url::join from eating the last path segment.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")?;
        Ok(Self { http, base_url, auth_token })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).with_context(|| format!("invalid endpoint path `{path}`"))
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .with_context(|| format!("{what} request failed"))?;
        Self::decode(response, what).await
    }

    async fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        what: &str,
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        let response = self
            .request(Method::POST, url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("{what} request failed"))?;
        Self::decode(response, what).await
    }

    async fn post_empty(&self, path: &str, what: &str) -> Result<()> {
        let url = self.endpoint(path)?;
        let response = self
            .request(Method::POST, url)
            .send()
            .await
            .with_context(|| format!("{what} request failed"))?;
        response.error_for_status().map(drop).with_context(|| format!("{what} failed"))
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> Result<T> {
        let response = response.error_for_status().with_context(|| format!("{what} failed"))?;
        response.json().await.with_context(|| format!("failed to decode {what} response"))
    }

    /// Exchange credentials for a bearer token.
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let body: LoginResponse =
            self.post_json("auth/login", &LoginRequest { email, password }, "login").await?;
        Ok(body.token)
    }

    pub async fn create_workspace(&self, name: &str) -> Result<Workspace> {
        self.post_json("workspace/create", &NewWorkspace { name }, "workspace creation").await
    }

    pub async fn delete_workspace(&self, workspace_id: i64) -> Result<()> {
        self.post_empty(&format!("workspace/delete?workspaceId={workspace_id}"), "workspace deletion")
            .await
    }

    pub async fn remove_member(&self, workspace_id: i64, user_id: i64) -> Result<()> {
        self.post_empty(
            &format!("workspace/remove-members?workspaceId={workspace_id}&userId={user_id}"),
            "member removal",
        )
        .await
    }

    pub async fn accept_invitation(&self, token: &str) -> Result<()> {
        self.post_empty(&format!("workspace/accept-invitation?token={token}"), "invitation accept")
            .await
    }

    pub async fn decline_invitation(&self, token: &str) -> Result<()> {
        self.post_empty(
            &format!("workspace/decline-invitation?token={token}"),
            "invitation decline",
        )
        .await
    }
}

impl DirectoryApi for HttpApi {
    async fn current_user(&self) -> Result<User> {
        self.get_json("auth/get-current-user", "current-user fetch").await
    }

    async fn list_workspaces(&self) -> Result<WorkspaceList> {
        self.get_json("workspace/get-all", "workspace listing").await
    }

    async fn workspace_members(&self, workspace_id: i64) -> Result<Vec<WorkspaceMember>> {
        let response: MembersResponse = self
            .get_json(
                &format!("workspace/get-all-members?workspaceId={workspace_id}"),
                "member listing",
            )
            .await?;
        Ok(response.members)
    }

    async fn pending_invitations(&self) -> Result<Vec<Invitation>> {
        self.get_json("workspace/get-pending-invitations", "invitation listing").await
    }

    async fn logout(&self) -> Result<()> {
        self.post_empty("auth/logout", "logout").await
    }
}

impl PagesApi for HttpApi {
    async fn create_page(&self, request: &NewPage) -> Result<Page> {
        self.post_json("page/create", request, "page creation").await
    }

    async fn get_page(&self, page_id: i64) -> Result<Page> {
        self.get_json(&format!("page/get-by-id?pageId={page_id}"), "page fetch").await
    }

    async fn list_pages(&self, workspace_id: i64) -> Result<Vec<Page>> {
        self.get_json(&format!("page/get-all?workspaceId={workspace_id}"), "page listing").await
    }

    async fn update_page(&self, page_id: i64, request: &UpdatePage) -> Result<Page> {
        self.post_json(&format!("page/update?pageId={page_id}"), request, "page update").await
    }

    async fn delete_page(&self, page_id: i64) -> Result<()> {
        self.post_empty(&format!("page/delete?pageId={page_id}"), "page deletion").await
    }
}
