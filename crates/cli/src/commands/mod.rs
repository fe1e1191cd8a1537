// CLI subcommand dispatch.

use anyhow::{anyhow, Context, Result};
use clap::Subcommand;
use url::Url;

use quillpad_client::api::HttpApi;
use quillpad_client::config::ClientConfig;

pub mod edit;
pub mod login;
pub mod page;
pub mod whoami;
pub mod workspace;

#[derive(Subcommand)]
pub enum Command {
    /// Log in and store the auth token
    Login(login::LoginArgs),
    /// Show the logged-in user and active workspace
    Whoami(whoami::WhoamiArgs),
    /// Manage workspaces
    #[command(subcommand)]
    Workspace(workspace::WorkspaceCommand),
    /// Manage pages in the active workspace
    #[command(subcommand)]
    Page(page::PageCommand),
    /// Open a live editing session for a page (omit the id to create one)
    Edit(edit::EditArgs),
}

pub fn run(cmd: Command) -> Result<()> {
    match cmd {
        Command::Login(args) => login::run(args),
        Command::Whoami(args) => whoami::run(args),
        Command::Workspace(cmd) => workspace::run(cmd),
        Command::Page(cmd) => page::run(cmd),
        Command::Edit(args) => edit::run(args),
    }
}

/// Run a command future on a fresh current-thread runtime.
pub(crate) fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime should build")
        .block_on(future)
}

/// Build an API client from the stored auth token, or fail with a
/// login hint.
pub(crate) fn authed_api(config: &ClientConfig) -> Result<HttpApi> {
    let token = config
        .auth_token
        .clone()
        .ok_or_else(|| anyhow!("not logged in; run: quillpad login <email>"))?;
    let base = Url::parse(&config.api_url)
        .with_context(|| format!("invalid api_url `{}` in config", config.api_url))?;
    HttpApi::new(base, Some(token))
}
