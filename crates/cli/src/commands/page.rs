// `quillpad page` — list, create, delete pages in the active workspace.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use quillpad_common::role::PermissionDenied;
use quillpad_common::types::Page;
use quillpad_client::api::{HttpApi, NewPage, PagesApi};
use quillpad_client::config::ClientConfig;
use quillpad_client::context::AppContext;

use crate::commands::{authed_api, block_on};
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum PageCommand {
    /// List pages in the active workspace
    List(ListArgs),
    /// Create a page over the REST API
    New(NewArgs),
    /// Delete a page
    Delete(DeleteArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Workspace id (defaults to the remembered active workspace).
    #[arg(long)]
    pub workspace: Option<i64>,
    /// Force JSON output.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct NewArgs {
    /// Page title.
    pub title: String,
    /// Workspace id (defaults to the remembered active workspace).
    #[arg(long)]
    pub workspace: Option<i64>,
    /// Force JSON output.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Page id.
    pub id: i64,
    /// Workspace id (defaults to the remembered active workspace).
    #[arg(long)]
    pub workspace: Option<i64>,
}

pub fn run(cmd: PageCommand) -> Result<()> {
    match cmd {
        PageCommand::List(args) => list(args),
        PageCommand::New(args) => new(args),
        PageCommand::Delete(args) => delete(args),
    }
}

/// Initialize the context and pin the requested workspace.
async fn workspace_context(
    api: &HttpApi,
    config: &ClientConfig,
    workspace: Option<i64>,
) -> Result<AppContext> {
    let mut ctx = AppContext::new();
    ctx.initialize(api, workspace.or(config.last_workspace_id)).await?;
    if let Some(id) = workspace {
        ctx.set_active_workspace(api, id).await?;
    }
    if ctx.active_workspace().is_none() {
        bail!("no active workspace; create one with: quillpad workspace create <name>");
    }
    Ok(ctx)
}

fn list(args: ListArgs) -> Result<()> {
    let format = OutputFormat::detect(args.json);
    let config = ClientConfig::load();
    let api = authed_api(&config)?;

    let pages = block_on(async {
        let ctx = workspace_context(&api, &config, args.workspace).await?;
        let workspace = ctx.active_workspace().expect("checked by workspace_context");
        api.list_pages(workspace.id).await
    })?;

    output::print_output(format, &pages, format_list)?;
    Ok(())
}

fn format_list(pages: &Vec<Page>) -> String {
    if pages.is_empty() {
        return "No pages yet. Start one with: quillpad edit".to_string();
    }
    pages
        .iter()
        .map(|p| format!("{:>6}  {}", p.id, if p.title.is_empty() { "Untitled" } else { &p.title }))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Serialize)]
struct CreatedPage {
    id: i64,
    title: String,
}

fn new(args: NewArgs) -> Result<()> {
    let format = OutputFormat::detect(args.json);
    let config = ClientConfig::load();
    let api = authed_api(&config)?;

    let page = block_on(async {
        let ctx = workspace_context(&api, &config, args.workspace).await?;
        if !ctx.capabilities().can_create_pages {
            return Err(anyhow::Error::new(PermissionDenied::CreatePages));
        }
        let workspace = ctx.active_workspace().expect("checked by workspace_context");
        api.create_page(&NewPage {
            title: args.title.clone(),
            workspace_id: workspace.id,
            parent_page_id: None,
            content: String::new(),
        })
        .await
    })?;

    let result = CreatedPage { id: page.id, title: page.title };
    output::print_output(format, &result, |p| format!("Created page {} ({})", p.title, p.id))?;
    Ok(())
}

fn delete(args: DeleteArgs) -> Result<()> {
    let config = ClientConfig::load();
    let api = authed_api(&config)?;

    block_on(async {
        let ctx = workspace_context(&api, &config, args.workspace).await?;
        if !ctx.capabilities().can_delete {
            return Err(anyhow::Error::new(PermissionDenied::Edit));
        }
        api.delete_page(args.id).await
    })?;

    println!("Deleted page {}", args.id);
    Ok(())
}
