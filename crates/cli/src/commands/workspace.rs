// `quillpad workspace` — list, create, delete workspaces.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use quillpad_common::types::WorkspaceList;
use quillpad_client::config::ClientConfig;
use quillpad_client::context::AppContext;

use crate::commands::{authed_api, block_on};
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum WorkspaceCommand {
    /// List workspaces visible to you
    List(ListArgs),
    /// Create a workspace and make it active
    Create(CreateArgs),
    /// Delete a workspace (owners only)
    Delete(DeleteArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Force JSON output.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Workspace name.
    pub name: String,
    /// Force JSON output.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Workspace id.
    pub id: i64,
}

pub fn run(cmd: WorkspaceCommand) -> Result<()> {
    match cmd {
        WorkspaceCommand::List(args) => list(args),
        WorkspaceCommand::Create(args) => create(args),
        WorkspaceCommand::Delete(args) => delete(args),
    }
}

fn list(args: ListArgs) -> Result<()> {
    let format = OutputFormat::detect(args.json);
    let config = ClientConfig::load();
    let api = authed_api(&config)?;

    let workspaces: WorkspaceList = block_on(async {
        use quillpad_client::api::DirectoryApi;
        api.list_workspaces().await
    })?;

    output::print_output(format, &workspaces, format_list)?;
    Ok(())
}

fn format_list(list: &WorkspaceList) -> String {
    if list.is_empty() {
        return "No workspaces. Create one with: quillpad workspace create <name>".to_string();
    }
    let mut lines = Vec::new();
    for workspace in &list.owned {
        lines.push(format!("{:>6}  {} (owned)", workspace.id, workspace.name));
    }
    for workspace in &list.shared {
        lines.push(format!("{:>6}  {} (shared)", workspace.id, workspace.name));
    }
    lines.join("\n")
}

#[derive(Debug, Serialize)]
struct CreatedWorkspace {
    id: i64,
    name: String,
}

fn create(args: CreateArgs) -> Result<()> {
    let format = OutputFormat::detect(args.json);
    let mut config = ClientConfig::load();
    let api = authed_api(&config)?;

    let workspace = block_on(api.create_workspace(&args.name))?;

    // The freshly created workspace becomes the active one.
    config.last_workspace_id = Some(workspace.id);
    config.save().context("failed to remember the new workspace")?;

    let result = CreatedWorkspace { id: workspace.id, name: workspace.name };
    output::print_output(format, &result, |w| format!("Created workspace {} ({})", w.name, w.id))?;
    Ok(())
}

fn delete(args: DeleteArgs) -> Result<()> {
    let config = ClientConfig::load();
    let api = authed_api(&config)?;

    block_on(async {
        let mut ctx = AppContext::new();
        ctx.initialize(&api, config.last_workspace_id).await?;
        ctx.set_active_workspace(&api, args.id).await?;

        if !ctx.capabilities().can_delete_workspace {
            bail!("only workspace owners can delete workspaces");
        }
        api.delete_workspace(args.id).await
    })?;

    println!("Deleted workspace {}", args.id);
    Ok(())
}
