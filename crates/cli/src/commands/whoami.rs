// `quillpad whoami` — show the logged-in user and active workspace.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use quillpad_client::config::ClientConfig;
use quillpad_client::context::AppContext;

use crate::commands::{authed_api, block_on};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct WhoamiArgs {
    /// Force JSON output.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct WhoamiResult {
    name: String,
    email: String,
    workspace: Option<String>,
    role: Option<String>,
    pending_invitations: usize,
}

pub fn run(args: WhoamiArgs) -> Result<()> {
    let format = OutputFormat::detect(args.json);
    let config = ClientConfig::load();
    let api = authed_api(&config)?;

    let result = block_on(async {
        let mut ctx = AppContext::new();
        ctx.initialize(&api, config.last_workspace_id).await?;

        let user = ctx.current_user().expect("initialize guarantees a user");
        Ok::<_, anyhow::Error>(WhoamiResult {
            name: user.name.clone(),
            email: user.email.clone(),
            workspace: ctx.active_workspace().map(|w| w.name.clone()),
            role: ctx.current_role().map(|r| r.to_string()),
            pending_invitations: ctx.pending_invitations().len(),
        })
    })?;

    output::print_output(format, &result, format_human)?;
    Ok(())
}

fn format_human(result: &WhoamiResult) -> String {
    let mut lines = vec![format!("{} <{}>", result.name, result.email)];
    match (&result.workspace, &result.role) {
        (Some(workspace), Some(role)) => {
            lines.push(format!("  Workspace: {workspace} ({role})"));
        }
        (Some(workspace), None) => lines.push(format!("  Workspace: {workspace} (no role)")),
        _ => lines.push("  No active workspace.".to_string()),
    }
    if result.pending_invitations > 0 {
        lines.push(format!("  Pending invitations: {}", result.pending_invitations));
    }
    lines.join("\n")
}
