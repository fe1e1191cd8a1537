// `quillpad edit` — live collaborative editing from the terminal.
//
// Each line typed appends a paragraph block and is shared with the
// other editors of the page. Line commands:
//
//   :title <text>   retitle the page
//   :show           reprint the current document
//   :quit           end the session (so does EOF / ctrl-d)

use anyhow::{bail, Context, Result};
use clap::Args;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

use quillpad_common::block::{Block, BlockList};
use quillpad_client::api::PagesApi;
use quillpad_client::config::ClientConfig;
use quillpad_client::context::AppContext;
use quillpad_client::conn::ws::WsTransport;
use quillpad_client::editor::{EditorSession, SessionEvent};
use quillpad_client::outbound::DebounceConfig;
use quillpad_client::reconcile::{Applied, EditorSurface};
use quillpad_client::session::SessionDescriptor;

use crate::commands::{authed_api, block_on};

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Page id to edit; omit to create a new page.
    pub page_id: Option<i64>,
    /// Workspace id (defaults to the remembered active workspace).
    #[arg(long)]
    pub workspace: Option<i64>,
}

/// Renders the shared document to the terminal.
#[derive(Debug, Default)]
struct TerminalSurface;

impl EditorSurface for TerminalSurface {
    fn apply_document(&mut self, body: &BlockList) {
        println!("--- document ---");
        for block in &body.blocks {
            match block.text() {
                Some(text) => println!("  {text}"),
                None => println!("  [{}]", block.kind),
            }
        }
        println!("----------------");
    }

    fn apply_title(&mut self, title: &str) {
        println!("== {title} ==");
    }

    fn focus_title(&mut self) {
        println!("(page ready — retitle it with :title <text>)");
    }
}

pub fn run(args: EditArgs) -> Result<()> {
    block_on(run_session(args))
}

async fn run_session(args: EditArgs) -> Result<()> {
    let config = ClientConfig::load();
    let api = authed_api(&config)?;

    let mut ctx = AppContext::new();
    ctx.initialize(&api, args.workspace.or(config.last_workspace_id)).await?;
    if let Some(id) = args.workspace {
        ctx.set_active_workspace(&api, id).await?;
    }
    let Some(workspace) = ctx.active_workspace() else {
        bail!("no active workspace; create one with: quillpad workspace create <name>");
    };
    let workspace_id = workspace.id;
    let caps = ctx.capabilities();

    let page = match args.page_id {
        Some(id) => {
            Some(api.get_page(id).await.with_context(|| format!("page {id} not found"))?)
        }
        None => None,
    };

    // The permission gate cancels the session here, before any I/O.
    let descriptor = SessionDescriptor::negotiate(page.as_ref(), workspace_id, &caps)?;

    let mut session = EditorSession::new(
        descriptor,
        config.sync_url.clone(),
        WsTransport::new(),
        TerminalSurface,
        DebounceConfig::default(),
        ctx.current_user().map(|u| u.id),
    );
    session.open().await.context("could not reach the sync server")?;

    match &page {
        Some(page) => println!("Editing \"{}\" (page {})", page.title, page.id),
        None => println!("Creating a new page — type a title with :title <text>"),
    }
    if session.read_only() {
        let role = ctx.current_role().map(|r| r.to_string()).unwrap_or_else(|| "none".into());
        println!("Read-only: your role here is {role}; local edits will not be shared.");
    }

    let (tx, mut rx) = mpsc::channel::<String>(16);
    let reader = tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });

    loop {
        match session.next_event(&mut rx).await? {
            SessionEvent::Input(line) => {
                if !handle_line(&mut session, line.trim_end()).await? {
                    break;
                }
            }
            SessionEvent::Remote(Applied::PageCreated(page)) => {
                println!("(created page {})", page.id);
            }
            SessionEvent::Remote(_) | SessionEvent::Flushed => {}
            SessionEvent::Disconnected => {
                eprintln!("(connection lost; trying to rejoin...)");
                if session.reconnect_with_backoff().await {
                    eprintln!("(reconnected)");
                } else {
                    eprintln!("(could not reconnect; your edits are frozen on this page)");
                    break;
                }
            }
            SessionEvent::InputClosed => break,
        }
    }

    session.close().await;
    reader.abort();

    if let Some(page) = session.created_page() {
        println!("Created page {} — reopen it with: quillpad edit {}", page.id, page.id);
    }
    Ok(())
}

/// Interpret one input line. Returns false when the session should end.
async fn handle_line(
    session: &mut EditorSession<WsTransport, TerminalSurface>,
    line: &str,
) -> Result<bool> {
    if line == ":quit" {
        return Ok(false);
    }
    if line == ":show" {
        let document = session.document();
        println!("== {} ==", document.title);
        for block in &document.body.blocks {
            match block.text() {
                Some(text) => println!("  {text}"),
                None => println!("  [{}]", block.kind),
            }
        }
        return Ok(true);
    }
    if let Some(title) = line.strip_prefix(":title ") {
        session.edit_title(title.trim()).await?;
        return Ok(true);
    }
    if line.is_empty() {
        return Ok(true);
    }

    let mut body = session.document().body.clone();
    body.blocks.push(Block::paragraph(line));
    session.edit_content(body);
    Ok(true)
}
