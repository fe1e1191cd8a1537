// `quillpad login` — exchange credentials for a token and store it.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use url::Url;

use quillpad_client::api::HttpApi;
use quillpad_client::config::ClientConfig;

use crate::commands::block_on;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account email.
    pub email: String,
    /// Password; prompted for when omitted.
    #[arg(long)]
    pub password: Option<String>,
    /// Force JSON output.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct LoginResult {
    email: String,
    api_url: String,
}

pub fn run(args: LoginArgs) -> Result<()> {
    let format = OutputFormat::detect(args.json);

    let password = match args.password {
        Some(password) => password,
        None => prompt_password()?,
    };

    let mut config = ClientConfig::load();
    let base = Url::parse(&config.api_url)
        .with_context(|| format!("invalid api_url `{}` in config", config.api_url))?;
    let api = HttpApi::new(base, None)?;

    let token = block_on(api.login(&args.email, &password))?;
    config.auth_token = Some(token);
    config.save().context("failed to store auth token")?;

    let result = LoginResult { email: args.email, api_url: config.api_url };
    output::print_output(format, &result, |r| format!("Logged in as {}", r.email))?;
    Ok(())
}

fn prompt_password() -> Result<String> {
    eprint!("Password: ");
    std::io::stderr().flush().ok();
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
