// Output format auto-detection for the CLI.
//
// TTY → human-readable text. Piped/redirected → structured JSON.
// `--json` flag forces JSON output regardless of terminal.

use serde::Serialize;
use std::io::{self, IsTerminal, Write};

use quillpad_common::role::PermissionDenied;

const ANSI_RED: &str = "\x1b[31m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_RESET: &str = "\x1b[0m";

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    Human,
    /// Machine-readable JSON (one object per response).
    Json,
}

impl OutputFormat {
    /// Auto-detect format: JSON if `--json` was passed or stdout is not a TTY.
    pub fn detect(json_flag: bool) -> Self {
        if json_flag {
            return Self::Json;
        }
        Self::detect_from_terminal(io::stdout().is_terminal())
    }

    /// Testable variant that takes an explicit `is_tty` flag.
    pub fn detect_from_terminal(is_tty: bool) -> Self {
        if is_tty {
            Self::Human
        } else {
            Self::Json
        }
    }
}

/// Write a value to stdout in the selected format.
pub fn print_output<T, F>(format: OutputFormat, value: &T, human_fn: F) -> io::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    let mut out = io::stdout().lock();
    write_output(&mut out, format, value, human_fn)
}

/// Write a value to a provided writer (useful for testing).
pub fn write_output<W, T, F>(
    writer: &mut W,
    format: OutputFormat,
    value: &T,
    human_fn: F,
) -> io::Result<()>
where
    W: Write,
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Human => {
            writeln!(writer, "{}", human_fn(value))
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, value).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

/// Write an error to stderr in the selected format.
pub fn print_error(format: OutputFormat, code: &str, message: &str) {
    let mut err = io::stderr().lock();
    match format {
        OutputFormat::Human => {
            let line =
                render_human_stderr_line("error", message, io::stderr().is_terminal(), ANSI_RED);
            let _ = writeln!(err, "{line}");
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "error": { "code": code, "message": message }
            });
            let _ = serde_json::to_writer(&mut err, &obj);
            let _ = writeln!(err);
        }
    }
}

/// Write a warning to stderr in the selected format.
pub fn print_warning(format: OutputFormat, code: &str, message: &str) {
    let mut err = io::stderr().lock();
    match format {
        OutputFormat::Human => {
            let line = render_human_stderr_line(
                "warning",
                message,
                io::stderr().is_terminal(),
                ANSI_YELLOW,
            );
            let _ = writeln!(err, "{line}");
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "warning": { "code": code, "message": message }
            });
            let _ = serde_json::to_writer(&mut err, &obj);
            let _ = writeln!(err);
        }
    }
}

/// Print a mapped, actionable error for a command failure.
pub fn print_anyhow_error(format: OutputFormat, error: &anyhow::Error) {
    let (code, message) = actionable_error(error);
    print_error(format, code, &message);
}

fn actionable_error(error: &anyhow::Error) -> (&'static str, String) {
    if let Some(denied) = error.chain().find_map(|c| c.downcast_ref::<PermissionDenied>()) {
        return ("PERMISSION_DENIED", denied.to_string());
    }

    let message = format!("{error:#}");
    let lower = message.to_ascii_lowercase();

    if lower.contains("not logged in") || lower.contains("unauthorized") || lower.contains("401") {
        return ("AUTH_REQUIRED", "Not logged in. Run: quillpad login <email>".to_string());
    }

    if lower.contains("timed out") {
        return (
            "NETWORK_TIMEOUT",
            "The server did not respond. Check api_url in ~/.quillpad/config.toml".to_string(),
        );
    }

    if lower.contains("connection refused") || lower.contains("failed to connect") {
        return (
            "SERVER_UNREACHABLE",
            "Could not reach the Quillpad server. Check api_url/sync_url in ~/.quillpad/config.toml"
                .to_string(),
        );
    }

    if lower.contains("workspace") && (lower.contains("not found") || lower.contains("not visible"))
    {
        return (
            "WORKSPACE_NOT_FOUND",
            "Workspace not found. Run: quillpad workspace list".to_string(),
        );
    }

    if lower.contains("page") && lower.contains("not found") {
        return ("PAGE_NOT_FOUND", "Page not found. Run: quillpad page list".to_string());
    }

    ("API_ERROR", message)
}

fn render_human_stderr_line(label: &str, message: &str, is_tty: bool, color: &str) -> String {
    if is_tty {
        format!("{color}{label}:{ANSI_RESET} {message}")
    } else {
        format!("{label}: {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_tty_returns_human() {
        assert_eq!(OutputFormat::detect_from_terminal(true), OutputFormat::Human);
    }

    #[test]
    fn detect_pipe_returns_json() {
        assert_eq!(OutputFormat::detect_from_terminal(false), OutputFormat::Json);
    }

    #[test]
    fn detect_json_flag_overrides_tty() {
        assert_eq!(OutputFormat::detect(true), OutputFormat::Json);
    }

    #[test]
    fn write_output_human_format() {
        #[derive(Serialize)]
        struct Info {
            name: String,
        }
        let info = Info { name: "alice".into() };
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Human, &info, |i| format!("Name: {}", i.name))
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Name: alice\n");
    }

    #[test]
    fn write_output_json_format() {
        #[derive(Serialize)]
        struct Info {
            name: String,
            count: u32,
        }
        let info = Info { name: "bob".into(), count: 42 };
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Json, &info, |_| {
            unreachable!("human_fn should not be called in JSON mode")
        })
        .unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert!(output.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed["name"], "bob");
        assert_eq!(parsed["count"], 42);
    }

    #[test]
    fn render_human_error_uses_color_for_tty() {
        let line = render_human_stderr_line("error", "boom", true, ANSI_RED);
        assert!(line.contains(ANSI_RED));
        assert!(line.contains(ANSI_RESET));
        assert!(line.contains("boom"));
    }

    #[test]
    fn render_human_warning_without_tty_is_plain() {
        let line = render_human_stderr_line("warning", "careful", false, ANSI_YELLOW);
        assert_eq!(line, "warning: careful");
    }

    #[test]
    fn actionable_error_permission_denied_uses_typed_message() {
        let err = anyhow::Error::new(PermissionDenied::View).context("cannot open editor");
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "PERMISSION_DENIED");
        assert!(message.contains("permission to view"));
    }

    #[test]
    fn actionable_error_auth_required_message() {
        let err = anyhow::anyhow!("not logged in; run: quillpad login");
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "AUTH_REQUIRED");
        assert!(message.contains("quillpad login"));
    }

    #[test]
    fn actionable_error_server_unreachable_message() {
        let err = anyhow::anyhow!("login request failed: connection refused");
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "SERVER_UNREACHABLE");
        assert!(message.contains("config.toml"));
    }

    #[test]
    fn actionable_error_workspace_not_found_message() {
        let err = anyhow::anyhow!("workspace 42 is not visible to this user");
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "WORKSPACE_NOT_FOUND");
        assert!(message.contains("workspace list"));
    }

    #[test]
    fn actionable_error_generic_is_api_error() {
        let err = anyhow::anyhow!("boom");
        let (code, _) = actionable_error(&err);
        assert_eq!(code, "API_ERROR");
    }
}
