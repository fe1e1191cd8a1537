// Consistent exit codes for the quillpad CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/argument error
//   11 = authentication error
//   12 = permission denied
//   13 = network error

use std::process;

use quillpad_common::role::PermissionDenied;

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    Auth = 11,
    Permission = 12,
    Network = 13,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if cause.downcast_ref::<PermissionDenied>().is_some() {
                return Self::Permission;
            }
            if let Some(io_err) = cause.downcast_ref::<std::io::Error>() {
                return match io_err.kind() {
                    std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::NotConnected => Self::Network,
                    _ => Self::Error,
                };
            }
        }

        // Fall back to display-string patterns.
        let msg = format!("{err:#}").to_ascii_lowercase();
        if msg.contains("not logged in")
            || msg.contains("unauthorized")
            || msg.contains("401")
            || msg.contains("token")
        {
            return Self::Auth;
        }
        if msg.contains("timed out")
            || msg.contains("connection refused")
            || msg.contains("failed to connect")
        {
            return Self::Network;
        }

        Self::Error
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_values() {
        assert_eq!(ExitCode::Success.code(), 0);
        assert_eq!(ExitCode::Error.code(), 1);
        assert_eq!(ExitCode::Usage.code(), 2);
        assert_eq!(ExitCode::Auth.code(), 11);
        assert_eq!(ExitCode::Permission.code(), 12);
        assert_eq!(ExitCode::Network.code(), 13);
    }

    #[test]
    fn permission_denied_in_chain_maps_to_permission() {
        let err = anyhow::Error::new(PermissionDenied::CreatePages).context("cannot open editor");
        assert_eq!(ExitCode::from_error(&err), ExitCode::Permission);
    }

    #[test]
    fn connection_refused_maps_to_network() {
        let err = anyhow::Error::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert_eq!(ExitCode::from_error(&err), ExitCode::Network);
    }

    #[test]
    fn not_logged_in_maps_to_auth() {
        let err = anyhow::anyhow!("not logged in; run: quillpad login");
        assert_eq!(ExitCode::from_error(&err), ExitCode::Auth);
    }

    #[test]
    fn timeout_message_maps_to_network() {
        let err = anyhow::anyhow!("request timed out after 10s");
        assert_eq!(ExitCode::from_error(&err), ExitCode::Network);
    }

    #[test]
    fn generic_error_maps_to_error() {
        let err = anyhow::anyhow!("something went wrong");
        assert_eq!(ExitCode::from_error(&err), ExitCode::Error);
    }
}
