//! Reconnect transition table.

use crate::types::DisconnectReason;

/// How a session ended when it will not be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Local credentials are unusable; the operator must pair again.
    ReauthRequired(DisconnectReason),
    /// Another client took over the session.
    Replaced,
}

/// What the supervising loop does with a closed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Reconnect,
    Terminate(SessionEnd),
    /// Unrecognized reason: stop with an error instead of looping.
    Fatal,
}

/// Decide the follow-up for a close carrying `reason`.
pub fn action_for(reason: DisconnectReason) -> Action {
    use DisconnectReason::*;

    match reason {
        ConnectionClosed | ConnectionLost | RestartRequired | TimedOut => Action::Reconnect,
        BadSession | LoggedOut => Action::Terminate(SessionEnd::ReauthRequired(reason)),
        ConnectionReplaced => Action::Terminate(SessionEnd::Replaced),
        Unknown(_) => Action::Fatal,
    }
}

/// Operator-facing line for a close, `session_dir` naming the auth state.
pub fn describe(reason: DisconnectReason, session_dir: &str) -> String {
    use DisconnectReason::*;

    match reason {
        BadSession => format!("Bad session file, delete {session_dir} and scan again"),
        ConnectionClosed => "Connection closed, reconnecting...".to_string(),
        ConnectionLost => "Connection lost from server, reconnecting...".to_string(),
        ConnectionReplaced => {
            "Connection replaced by another session, close the current session first".to_string()
        }
        LoggedOut => format!("Device logged out, delete {session_dir} and scan again"),
        RestartRequired => "Restart required, restarting...".to_string(),
        TimedOut => "Connection timed out, reconnecting...".to_string(),
        Unknown(code) => format!("Unknown disconnect reason {code}"),
    }
}
