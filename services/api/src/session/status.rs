//! services/api/src/session/status.rs
//!
//! The session state machine's states and the mapping from the raw status
//! strings the platform reports.

use outreach_core::domain::QrCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LostReason {
    Disconnected,
    BrowserClosed,
    NotLogged,
}

impl LostReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LostReason::Disconnected => "disconnected",
            LostReason::BrowserClosed => "browserClose",
            LostReason::NotLogged => "notLogged",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    AwaitingScan,
    Syncing,
    Connected,
    Lost(LostReason),
    /// Interactive pairing gave up; carries the reason shown to the user.
    Failed(String),
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::AwaitingScan => "awaitingScan",
            SessionState::Syncing => "syncing",
            SessionState::Connected => "connected",
            SessionState::Lost(_) => "lost",
            SessionState::Failed(_) => "failed",
        }
    }
}

/// How a raw platform status moves the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Connected,
    Syncing,
    Lost(LostReason),
    /// Recorded verbatim, no transition.
    Other,
}

/// The platform is inconsistent about which "logged in" status it reports, so
/// `connected`, `isLogged` and `inChat` all count as connected.
pub fn classify_status(raw: &str) -> StatusClass {
    match raw {
        "connected" | "isLogged" | "inChat" => StatusClass::Connected,
        "qrReadSuccess" => StatusClass::Syncing,
        "disconnected" => StatusClass::Lost(LostReason::Disconnected),
        "browserClose" => StatusClass::Lost(LostReason::BrowserClosed),
        "notLogged" => StatusClass::Lost(LostReason::NotLogged),
        _ => StatusClass::Other,
    }
}

/// A point-in-time view of the session, as reported to the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    /// The last status string the platform reported, verbatim.
    pub platform_status: Option<String>,
    pub qr: Option<QrCode>,
    pub valid_session: bool,
    pub has_client: bool,
    pub is_reconnecting: bool,
    pub is_pairing: bool,
    pub reconnect_attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_equivalents() {
        for raw in ["connected", "isLogged", "inChat"] {
            assert_eq!(classify_status(raw), StatusClass::Connected);
        }
    }

    #[test]
    fn lost_equivalents_keep_their_reason() {
        assert_eq!(
            classify_status("browserClose"),
            StatusClass::Lost(LostReason::BrowserClosed)
        );
        assert_eq!(
            classify_status("notLogged"),
            StatusClass::Lost(LostReason::NotLogged)
        );
        assert_eq!(
            classify_status("disconnected"),
            StatusClass::Lost(LostReason::Disconnected)
        );
    }

    #[test]
    fn unknown_statuses_do_not_transition() {
        assert_eq!(classify_status("qrReadSuccess"), StatusClass::Syncing);
        assert_eq!(classify_status("autocloseCalled"), StatusClass::Other);
        assert_eq!(classify_status("CONNECTED"), StatusClass::Other);
    }
}
