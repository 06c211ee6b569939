use crate::core::uri::Uri;

/// The reason for closing a WAMP session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    #[default]
    Normal,
    SystemShutdown,
    CloseRealm,
    Killed,
    /// Acknowledges a GOODBYE initiated by the other side.
    GoodbyeAndOut,
    /// Joining was aborted before the session was established.
    ClientAborting,
}

impl CloseReason {
    /// URI for the close reason.
    pub fn uri(&self) -> Uri {
        Uri::from_known(match self {
            Self::Normal => "wamp.close.normal",
            Self::SystemShutdown => "wamp.close.system_shutdown",
            Self::CloseRealm => "wamp.close.close_realm",
            Self::Killed => "wamp.close.killed",
            Self::GoodbyeAndOut => "wamp.error.goodbye_and_out",
            Self::ClientAborting => "wamp.error.client_aborting",
        })
    }
}
