use ahash::HashSet;

use crate::core::{
    id::Id,
    roles::{
        RouterRole,
        router_roles,
    },
    types::Dictionary,
    uri::Uri,
};

/// The state of the underlying transport connection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

impl ConnectionState {
    pub(crate) fn allowed_state_transition(&self, next: &Self) -> bool {
        match (self, next) {
            (Self::Disconnected, Self::Connecting) => true,
            (Self::Connecting, Self::Connected) => true,
            (Self::Connecting, Self::Closing) => true,
            (Self::Connected, Self::Closing) => true,
            // Any transport can drop out from under us.
            (_, Self::Disconnected) => true,
            _ => false,
        }
    }
}

/// An established WAMP session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Session ID assigned by the router.
    pub id: Id,
    pub realm: Uri,
    /// Details from the router's WELCOME, including the router roles.
    pub details: Dictionary,
}

impl Session {
    /// Roles the router announced for this session.
    pub fn router_roles(&self) -> HashSet<RouterRole> {
        router_roles(&self.details)
    }
}

/// The result of joining a realm.
#[derive(Debug, Clone, PartialEq)]
pub struct Welcome {
    pub session: Id,
    pub details: Dictionary,
}

/// The state of the WAMP session on top of a connected transport.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum SessionState {
    #[default]
    Closed,
    Establishing {
        realm: Uri,
    },
    Established(Session),
    Closing(Session),
}

impl SessionState {
    pub(crate) fn allowed_state_transition(&self, next: &Self) -> bool {
        match (self, next) {
            (Self::Closed, Self::Establishing { .. }) => true,
            (Self::Establishing { .. }, Self::Closed) => true,
            (Self::Establishing { .. }, Self::Established(_)) => true,
            (Self::Established(_), Self::Closing(_)) => true,
            (Self::Established(_), Self::Closed) => true,
            (Self::Closing(_), Self::Closed) => true,
            _ => false,
        }
    }

    /// The session, if one is established.
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Established(session) => Some(session),
            _ => None,
        }
    }
}

#[cfg(test)]
mod state_test {
    use crate::{
        connection::state::{
            ConnectionState,
            Session,
            SessionState,
        },
        core::{
            id::Id,
            types::Dictionary,
            uri::Uri,
        },
    };

    #[test]
    fn connection_follows_lifecycle() {
        use ConnectionState::*;
        assert!(Disconnected.allowed_state_transition(&Connecting));
        assert!(Connecting.allowed_state_transition(&Connected));
        assert!(Connected.allowed_state_transition(&Closing));
        assert!(Closing.allowed_state_transition(&Disconnected));
        assert!(Connected.allowed_state_transition(&Disconnected));
        assert!(!Disconnected.allowed_state_transition(&Connected));
        assert!(!Closing.allowed_state_transition(&Connected));
    }

    #[test]
    fn session_follows_lifecycle() {
        let session = Session {
            id: Id::try_from(10).unwrap(),
            realm: Uri::try_from("realm1").unwrap(),
            details: Dictionary::default(),
        };
        let establishing = SessionState::Establishing {
            realm: Uri::try_from("realm1").unwrap(),
        };
        let established = SessionState::Established(session.clone());
        let closing = SessionState::Closing(session);
        assert!(SessionState::Closed.allowed_state_transition(&establishing));
        assert!(establishing.allowed_state_transition(&established));
        assert!(established.allowed_state_transition(&closing));
        assert!(closing.allowed_state_transition(&SessionState::Closed));
        assert!(!SessionState::Closed.allowed_state_transition(&established));
        assert!(!closing.allowed_state_transition(&established));
        assert_eq!(established.session().map(|session| session.id.value()), Some(10));
        assert_eq!(closing.session(), None);
    }
}
