use std::fmt::Display;

use ahash::HashSet;

use crate::core::types::{
    Dictionary,
    Value,
};

/// A role a peer can take on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PeerRole {
    // Calls RPC endpoints.
    Caller,
    // Registers RPC endpoints.
    Callee,
    // Publishes events to topics.
    Publisher,
    // Subscribes to events for topics.
    Subscriber,
}

impl PeerRole {
    /// All peer roles.
    pub const ALL: [PeerRole; 4] = [
        PeerRole::Caller,
        PeerRole::Callee,
        PeerRole::Publisher,
        PeerRole::Subscriber,
    ];
}

impl TryFrom<&str> for PeerRole {
    type Error = anyhow::Error;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "caller" => Ok(Self::Caller),
            "callee" => Ok(Self::Callee),
            "publisher" => Ok(Self::Publisher),
            "subscriber" => Ok(Self::Subscriber),
            _ => Err(Self::Error::msg(format!("invalid peer role: {value}"))),
        }
    }
}

impl From<PeerRole> for &'static str {
    fn from(value: PeerRole) -> Self {
        match value {
            PeerRole::Caller => "caller",
            PeerRole::Callee => "callee",
            PeerRole::Publisher => "publisher",
            PeerRole::Subscriber => "subscriber",
        }
    }
}

impl Display for PeerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).into())
    }
}

/// A role a router can take on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RouterRole {
    // Supports RPC calls.
    Dealer,
    // Supports pub/sub.
    Broker,
}

impl TryFrom<&str> for RouterRole {
    type Error = anyhow::Error;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "dealer" => Ok(Self::Dealer),
            "broker" => Ok(Self::Broker),
            _ => Err(Self::Error::msg(format!("invalid router role: {value}"))),
        }
    }
}

/// Builds the `roles` dictionary announced in HELLO.
///
/// No advanced features are announced, so every role maps to an empty dictionary.
pub fn role_details<I>(roles: I) -> Dictionary
where
    I: IntoIterator<Item = PeerRole>,
{
    roles
        .into_iter()
        .map(|role| {
            (
                Into::<&'static str>::into(role).to_owned(),
                Value::Dictionary(Dictionary::default()),
            )
        })
        .collect()
}

/// Reads the router roles out of WELCOME details.
///
/// Unknown roles are skipped.
pub fn router_roles(details: &Dictionary) -> HashSet<RouterRole> {
    details
        .get("roles")
        .and_then(|roles| roles.dictionary())
        .map(|roles| {
            roles
                .keys()
                .filter_map(|role| RouterRole::try_from(role.as_str()).ok())
                .collect()
        })
        .unwrap_or_default()
}
