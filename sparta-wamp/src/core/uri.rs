use std::{
    fmt::Display,
    sync::LazyLock,
};

use regex::Regex;
use thiserror::Error;

use crate::core::types::{
    Value,
    WampDeserialize,
    WampDeserializeError,
    WampSerialize,
    WampSerializeError,
};

/// Error for an invalid URI.
#[derive(Debug, Error)]
#[error("invalid URI: {0:?}")]
pub struct InvalidUri(String);

/// Validates a URI with the loose rules that routers must accept from clients.
///
/// Components must be non-empty and may not contain whitespace or `#`.
pub fn validate_uri<S>(uri: S) -> Result<(), InvalidUri>
where
    S: AsRef<str>,
{
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^([^\s\.#]+\.)*([^\s\.#]+)$").unwrap());
    if !RE.is_match(uri.as_ref()) {
        return Err(InvalidUri(uri.as_ref().to_owned()));
    }
    Ok(())
}

/// A uniform resource identifier, used in many aspects of WAMP messaging for identifying resources,
/// such as realms, topics, procedures, and errors.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Uri(String);

impl Uri {
    /// Constructs a URI directly from a value known to be valid, skipping validation.
    pub(crate) fn from_known<S>(value: S) -> Self
    where
        S: Into<String>,
    {
        Self(value.into())
    }

    /// Splits the URI into its components.
    pub fn split(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }
}

impl Display for Uri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for Uri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Uri {
    type Error = InvalidUri;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_uri(&value)?;
        Ok(Self(value))
    }
}

impl TryFrom<&str> for Uri {
    type Error = InvalidUri;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        validate_uri(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl From<Uri> for String {
    fn from(value: Uri) -> Self {
        value.0
    }
}

impl From<Uri> for Value {
    fn from(value: Uri) -> Self {
        Value::String(value.0)
    }
}

impl WampSerialize for Uri {
    fn wamp_serialize(self) -> Result<Value, WampSerializeError> {
        Ok(Value::String(self.0))
    }
}

impl WampDeserialize for Uri {
    fn wamp_deserialize(value: Value) -> Result<Self, WampDeserializeError> {
        let value = String::wamp_deserialize(value)?;
        Uri::try_from(value).map_err(|err| WampDeserializeError::new(err.to_string()))
    }
}
