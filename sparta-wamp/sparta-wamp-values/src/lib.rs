use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

/// An integer type for WAMP messages.
pub type Integer = u64;

/// A dictionary of key-value pairs.
pub type Dictionary = ahash::HashMap<String, Value>;

/// A sequence of values.
pub type List = Vec<Value>;

/// A value for WAMP messages.
///
/// Numbers that do not fit into an [`Integer`] (negative or fractional numbers) are represented
/// as [`Value::Float`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(Integer),
    Float(f64),
    String(String),
    Bool(bool),
    Dictionary(Dictionary),
    List(List),
}

impl Value {
    /// The value as an [`Integer`].
    pub fn integer(&self) -> Option<Integer> {
        match self {
            Self::Integer(val) => Some(*val),
            _ => None,
        }
    }

    /// The value as an [`f64`].
    ///
    /// Integers are widened.
    pub fn float(&self) -> Option<f64> {
        match self {
            Self::Integer(val) => Some(*val as f64),
            Self::Float(val) => Some(*val),
            _ => None,
        }
    }

    /// The value as a [`str`].
    pub fn string(&self) -> Option<&str> {
        match self {
            Self::String(val) => Some(val),
            _ => None,
        }
    }

    /// The value as a [`bool`].
    pub fn bool(&self) -> Option<bool> {
        match self {
            Self::Bool(val) => Some(*val),
            _ => None,
        }
    }

    /// The value as a [`Dictionary`].
    pub fn dictionary(&self) -> Option<&Dictionary> {
        match self {
            Self::Dictionary(val) => Some(val),
            _ => None,
        }
    }

    /// The value as a [`Dictionary`].
    pub fn dictionary_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            Self::Dictionary(val) => Some(val),
            _ => None,
        }
    }

    /// The value as a [`List`].
    pub fn list(&self) -> Option<&List> {
        match self {
            Self::List(val) => Some(val),
            _ => None,
        }
    }

    /// The value as a [`List`].
    pub fn list_mut(&mut self) -> Option<&mut List> {
        match self {
            Self::List(val) => Some(val),
            _ => None,
        }
    }

    /// The name of the value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bool(_) => "bool",
            Self::Dictionary(_) => "dictionary",
            Self::List(_) => "list",
        }
    }
}

impl From<Integer> for Value {
    fn from(value: Integer) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Dictionary> for Value {
    fn from(value: Dictionary) -> Self {
        Self::Dictionary(value)
    }
}

impl From<List> for Value {
    fn from(value: List) -> Self {
        Self::List(value)
    }
}

/// An error resulting from serializing a Rust object into a WAMP value using the [`WampSerialize`]
/// trait.
#[derive(Debug, Error)]
#[error("{msg}")]
pub struct WampSerializeError {
    msg: String,
}

impl WampSerializeError {
    pub fn new<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self { msg: msg.into() }
    }

    pub fn annotate(&self, msg: String) -> Self {
        Self::new(format!("{}; {msg}", self.msg))
    }
}

/// An error resulting from deserializing a Rust object from a WAMP value using the
/// [`WampDeserialize`] trait.
#[derive(Debug, Error)]
#[error("{msg}")]
pub struct WampDeserializeError {
    msg: String,
}

impl WampDeserializeError {
    pub fn new<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self { msg: msg.into() }
    }

    pub fn annotate(&self, msg: String) -> Self {
        Self::new(format!("{}; {msg}", self.msg))
    }
}

/// Trait for serializing a Rust object into a WAMP value.
pub trait WampSerialize {
    /// Serializes the object into a WAMP value.
    fn wamp_serialize(self) -> Result<Value, WampSerializeError>;
}

impl WampSerialize for Value {
    fn wamp_serialize(self) -> Result<Value, WampSerializeError> {
        Ok(self)
    }
}

impl WampSerialize for Integer {
    fn wamp_serialize(self) -> Result<Value, WampSerializeError> {
        Ok(Value::Integer(self))
    }
}

impl WampSerialize for f64 {
    fn wamp_serialize(self) -> Result<Value, WampSerializeError> {
        if !self.is_finite() {
            return Err(WampSerializeError::new("float must be finite"));
        }
        Ok(Value::Float(self))
    }
}

impl WampSerialize for String {
    fn wamp_serialize(self) -> Result<Value, WampSerializeError> {
        Ok(Value::String(self))
    }
}

impl WampSerialize for bool {
    fn wamp_serialize(self) -> Result<Value, WampSerializeError> {
        Ok(Value::Bool(self))
    }
}

impl WampSerialize for List {
    fn wamp_serialize(self) -> Result<Value, WampSerializeError> {
        Ok(Value::List(self))
    }
}

impl WampSerialize for Dictionary {
    fn wamp_serialize(self) -> Result<Value, WampSerializeError> {
        Ok(Value::Dictionary(self))
    }
}

impl<T> WampSerialize for Option<T>
where
    T: WampSerialize,
{
    fn wamp_serialize(self) -> Result<Value, WampSerializeError> {
        match self {
            Some(val) => val.wamp_serialize(),
            None => Err(WampSerializeError::new(
                "empty optional cannot be serialized",
            )),
        }
    }
}

/// Trait for deserializing a Rust object from a WAMP value.
pub trait WampDeserialize: Sized {
    /// Deserializes the object from a WAMP value.
    fn wamp_deserialize(value: Value) -> Result<Self, WampDeserializeError>;
}

impl WampDeserialize for Value {
    fn wamp_deserialize(value: Value) -> Result<Self, WampDeserializeError> {
        Ok(value)
    }
}

impl WampDeserialize for Integer {
    fn wamp_deserialize(value: Value) -> Result<Self, WampDeserializeError> {
        match value {
            Value::Integer(val) => Ok(val),
            other => Err(WampDeserializeError::new(format!(
                "value must be an integer, got {}",
                other.type_name()
            ))),
        }
    }
}

impl WampDeserialize for i64 {
    fn wamp_deserialize(value: Value) -> Result<Self, WampDeserializeError> {
        match value {
            Value::Integer(val) => i64::try_from(val)
                .map_err(|_| WampDeserializeError::new("integer is out of range")),
            Value::Float(val) if val.fract() == 0.0 && val.abs() <= i64::MAX as f64 => {
                Ok(val as i64)
            }
            other => Err(WampDeserializeError::new(format!(
                "value must be a signed integer, got {}",
                other.type_name()
            ))),
        }
    }
}

impl WampDeserialize for f64 {
    fn wamp_deserialize(value: Value) -> Result<Self, WampDeserializeError> {
        value.float().ok_or_else(|| {
            WampDeserializeError::new(format!("value must be a number, got {}", value.type_name()))
        })
    }
}

impl WampDeserialize for String {
    fn wamp_deserialize(value: Value) -> Result<Self, WampDeserializeError> {
        match value {
            Value::String(val) => Ok(val),
            other => Err(WampDeserializeError::new(format!(
                "value must be a string, got {}",
                other.type_name()
            ))),
        }
    }
}

impl WampDeserialize for bool {
    fn wamp_deserialize(value: Value) -> Result<Self, WampDeserializeError> {
        match value {
            Value::Bool(val) => Ok(val),
            other => Err(WampDeserializeError::new(format!(
                "value must be a bool, got {}",
                other.type_name()
            ))),
        }
    }
}

impl WampDeserialize for List {
    fn wamp_deserialize(value: Value) -> Result<Self, WampDeserializeError> {
        match value {
            Value::List(val) => Ok(val),
            other => Err(WampDeserializeError::new(format!(
                "value must be a list, got {}",
                other.type_name()
            ))),
        }
    }
}

impl WampDeserialize for Dictionary {
    fn wamp_deserialize(value: Value) -> Result<Self, WampDeserializeError> {
        match value {
            Value::Dictionary(val) => Ok(val),
            other => Err(WampDeserializeError::new(format!(
                "value must be a dictionary, got {}",
                other.type_name()
            ))),
        }
    }
}

impl<T> WampDeserialize for Option<T>
where
    T: WampDeserialize,
{
    fn wamp_deserialize(value: Value) -> Result<Self, WampDeserializeError> {
        Ok(Some(T::wamp_deserialize(value)?))
    }
}

#[cfg(test)]
mod value_test {
    use crate::{
        Dictionary,
        List,
        Value,
        WampDeserialize,
    };

    #[test]
    fn deserializes_json_into_tagged_values() {
        assert_matches::assert_matches!(
            serde_json::from_str::<Value>(r#"[36, 555, 1, {}, [1, "a", true, -2, 0.5]]"#),
            Ok(Value::List(list)) => {
                pretty_assertions::assert_eq!(list, List::from_iter([
                    Value::Integer(36),
                    Value::Integer(555),
                    Value::Integer(1),
                    Value::Dictionary(Dictionary::default()),
                    Value::List(List::from_iter([
                        Value::Integer(1),
                        Value::String("a".to_owned()),
                        Value::Bool(true),
                        Value::Float(-2.0),
                        Value::Float(0.5),
                    ])),
                ]));
            }
        );
    }

    #[test]
    fn serializes_dictionary_as_map() {
        let value = Value::Dictionary(Dictionary::from_iter([(
            "flag".to_owned(),
            Value::Bool(true),
        )]));
        assert_matches::assert_matches!(serde_json::to_string(&value), Ok(json) => {
            assert_eq!(json, r#"{"flag":true}"#);
        });
    }

    #[test]
    fn survives_message_pack() {
        let value = Value::List(List::from_iter([
            Value::Integer(48),
            Value::String("proc.x".to_owned()),
            Value::Dictionary(Dictionary::from_iter([(
                "r".to_owned(),
                Value::String("v".to_owned()),
            )])),
        ]));
        let bytes = rmp_serde::to_vec(&value).unwrap();
        assert_matches::assert_matches!(rmp_serde::from_slice::<Value>(&bytes), Ok(decoded) => {
            pretty_assertions::assert_eq!(decoded, value);
        });
    }

    #[test]
    fn deserialization_reports_actual_type() {
        assert_matches::assert_matches!(
            String::wamp_deserialize(Value::Integer(1)),
            Err(err) => {
                assert_eq!(err.to_string(), "value must be a string, got integer");
            }
        );
        assert_matches::assert_matches!(i64::wamp_deserialize(Value::Float(-7.0)), Ok(-7));
        assert_matches::assert_matches!(i64::wamp_deserialize(Value::Float(0.5)), Err(_));
    }
}
