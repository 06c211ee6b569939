use std::fmt::Display;

use serde::{
    Deserialize,
    Serialize,
    de::{
        Unexpected,
        Visitor,
    },
};
use thiserror::Error;

use crate::core::types::{
    Integer,
    Value,
    WampDeserialize,
    WampDeserializeError,
    WampSerialize,
    WampSerializeError,
};

/// An integer ID, used for identification of sessions, resources, and requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Id(u64);

impl Id {
    /// The minimum allowable value of an ID.
    pub const MIN: Id = Id(1);

    /// The maximum allowable value of an ID.
    pub const MAX: Id = Id(1 << 53);

    /// The raw integer value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Default for Id {
    fn default() -> Self {
        Id::MIN
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl WampSerialize for Id {
    fn wamp_serialize(self) -> Result<Value, WampSerializeError> {
        self.0.wamp_serialize()
    }
}

impl WampDeserialize for Id {
    fn wamp_deserialize(value: Value) -> Result<Self, WampDeserializeError> {
        let value = Integer::wamp_deserialize(value)?;
        Id::try_from(value).map_err(|err| WampDeserializeError::new(err.to_string()))
    }
}

impl From<Id> for Value {
    fn from(value: Id) -> Self {
        Value::Integer(value.0)
    }
}

/// Error for an ID being out of range.
#[derive(Debug, Error)]
#[error("{value} is out of range for IDs")]
pub struct IdOutOfRange {
    value: u64,
}

impl TryFrom<u64> for Id {
    type Error = IdOutOfRange;
    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value < Self::MIN.0 || value > Self::MAX.0 {
            Err(IdOutOfRange { value })
        } else {
            Ok(Id(value))
        }
    }
}

struct IdVisitor;

impl<'de> Visitor<'de> for IdVisitor {
    type Value = Id;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            formatter,
            "an unsigned integer in the range [{}, {}]",
            Id::MIN,
            Id::MAX
        )
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Id::try_from(v).map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_u64(IdVisitor)
    }
}

/// An ID allocator.
pub trait IdAllocator: Send {
    /// Generates a new ID.
    fn generate_id(&mut self) -> Id;

    /// Resets the allocator to its initial state.
    fn reset(&mut self);
}

/// An ID allocator that generates IDs sequentially.
///
/// Used for session-scoped request IDs. IDs only repeat after wrapping around [`Id::MAX`].
#[derive(Debug, Default)]
pub struct SequentialIdAllocator {
    next: Id,
}

impl IdAllocator for SequentialIdAllocator {
    fn generate_id(&mut self) -> Id {
        let id = self.next;
        self.next = if id == Id::MAX {
            Id::MIN
        } else {
            Id(id.0 + 1)
        };
        id
    }

    fn reset(&mut self) {
        self.next = Id::MIN;
    }
}

#[cfg(test)]
mod id_test {
    use crate::core::{
        id::{
            Id,
            IdAllocator,
            SequentialIdAllocator,
        },
        types::{
            Value,
            WampDeserialize,
        },
    };

    #[test]
    fn fails_deserialization_out_of_range() {
        assert_matches::assert_matches!(serde_json::from_str::<Id>(r#"0"#), Err(err) => {
            assert!(err.to_string().contains("expected an unsigned integer in the range"));
        });
        assert_matches::assert_matches!(serde_json::from_str::<Id>(r#"9007199254740993"#), Err(err) => {
            assert!(err.to_string().contains("expected an unsigned integer in the range"));
        });
        assert_matches::assert_matches!(Id::wamp_deserialize(Value::Integer(0)), Err(_));
        assert_matches::assert_matches!(Id::wamp_deserialize(Value::String("1".to_owned())), Err(_));
    }

    #[test]
    fn sequential_allocator_increases_and_resets() {
        let mut allocator = SequentialIdAllocator::default();
        let ids = (0..3).map(|_| allocator.generate_id()).collect::<Vec<_>>();
        pretty_assertions::assert_eq!(
            ids,
            Vec::from_iter([1, 2, 3].map(|id| Id::try_from(id).unwrap()))
        );
        allocator.reset();
        assert_eq!(allocator.generate_id(), Id::MIN);
    }

    #[test]
    fn sequential_allocator_wraps_at_max() {
        let mut allocator = SequentialIdAllocator { next: Id::MAX };
        assert_eq!(allocator.generate_id(), Id::MAX);
        assert_eq!(allocator.generate_id(), Id::MIN);
    }
}
