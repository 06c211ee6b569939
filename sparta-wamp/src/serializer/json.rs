use anyhow::{
    Error,
    Result,
};

use crate::{
    core::types::Value,
    message::message::Message,
    serializer::serializer::Serializer,
};

/// A serializer implemented for JavaScript Object Notation.
#[derive(Debug, Default)]
pub struct JsonSerializer {}

impl Serializer for JsonSerializer {
    fn serialize(&self, message: Message) -> Result<Vec<u8>> {
        serde_json::to_vec(&Value::from(message)).map_err(Error::new)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Value> {
        serde_json::from_slice(bytes).map_err(Error::new)
    }
}
