use anyhow::{
    Error,
    Result,
};

use crate::{
    core::types::Value,
    message::message::Message,
    serializer::serializer::Serializer,
};

/// A serializer implemented for MessagePack.
#[derive(Debug, Default)]
pub struct MessagePackSerializer {}

impl Serializer for MessagePackSerializer {
    fn serialize(&self, message: Message) -> Result<Vec<u8>> {
        rmp_serde::to_vec(&Value::from(message)).map_err(Error::new)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Value> {
        rmp_serde::from_slice(bytes).map_err(Error::new)
    }
}
