use crate::{entity::Entity, error::StoreResult as Result};
use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `JsonSerializer` 写入磁盘的记录信封。
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct SerializedEntity {
    alias: String,
    payload: Value,
}

impl SerializedEntity {
    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }

    /// 将载荷解码为 `T`。
    pub fn to_entity<T: Entity>(&self) -> Result<T> {
        let entity = serde_json::from_value(self.payload.clone())?;
        Ok(entity)
    }

    /// 以给定别名包装实体。
    pub fn from_entity<T: Entity>(alias: &str, entity: &T) -> Result<Self> {
        Ok(Self {
            alias: alias.to_string(),
            payload: serde_json::to_value(entity)?,
        })
    }
}
