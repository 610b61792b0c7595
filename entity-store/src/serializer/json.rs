use super::{SerializedEntity, Serializer};
use crate::{
    entity::{Entity, EntityRef, StoredEntity},
    error::{StoreError, StoreResult as Result},
};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;

type EncodeFn = fn(&str, &dyn StoredEntity) -> Result<SerializedEntity>;
type DecodeFn = fn(&SerializedEntity) -> Result<EntityRef>;

struct Codec {
    alias: String,
    encode: EncodeFn,
    decode: DecodeFn,
}

/// JSON 编解码：每条记录是带类型别名标记、格式化输出的 `SerializedEntity`。
#[derive(Default)]
pub struct JsonSerializer {
    by_type: HashMap<&'static str, Codec>,
    by_alias: HashMap<String, &'static str>,
}

impl JsonSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已注册的别名（只读视图）
    pub fn registered_aliases(&self) -> Vec<&str> {
        self.by_alias.keys().map(String::as_str).collect()
    }
}

fn encode<T: Entity>(alias: &str, entity: &dyn StoredEntity) -> Result<SerializedEntity> {
    let Some(typed) = entity.downcast_ref::<T>() else {
        return Err(StoreError::type_mismatch(T::TYPE, entity.entity_type()));
    };
    SerializedEntity::from_entity(alias, typed)
}

fn decode<T: Entity>(record: &SerializedEntity) -> Result<EntityRef> {
    let entity: T = record.to_entity()?;
    Ok(Arc::new(entity))
}

impl Serializer for JsonSerializer {
    fn extension(&self) -> &str {
        "json"
    }

    fn register_alias<T: Entity>(&mut self, alias: &str) {
        let codec = Codec {
            alias: alias.to_string(),
            encode: encode::<T>,
            decode: decode::<T>,
        };
        if let Some(previous) = self.by_type.insert(T::TYPE, codec) {
            self.by_alias.remove(&previous.alias);
        }
        self.by_alias.insert(alias.to_string(), T::TYPE);
    }

    fn serialize(&self, entity: &dyn StoredEntity, out: &mut dyn Write) -> Result<()> {
        let codec = self
            .by_type
            .get(entity.entity_type())
            .ok_or_else(|| StoreError::unknown_type(entity.entity_type()))?;
        let record = (codec.encode)(&codec.alias, entity)?;
        serde_json::to_writer_pretty(out, &record)?;
        Ok(())
    }

    fn deserialize(&self, input: &mut dyn Read) -> Result<EntityRef> {
        let record: SerializedEntity = serde_json::from_reader(input)?;
        let codec = self
            .by_alias
            .get(record.alias())
            .and_then(|type_name| self.by_type.get(type_name))
            .ok_or_else(|| StoreError::UnregisteredAlias {
                alias: record.alias().to_string(),
            })?;
        (codec.decode)(&record)
    }
}
