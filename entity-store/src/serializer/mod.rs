//! 实体编解码接口
//!
//! 存储本身不解析记录内容：实体交给 `Serializer` 编码为字节，反之亦然。
//! 某类型的记录在首次读写之前，会先连同别名一起向序列化器注册，
//! 以便编解码器标记记录并在之后选对解码方式。
//!
mod json;
mod serialized_entity;

pub use json::JsonSerializer;
pub use serialized_entity::SerializedEntity;

use crate::{
    entity::{Entity, EntityRef, StoredEntity},
    error::StoreResult as Result,
};
use std::io::{Read, Write};

pub trait Serializer: Send + 'static {
    /// 记录文件扩展名，不含点号。
    fn extension(&self) -> &str;

    /// 将 `T` 绑定到 `alias`，用于编码与解码。
    fn register_alias<T: Entity>(&mut self, alias: &str);

    fn serialize(&self, entity: &dyn StoredEntity, out: &mut dyn Write) -> Result<()>;

    fn deserialize(&self, input: &mut dyn Read) -> Result<EntityRef>;
}
