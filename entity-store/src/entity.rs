//! 实体约定
//!
//! 实体是带全局唯一字符串 id 和稳定类型标签的记录。存储同时保存多种类型的实体，
//! 内部通过类型擦除的 `StoredEntity` 处理，按需向调用方返回具体的 `Arc<T>`。
//!
use serde::{Serialize, de::DeserializeOwned};
use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

/// 可持久化的记录，具有唯一 id 和所属类型。
///
/// 通常由 `entity-store-macros` 的 `#[entity]` 实现。
pub trait Entity: Serialize + DeserializeOwned + Debug + Send + Sync + 'static {
    /// 稳定的类型标签，作为内存索引的键和备份目录名。
    const TYPE: &'static str;

    /// 覆盖或删除之前是否归档该类型的旧版本。
    const BACKUP: bool = true;

    /// 全局唯一标识，同时作为记录文件名（不含扩展名）。
    fn id(&self) -> &str;
}

/// 存储持有的 `Entity` 的类型擦除视图。
pub trait StoredEntity: Debug + Send + Sync + 'static {
    fn entity_id(&self) -> &str;

    fn entity_type(&self) -> &'static str;

    /// 具体类型是否需要备份。
    fn backup_enabled(&self) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Entity> StoredEntity for T {
    fn entity_id(&self) -> &str {
        Entity::id(self)
    }

    fn entity_type(&self) -> &'static str {
        T::TYPE
    }

    fn backup_enabled(&self) -> bool {
        T::BACKUP
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// 已存储实体的共享句柄。
pub type EntityRef = Arc<dyn StoredEntity>;

impl dyn StoredEntity {
    pub fn is<T: Entity>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Entity>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// 还原 `EntityRef` 背后的具体类型。
pub fn downcast<T: Entity>(entity: EntityRef) -> Option<Arc<T>> {
    entity.into_any().downcast::<T>().ok()
}
