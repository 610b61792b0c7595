//! 嵌入式文件实体存储
//!
//! 每个实体对应 `<dir>/<alias>/<id>.<ext>` 下的一个文件，已加载的类型同时镜像到内存索引：
//! - 实体（`entity`）带唯一 id 与稳定的类型标签
//! - 类型通过别名绑定到目录名（`alias`）
//! - 写入先暂存再重命名到位（`store`）
//! - 变更前按天归档旧版本（`backup`）
//! - 版本标记拒绝更新版本应用写入的数据（`version`）
//! - 查询在索引（`index`）上组合谓词（`specification`）
//!
//! 典型用法：
//! 1. 用 `entity-store-macros` 的 `#[entity]` 定义实体；
//! 2. 由 `StoreConfig` 打开 `FileEntityStore`；
//! 3. 保存或查询前先对每个类型调用 `load::<T>(alias)`。
//!
pub mod alias;
pub mod backup;
pub mod config;
pub mod entity;
pub mod error;
pub mod index;
pub mod preparator;
pub mod serializer;
pub mod specification;
pub mod store;
pub mod version;

mod fsio;

pub use config::StoreConfig;
pub use entity::{Entity, EntityRef, StoredEntity, downcast};
pub use error::{StoreError, StoreResult};
pub use preparator::EntityFilePreparator;
pub use serializer::{JsonSerializer, Serializer};
pub use store::FileEntityStore;

// 使 `#[entity]` 在本 crate 的测试中也能展开为 `::entity_store::...`
extern crate self as entity_store;
