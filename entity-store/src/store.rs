//! 文件实体存储（编排层）
//!
//! 将别名注册表、版本守卫、备份管理器与索引组合为对外的存储 API。
//! 所有操作都在同一把存储级锁下执行，索引不会与其镜像的文件出现不一致。
//!
//! 保存流程为 `absent → staged → committed`：记录先写入 `<dir>/tmp/<id>.<ext>`，
//! 若已有提交版本则先归档，再通过重命名使新内容出现在 `<dir>/<alias>/<id>.<ext>`。
//!
use crate::{
    alias::{AliasRegistry, STAGING_DIR, validate_id},
    backup::BackupManager,
    config::StoreConfig,
    entity::{Entity, EntityRef, StoredEntity, downcast},
    error::{StoreError, StoreResult as Result},
    fsio,
    index::EntityIndex,
    preparator::{EntityFilePreparator, PreparatorChain},
    serializer::{JsonSerializer, Serializer},
    specification::{EntityFilter, TypeFilter},
    version::VersionGuard,
};
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct Inner<S> {
    serializer: S,
    aliases: AliasRegistry,
    version: VersionGuard,
    backups: BackupManager,
    index: EntityIndex,
    preparators: PreparatorChain,
}

/// 每个实体一个文件的嵌入式对象存储。
pub struct FileEntityStore<S: Serializer = JsonSerializer> {
    dir: PathBuf,
    backup_dir: PathBuf,
    version: i64,
    inner: Mutex<Inner<S>>,
}

impl FileEntityStore<JsonSerializer> {
    /// 使用 JSON 编解码的存储。首次操作之前不做任何 I/O。
    pub fn open(config: StoreConfig) -> Self {
        Self::with_serializer(config, JsonSerializer::new())
    }
}

impl<S: Serializer> FileEntityStore<S> {
    pub fn with_serializer(config: StoreConfig, serializer: S) -> Self {
        let StoreConfig {
            dir,
            backup_dir,
            version,
        } = config;
        let inner = Inner {
            serializer,
            aliases: AliasRegistry::new(),
            version: VersionGuard::new(&dir, version),
            backups: BackupManager::new(&backup_dir),
            index: EntityIndex::new(),
            preparators: PreparatorChain::default(),
        };
        Self {
            dir,
            backup_dir,
            version,
            inner: Mutex::new(inner),
        }
    }

    /// 替换备份管理器，例如固定日期分区。
    pub fn with_backup_manager(self, backups: BackupManager) -> Self {
        let backup_dir = backups.backup_dir().to_path_buf();
        let mut inner = self.inner.into_inner();
        inner.backups = backups;
        Self {
            dir: self.dir,
            backup_dir,
            version: self.version,
            inner: Mutex::new(inner),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// 期望的数据格式版本。
    pub fn version(&self) -> i64 {
        self.version
    }

    /// `load` 期间在每个记录文件解码前执行。
    pub fn add_preparator(&self, preparator: Arc<dyn EntityFilePreparator>) {
        self.inner.lock().preparators.push(preparator);
    }

    /// 将 `T` 绑定到 `alias`，不加载任何数据。
    pub fn set_alias<T: Entity>(&self, alias: &str) -> Result<()> {
        let mut guard = self.inner.lock();
        Self::register::<T>(&mut guard, alias)
    }

    fn register<T: Entity>(inner: &mut Inner<S>, alias: &str) -> Result<()> {
        if inner.aliases.register(T::TYPE, alias)? {
            inner.serializer.register_alias::<T>(alias);
        }
        Ok(())
    }

    /// 存储中有更新版本应用写入的数据时拒绝继续。
    pub fn check_compatibility(&self) -> Result<()> {
        self.inner.lock().version.check_compatibility()
    }

    /// 以 `alias` 注册 `T`，并索引 `<dir>/<alias>` 下的全部记录。
    ///
    /// 返回之后已索引的 `T` 实体数量。重复加载同一类型不会重新扫描目录。
    pub fn load<T: Entity>(&self, alias: &str) -> Result<usize> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        Self::register::<T>(inner, alias)?;
        inner.version.check_compatibility()?;

        let dir = self.dir.join(alias);
        tracing::info!(alias, type_name = T::TYPE, "loading entities");
        let loaded = inner.index.ensure_type_loaded(
            T::TYPE,
            alias,
            &dir,
            &inner.serializer,
            &inner.preparators,
        )?;
        match loaded {
            Some(count) => {
                tracing::info!(alias, count, "loaded entities");
                Ok(count)
            }
            None => Ok(inner.index.entities_of(T::TYPE)?.len()),
        }
    }

    fn record_file(&self, alias: &str, id: &str, ext: &str) -> PathBuf {
        self.dir.join(alias).join(format!("{id}.{ext}"))
    }

    fn staging_file(&self, id: &str, ext: &str) -> PathBuf {
        self.dir.join(STAGING_DIR).join(format!("{id}.{ext}"))
    }

    /// 持久化 `entity`，并使其成为索引中的当前副本。
    pub fn save<T: Entity>(&self, entity: T) -> Result<Arc<T>> {
        let entity = Arc::new(entity);
        self.save_shared(entity.clone())?;
        Ok(entity)
    }

    /// 同 `save`，用于调用方已共享持有的实体。
    pub fn save_shared<T: Entity>(&self, entity: Arc<T>) -> Result<()> {
        validate_id(entity.id())?;
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        inner.version.record_version()?;
        let alias = inner.aliases.alias_of(T::TYPE)?.to_string();
        if !inner.index.is_loaded(T::TYPE) {
            return Err(StoreError::unknown_type(T::TYPE));
        }

        let id = entity.id().to_string();
        let ext = inner.serializer.extension().to_string();
        let staged = self.staging_file(&id, &ext);
        let path = self.record_file(&alias, &id, &ext);
        let stored: &dyn StoredEntity = entity.as_ref();

        let committed = write_staged(&inner.serializer, stored, &staged)
            .and_then(|()| {
                if stored.backup_enabled() {
                    inner.backups.backup_before_mutation(&path, T::TYPE)?;
                }
                Ok(())
            })
            .and_then(|()| fsio::move_file(&staged, &path));
        if let Err(e) = committed {
            discard_staged(&staged);
            return Err(e);
        }

        let erased: EntityRef = entity;
        inner.index.put(T::TYPE, &id, erased)?;
        tracing::debug!(type_name = T::TYPE, id = %id, path = %path.display(), "entity saved");
        Ok(())
    }

    /// 归档并删除 `entity` 的已提交记录，再将其移出索引。
    pub fn delete<T: Entity>(&self, entity: &T) -> Result<()> {
        validate_id(entity.id())?;
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        inner.version.check_compatibility()?;
        let alias = inner.aliases.alias_of(T::TYPE)?.to_string();
        let id = entity.id();
        if !inner.index.is_loaded(T::TYPE) {
            return Err(StoreError::unknown_type(T::TYPE));
        }
        if !inner.index.contains(T::TYPE, id) {
            return Err(StoreError::unknown_entity(T::TYPE, id));
        }

        let path = self.record_file(&alias, id, inner.serializer.extension());
        if StoredEntity::backup_enabled(entity) {
            inner.backups.backup_before_mutation(&path, T::TYPE)?;
        }

        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) if path.exists() => return Err(StoreError::io(&path, e)),
            Err(_) => {}
        }

        inner.index.remove(T::TYPE, id)?;
        tracing::debug!(type_name = T::TYPE, id, path = %path.display(), "entity deleted");
        Ok(())
    }

    /// 在所有已加载类型中查找该 id 的第一个实体。
    pub fn get_by_id(&self, id: &str) -> Option<EntityRef> {
        self.inner.lock().index.get_by_id(id)
    }

    /// 在 `T` 自身的索引内按类型查找。
    pub fn get<T: Entity>(&self, id: &str) -> Option<Arc<T>> {
        self.inner
            .lock()
            .index
            .get(T::TYPE, id)
            .and_then(downcast::<T>)
    }

    pub fn get_by_ids<I, Id>(&self, ids: I) -> Vec<EntityRef>
    where
        I: IntoIterator<Item = Id>,
        Id: AsRef<str>,
    {
        self.inner.lock().index.get_by_ids(ids)
    }

    /// 任意一个匹配的实体；跨类型的遍历顺序不作保证。
    pub fn get_entity(
        &self,
        type_filter: Option<TypeFilter<'_>>,
        entity_filter: EntityFilter<'_>,
    ) -> Option<EntityRef> {
        self.inner
            .lock()
            .index
            .query_first(type_filter, entity_filter)
    }

    pub fn get_entities(
        &self,
        type_filter: Option<TypeFilter<'_>>,
        entity_filter: EntityFilter<'_>,
    ) -> Vec<EntityRef> {
        self.inner.lock().index.query(type_filter, entity_filter)
    }

    pub fn get_entities_count(
        &self,
        type_filter: Option<TypeFilter<'_>>,
        entity_filter: EntityFilter<'_>,
    ) -> usize {
        self.inner.lock().index.count(type_filter, entity_filter)
    }

    /// 已索引的全部 `T`。`T` 未加载时失败。
    pub fn all<T: Entity>(&self) -> Result<Vec<Arc<T>>> {
        let entities = self.inner.lock().index.entities_of(T::TYPE)?;
        Ok(entities.into_iter().filter_map(downcast::<T>).collect())
    }

    pub fn loaded_types(&self) -> Vec<&'static str> {
        self.inner.lock().index.loaded_types()
    }
}

fn write_staged<S: Serializer>(
    serializer: &S,
    entity: &dyn StoredEntity,
    staged: &Path,
) -> Result<()> {
    fsio::ensure_parent(staged)?;
    let file = File::create(staged).map_err(|e| StoreError::io(staged, e))?;
    let mut out = BufWriter::new(file);
    serializer.serialize(entity, &mut out)?;
    let file = out
        .into_inner()
        .map_err(|e| StoreError::io(staged, e.into_error()))?;
    file.sync_all().map_err(|e| StoreError::io(staged, e))
}

fn discard_staged(staged: &Path) {
    if let Err(e) = fs::remove_file(staged) {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!(path = %staged.display(), error = %e, "failed to remove staging file");
        }
    }
}
