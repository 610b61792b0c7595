//! 内存实体索引
//!
//! 每个已加载类型一张 `id -> entity` 表，按加载顺序保存。类型从磁盘加载后才有对应的表，
//! 之后的每次保存与删除都使其与已提交文件保持一致。
//!
use crate::{
    alias::validate_id,
    entity::EntityRef,
    error::{StoreError, StoreResult as Result},
    preparator::PreparatorChain,
    serializer::Serializer,
    specification::{EntityFilter, TypeFilter},
};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Debug)]
struct TypeIndex {
    type_name: &'static str,
    entities: HashMap<String, EntityRef>,
}

#[derive(Debug, Default)]
pub struct EntityIndex {
    types: Vec<TypeIndex>,
}

impl EntityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self, type_name: &str) -> bool {
        self.types.iter().any(|t| t.type_name == type_name)
    }

    /// 已加载的类型标签，按加载顺序。
    pub fn loaded_types(&self) -> Vec<&'static str> {
        self.types.iter().map(|t| t.type_name).collect()
    }

    fn type_index(&self, type_name: &str) -> Result<&TypeIndex> {
        self.types
            .iter()
            .find(|t| t.type_name == type_name)
            .ok_or_else(|| StoreError::unknown_type(type_name))
    }

    fn type_index_mut(&mut self, type_name: &str) -> Result<&mut TypeIndex> {
        self.types
            .iter_mut()
            .find(|t| t.type_name == type_name)
            .ok_or_else(|| StoreError::unknown_type(type_name))
    }

    /// 批量加载 `dir` 下直接存放的全部 `type_name` 记录。
    ///
    /// 返回加载的记录数；类型已加载时返回 `None`。扩展名与序列化器不符的文件被跳过，
    /// 其它任何失败都会中止加载并使该类型保持未加载状态。
    pub fn ensure_type_loaded<S: Serializer>(
        &mut self,
        type_name: &'static str,
        alias: &str,
        dir: &Path,
        serializer: &S,
        preparators: &PreparatorChain,
    ) -> Result<Option<usize>> {
        if self.is_loaded(type_name) {
            return Ok(None);
        }

        let suffix = format!(".{}", serializer.extension());
        let mut entities = HashMap::new();

        for path in list_files(dir)? {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !name.ends_with(&suffix) {
                tracing::warn!(path = %path.display(), "unsupported file, skipping");
                continue;
            }

            let entity = load_record(&path, type_name, alias, serializer, preparators)
                .map_err(|e| StoreError::record_corrupt(&path, e))?;
            entities.insert(entity.entity_id().to_string(), entity);
        }

        let count = entities.len();
        self.types.push(TypeIndex {
            type_name,
            entities,
        });
        Ok(Some(count))
    }

    /// 插入或替换实体。类型必须已加载。
    pub fn put(&mut self, type_name: &str, id: &str, entity: EntityRef) -> Result<()> {
        self.type_index_mut(type_name)?
            .entities
            .insert(id.to_string(), entity);
        Ok(())
    }

    /// 移除已索引的实体；id 不存在时报错。
    pub fn remove(&mut self, type_name: &str, id: &str) -> Result<EntityRef> {
        self.type_index_mut(type_name)?
            .entities
            .remove(id)
            .ok_or_else(|| StoreError::unknown_entity(type_name, id))
    }

    pub fn contains(&self, type_name: &str, id: &str) -> bool {
        self.type_index(type_name)
            .map(|t| t.entities.contains_key(id))
            .unwrap_or(false)
    }

    pub fn get(&self, type_name: &str, id: &str) -> Option<EntityRef> {
        self.type_index(type_name)
            .ok()
            .and_then(|t| t.entities.get(id).cloned())
    }

    /// 按加载顺序在各类型中的第一个命中。
    pub fn get_by_id(&self, id: &str) -> Option<EntityRef> {
        self.types
            .iter()
            .find_map(|t| t.entities.get(id).cloned())
    }

    /// 全部命中，按加载顺序分类型排列。
    pub fn get_by_ids<I, S>(&self, ids: I) -> Vec<EntityRef>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: Vec<S> = ids.into_iter().collect();
        let mut result = Vec::with_capacity(ids.len());
        for t in &self.types {
            for id in &ids {
                if let Some(entity) = t.entities.get(id.as_ref()) {
                    result.push(entity.clone());
                }
            }
        }
        result
    }

    /// 某一类型的全部实体；类型未加载时失败。
    pub fn entities_of(&self, type_name: &str) -> Result<Vec<EntityRef>> {
        Ok(self.type_index(type_name)?.entities.values().cloned().collect())
    }

    fn candidates<'a>(
        &'a self,
        type_filter: Option<TypeFilter<'a>>,
        entity_filter: EntityFilter<'a>,
    ) -> impl Iterator<Item = &'a EntityRef> + 'a {
        self.types
            .iter()
            .filter(move |t| type_filter.is_none_or(|f| f.is_satisfied_by(t.type_name)))
            .flat_map(|t| t.entities.values())
            .filter(move |e| entity_filter.is_satisfied_by(e.as_ref()))
    }

    /// 全部匹配实体，不含重复。
    pub fn query(
        &self,
        type_filter: Option<TypeFilter<'_>>,
        entity_filter: EntityFilter<'_>,
    ) -> Vec<EntityRef> {
        let mut seen = HashSet::new();
        self.candidates(type_filter, entity_filter)
            .filter(|e| seen.insert((e.entity_type(), e.entity_id().to_string())))
            .cloned()
            .collect()
    }

    pub fn query_first(
        &self,
        type_filter: Option<TypeFilter<'_>>,
        entity_filter: EntityFilter<'_>,
    ) -> Option<EntityRef> {
        self.candidates(type_filter, entity_filter).next().cloned()
    }

    pub fn count(
        &self,
        type_filter: Option<TypeFilter<'_>>,
        entity_filter: EntityFilter<'_>,
    ) -> usize {
        self.candidates(type_filter, entity_filter).count()
    }
}

/// `dir` 下直接存放的普通文件，按名称排序。目录不存在时视为没有文件。
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(dir, e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

fn load_record<S: Serializer>(
    path: &Path,
    type_name: &str,
    alias: &str,
    serializer: &S,
    preparators: &PreparatorChain,
) -> Result<EntityRef> {
    preparators.prepare(path, type_name, alias)?;

    let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    let entity = serializer.deserialize(&mut BufReader::new(file))?;
    if entity.entity_type() != type_name {
        return Err(StoreError::type_mismatch(type_name, entity.entity_type()));
    }
    validate_id(entity.entity_id())?;
    Ok(entity)
}
