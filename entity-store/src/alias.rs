//! 类型与别名绑定
//!
//! 别名是实体类型所在的短目录名。绑定以类型标签（`Entity::TYPE`）为键，一经建立不可更改。
//!
use crate::error::{StoreError, StoreResult as Result};
use std::collections::HashMap;

/// 存储根目录下保留给暂存文件的目录。
pub const STAGING_DIR: &str = "tmp";

/// 别名必须能作为存储根目录下的单层目录名。
pub fn validate_alias(alias: &str) -> Result<()> {
    let reason = if alias.is_empty() {
        "must not be empty"
    } else if alias == "." || alias == ".." {
        "must not be a relative path component"
    } else if alias.contains(['/', '\\']) {
        "must not contain path separators"
    } else if alias == STAGING_DIR {
        "reserved for staging files"
    } else {
        return Ok(());
    };
    Err(StoreError::InvalidAlias {
        alias: alias.to_string(),
        reason,
    })
}

/// id 必须能直接作为 `<dir>/<alias>` 下的文件名（不含扩展名）。
pub fn validate_id(id: &str) -> Result<()> {
    let reason = if id.is_empty() {
        "must not be empty"
    } else if id == "." || id == ".." {
        "must not be a relative path component"
    } else if id.contains(['/', '\\']) {
        "must not contain path separators"
    } else {
        return Ok(());
    };
    Err(StoreError::InvalidId {
        id: id.to_string(),
        reason,
    })
}

#[derive(Debug, Default)]
pub struct AliasRegistry {
    aliases: HashMap<&'static str, String>,
    types: HashMap<String, &'static str>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 将 `type_name` 绑定到 `alias`。
    ///
    /// 新绑定返回 `Ok(true)`，完全相同的绑定已存在时返回 `Ok(false)`。
    /// 类型改绑或别名被另一类型复用都会被拒绝。
    pub fn register(&mut self, type_name: &'static str, alias: &str) -> Result<bool> {
        validate_alias(alias)?;

        if let Some(existing) = self.aliases.get(type_name) {
            if existing == alias {
                return Ok(false);
            }
            return Err(StoreError::AliasConflict {
                type_name: type_name.to_string(),
                existing: existing.clone(),
                requested: alias.to_string(),
            });
        }

        if let Some(owner) = self.types.get(alias) {
            return Err(StoreError::AliasConflict {
                type_name: type_name.to_string(),
                existing: format!("{alias} (bound to {owner})"),
                requested: alias.to_string(),
            });
        }

        self.aliases.insert(type_name, alias.to_string());
        self.types.insert(alias.to_string(), type_name);
        Ok(true)
    }

    pub fn alias_of(&self, type_name: &str) -> Result<&str> {
        self.aliases
            .get(type_name)
            .map(String::as_str)
            .ok_or_else(|| StoreError::unknown_type(type_name))
    }

    pub fn type_of(&self, alias: &str) -> Option<&'static str> {
        self.types.get(alias).copied()
    }
}
