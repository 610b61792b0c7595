//! 存储统一错误定义。
//!
//! 所有操作都通过 `StoreError` 报告失败，文件系统错误总是携带出错路径。
//!
use std::path::PathBuf;
use thiserror::Error;

/// 存储的统一错误类型。
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    // --- 注册 / 索引 ---
    #[error("unknown entity type: {type_name}")]
    UnknownType { type_name: String },
    #[error("unknown entity: type={type_name}, id={id}")]
    UnknownEntity { type_name: String, id: String },
    #[error("alias conflict: type={type_name}, existing={existing}, requested={requested}")]
    AliasConflict {
        type_name: String,
        existing: String,
        requested: String,
    },
    #[error("invalid alias {alias:?}: {reason}")]
    InvalidAlias { alias: String, reason: &'static str },
    #[error("invalid entity id {id:?}: {reason}")]
    InvalidId { id: String, reason: &'static str },

    // --- 版本标记 ---
    #[error(
        "data stored in {dir} was created by a newer version of the application \
         (application version is {app_version}, data version is {data_version})"
    )]
    DataTooNew {
        dir: PathBuf,
        app_version: i64,
        data_version: i64,
    },
    #[error("invalid version marker in {path}: {value:?}")]
    InvalidVersionMarker { path: PathBuf, value: String },

    // --- 记录 / 文件 ---
    #[error("loading record from {path} failed: {source}")]
    RecordCorrupt {
        path: PathBuf,
        #[source]
        source: Box<StoreError>,
    },
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("backing up directories is not supported: {path}")]
    UnsupportedBackupTarget { path: PathBuf },

    // --- 序列化 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("no entity type registered for alias: {alias}")]
    UnregisteredAlias { alias: String },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch { expected: String, found: String },
}

impl StoreError {
    /// 带路径上下文的文件 I/O 错误。
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// 包装加载单条记录时发生的失败。
    pub fn record_corrupt(path: impl Into<PathBuf>, source: StoreError) -> Self {
        Self::RecordCorrupt {
            path: path.into(),
            source: Box::new(source),
        }
    }

    pub fn unknown_type(type_name: impl Into<String>) -> Self {
        Self::UnknownType {
            type_name: type_name.into(),
        }
    }

    pub fn unknown_entity(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self::UnknownEntity {
            type_name: type_name.into(),
            id: id.into(),
        }
    }

    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// 统一结果类型别名
pub type StoreResult<T> = Result<T, StoreError>;
