//! 变更前备份
//!
//! 已提交的记录在被覆盖或删除之前，当前内容会复制到
//! `<backup_dir>/<YYYY-MM-DD>/<type>/<file>`。同一天内同一文件的后续备份
//! 依次命名为 `2_<file>`、`3_<file>` 等。
//!
use crate::error::{StoreError, StoreResult as Result};
use crate::fsio;
use chrono::{Local, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};

type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;

pub struct BackupManager {
    backup_dir: PathBuf,
    today: Clock,
}

impl std::fmt::Debug for BackupManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupManager")
            .field("backup_dir", &self.backup_dir)
            .finish_non_exhaustive()
    }
}

impl BackupManager {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self::with_clock(backup_dir, || Local::now().date_naive())
    }

    /// 使用自定义的日期分区来源。
    pub fn with_clock<F>(backup_dir: impl Into<PathBuf>, today: F) -> Self
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        Self {
            backup_dir: backup_dir.into(),
            today: Box::new(today),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// 存放 `type_name` 当天备份的目录。
    pub fn partition(&self, type_name: &str) -> PathBuf {
        let date = (self.today)().format("%Y-%m-%d").to_string();
        self.backup_dir.join(date).join(type_name)
    }

    /// 在 `path` 被修改前归档。
    ///
    /// 返回备份位置；没有需要保留的内容时返回 `None`。
    pub fn backup_before_mutation(&self, path: &Path, type_name: &str) -> Result<Option<PathBuf>> {
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        if meta.is_dir() {
            return Err(StoreError::UnsupportedBackupTarget {
                path: path.to_path_buf(),
            });
        }

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return Err(StoreError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "file name is not UTF-8"),
            ));
        };

        let partition = self.partition(type_name);
        fsio::create_dir_all(&partition)?;

        let mut destination = partition.join(file_name);
        let mut n = 2usize;
        while destination.exists() {
            destination = partition.join(format!("{n}_{file_name}"));
            n += 1;
        }

        fs::copy(path, &destination).map_err(|e| StoreError::io(&destination, e))?;
        tracing::debug!(
            source = %path.display(),
            backup = %destination.display(),
            "backed up record"
        );
        Ok(Some(destination))
    }
}
