//! 存储各组件共用的文件系统工具。
//!
//! 所有失败都映射为带出错路径的 `StoreError::Io`。

use crate::error::{StoreError, StoreResult as Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

pub(crate) fn create_dir_all(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))
}

pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => create_dir_all(parent),
        _ => Ok(()),
    }
}

/// 将 `from` 重命名为 `to`，覆盖 `to` 处已有的文件。
pub(crate) fn move_file(from: &Path, to: &Path) -> Result<()> {
    ensure_parent(to)?;
    fs::rename(from, to).map_err(|e| StoreError::io(to, e))
}

/// 写入 `tmp_path` 并 fsync，再重命名到 `path`。
pub(crate) fn atomic_write_file(tmp_path: &Path, path: &Path, content: &[u8]) -> Result<()> {
    ensure_parent(tmp_path)?;
    let mut file = File::create(tmp_path).map_err(|e| StoreError::io(tmp_path, e))?;
    file.write_all(content)
        .map_err(|e| StoreError::io(tmp_path, e))?;
    file.sync_all().map_err(|e| StoreError::io(tmp_path, e))?;
    drop(file);
    move_file(tmp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_parents_and_replaces() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("a/b/file.txt");
        let staging = tmp.path().join("tmp/file.txt");

        atomic_write_file(&staging, &target, b"one").unwrap();
        atomic_write_file(&staging, &target, b"two").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "two");
        assert!(!staging.exists());
    }

    #[test]
    fn move_missing_source_reports_target_path() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("x/y.txt");
        let err = move_file(&tmp.path().join("nope"), &target).unwrap_err();
        match err {
            StoreError::Io { path, .. } => assert_eq!(path, target),
            other => panic!("unexpected {other:?}"),
        }
    }
}
