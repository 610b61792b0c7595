//! 存储配置
//!
use bon::Builder;
use serde::Deserialize;
use std::path::PathBuf;

/// 存储的记录目录、备份目录，以及当前应用写入的数据格式版本。
///
/// ```
/// use entity_store::config::StoreConfig;
///
/// let cfg = StoreConfig::builder()
///     .dir("/var/lib/app/data".into())
///     .backup_dir("/var/lib/app/backups".into())
///     .version(3)
///     .build();
/// assert_eq!(cfg.version, 3);
/// assert!(cfg.versioning_enabled());
/// ```
#[derive(Debug, Clone, Builder, Deserialize)]
pub struct StoreConfig {
    /// 存储根目录：包含 `<alias>/`、`tmp/` 与 `store.properties`。
    pub dir: PathBuf,
    /// 按日期分区的备份根目录。
    pub backup_dir: PathBuf,
    /// 期望的数据格式版本；`<= 0` 时关闭版本校验。
    #[builder(default)]
    #[serde(default)]
    pub version: i64,
}

impl StoreConfig {
    pub fn versioning_enabled(&self) -> bool {
        self.version > 0
    }
}
