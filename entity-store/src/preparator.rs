//! 记录文件预处理
//!
//! 记录格式演进时，旧文件可以在解码前就地改写。预处理器在 `load` 期间
//! 按注册顺序对每个记录文件各执行一次。预处理失败与记录损坏一样会中止加载。
//!
use crate::error::StoreResult as Result;
use std::path::Path;
use std::sync::Arc;

pub trait EntityFilePreparator: Send + Sync {
    /// 在 `path` 按 `type_name` 解码前检查或改写它。
    fn prepare(&self, path: &Path, type_name: &str, alias: &str) -> Result<()>;
}

impl<T> EntityFilePreparator for Arc<T>
where
    T: EntityFilePreparator + ?Sized,
{
    fn prepare(&self, path: &Path, type_name: &str, alias: &str) -> Result<()> {
        (**self).prepare(path, type_name, alias)
    }
}

/// 有序的预处理器列表。
#[derive(Default, Clone)]
pub struct PreparatorChain {
    stages: Vec<Arc<dyn EntityFilePreparator>>,
}

impl PreparatorChain {
    pub fn push(&mut self, stage: Arc<dyn EntityFilePreparator>) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn prepare(&self, path: &Path, type_name: &str, alias: &str) -> Result<()> {
        self.stages
            .iter()
            .try_for_each(|stage| stage.prepare(path, type_name, alias))
    }
}

impl FromIterator<Arc<dyn EntityFilePreparator>> for PreparatorChain {
    fn from_iter<I: IntoIterator<Item = Arc<dyn EntityFilePreparator>>>(iter: I) -> Self {
        Self {
            stages: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // 将旧的 `username` 字段改名为 `name`
    struct RenameUsername;
    impl EntityFilePreparator for RenameUsername {
        fn prepare(&self, path: &Path, _type_name: &str, _alias: &str) -> Result<()> {
            let text = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
            let mut v: serde_json::Value = serde_json::from_str(&text)?;
            if let Some(payload) = v.get_mut("payload").and_then(|p| p.as_object_mut()) {
                if let Some(u) = payload.remove("username") {
                    payload.insert("name".to_string(), u);
                }
            }
            fs::write(path, serde_json::to_vec_pretty(&v)?).map_err(|e| StoreError::io(path, e))
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);
    impl EntityFilePreparator for Recorder {
        fn prepare(&self, path: &Path, type_name: &str, alias: &str) -> Result<()> {
            let name = path.file_name().unwrap().to_string_lossy();
            self.0
                .lock()
                .unwrap()
                .push(format!("{type_name}/{alias}/{name}"));
            Ok(())
        }
    }

    #[test]
    fn stages_run_in_order_and_rewrite_files() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("u1.json");
        fs::write(
            &path,
            r#"{"alias":"users","payload":{"id":"u1","username":"alice"}}"#,
        )
        .unwrap();

        let recorder = Arc::new(Recorder::default());
        let chain: PreparatorChain = vec![
            Arc::new(RenameUsername) as Arc<dyn EntityFilePreparator>,
            recorder.clone(),
        ]
        .into_iter()
        .collect();

        chain.prepare(&path, "User", "users").unwrap();

        let v: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(v["payload"]["name"], "alice");
        assert!(v["payload"].get("username").is_none());
        assert_eq!(*recorder.0.lock().unwrap(), vec!["User/users/u1.json"]);
    }

    #[test]
    fn first_failure_stops_the_chain() {
        let tmp = TempDir::new().unwrap();
        let recorder = Arc::new(Recorder::default());
        let mut chain = PreparatorChain::default();
        chain.push(Arc::new(RenameUsername));
        chain.push(recorder.clone());

        let err = chain
            .prepare(&tmp.path().join("missing.json"), "User", "users")
            .unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(recorder.0.lock().unwrap().is_empty());
        assert_eq!(chain.len(), 2);
    }
}
