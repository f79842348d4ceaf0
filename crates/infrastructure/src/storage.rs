//! 本地磁盘文件存储
//!
//! 对象键直接映射为 `root_dir` 下的相对路径，由 web 层以静态目录方式对外提供。

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use application::{ApplicationError, FileStorage};
use async_trait::async_trait;
use config::StorageConfig;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalFileStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root_dir),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 拒绝绝对路径与 `..`，防止写出根目录
    fn resolve(&self, key: &str) -> Result<PathBuf, ApplicationError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(ApplicationError::infrastructure(format!(
                "invalid storage key: {key}"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), ApplicationError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| ApplicationError::infrastructure(err.to_string()))?;
        }
        let size = bytes.len();
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|err| ApplicationError::infrastructure(err.to_string()))?;
        debug!(key, size, "文件已保存");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ApplicationError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ApplicationError::infrastructure(err.to_string())),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(root: &Path) -> LocalFileStorage {
        LocalFileStorage::new(&StorageConfig {
            root_dir: root.to_string_lossy().into_owned(),
            public_base_url: "http://localhost:8080/files/".to_string(),
        })
    }

    fn temp_root(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("talentbridge-storage-{name}-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_put_then_delete() {
        let root = temp_root("put");
        let storage = storage(&root);
        let key = "resume/a@example.com/resume-1-1.pdf";

        storage.put(key, b"%PDF-1.7".to_vec()).await.unwrap();
        assert_eq!(tokio::fs::read(root.join(key)).await.unwrap(), b"%PDF-1.7");

        storage.delete(key).await.unwrap();
        assert!(!root.join(key).exists());
        // 重复删除不报错
        storage.delete(key).await.unwrap();

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let storage = storage(&temp_root("escape"));
        for key in ["../etc/passwd", "/abs/path", "a/../../b", ""] {
            assert!(storage.put(key, vec![1]).await.is_err(), "{key}");
        }
    }

    #[test]
    fn test_public_url_joins_base() {
        let storage = storage(Path::new("/tmp/unused"));
        assert_eq!(
            storage.public_url("avatar/user-1.png"),
            "http://localhost:8080/files/avatar/user-1.png"
        );
    }
}
