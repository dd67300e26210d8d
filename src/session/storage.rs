//! 会话存储后端
//!
//! 会话以三个类 cookie 条目保存（`access_token`、`refresh_token`、`user`）。
//! 后端只提供整体读取和整体替换，`SessionStore` 在此之上保证
//! 写入时不会出现只设置了部分条目的中间状态。

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use super::StoreError;

/// 条目名 -> 值
pub type Entries = BTreeMap<String, String>;

#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// 读取当前全部条目，不存在时返回空集合
    async fn load(&self) -> Result<Entries, StoreError>;

    /// 用给定条目整体替换存储内容，空集合表示清空
    async fn replace(&self, entries: Entries) -> Result<(), StoreError>;
}

/// 进程内存储
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<Entries>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn load(&self) -> Result<Entries, StoreError> {
        Ok(self.entries.read().await.clone())
    }

    async fn replace(&self, entries: Entries) -> Result<(), StoreError> {
        *self.entries.write().await = entries;
        Ok(())
    }
}

/// 文件存储（CLI 使用）
///
/// 写入先落到同目录临时文件再 rename；清空时删除文件。
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "session".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SessionStorage for FileStorage {
    async fn load(&self) -> Result<Entries, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Entries::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn replace(&self, entries: Entries) -> Result<(), StoreError> {
        if entries.is_empty() {
            return match tokio::fs::remove_file(&self.path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            };
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_vec_pretty(&entries)?;
        let temp = self.temp_path();

        // 残留的临时文件可能带有更宽的权限，mode 只在新建时生效
        match tokio::fs::remove_file(&temp).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        // 令牌文件仅当前用户可读，写入前即生效
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&temp).await?;
        file.write_all(&content).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&temp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), "Session file written");
        Ok(())
    }
}
