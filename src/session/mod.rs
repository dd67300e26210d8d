//! 客户端会话
//!
//! 会话由访问令牌、刷新令牌和缓存的用户资料组成。登录成功时三者一起写入，
//! 登出或刷新失败时一起清除；刷新成功只替换访问令牌。
//! `SessionStore` 是显式传递的会话句柄，clone 成本为一次 Arc 拷贝。

pub mod storage;

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::models::UserProfile;

pub use storage::{Entries, FileStorage, MemoryStorage, SessionStorage};

/// 访问令牌条目名
pub const ACCESS_TOKEN: &str = "access_token";
/// 刷新令牌条目名
pub const REFRESH_TOKEN: &str = "refresh_token";
/// 用户资料条目名（JSON）
pub const USER: &str = "user";

/// 会话存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

// 令牌不进入日志
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .field("user", &self.user.username)
            .finish()
    }
}

#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub fn file(path: impl Into<std::path::PathBuf>) -> Self {
        Self::new(Arc::new(FileStorage::new(path)))
    }

    /// 保存完整会话（一次整体替换）
    pub async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let mut entries = Entries::new();
        entries.insert(ACCESS_TOKEN.to_string(), session.access_token.clone());
        entries.insert(REFRESH_TOKEN.to_string(), session.refresh_token.clone());
        entries.insert(USER.to_string(), serde_json::to_string(&session.user)?);

        self.storage.replace(entries).await?;

        tracing::debug!(username = %session.user.username, "Session saved");
        Ok(())
    }

    /// 读取完整会话
    ///
    /// 只有访问令牌、刷新令牌和可解析的用户资料同时存在时才返回会话；
    /// 不校验令牌是否过期。
    pub async fn read(&self) -> Result<Option<Session>, StoreError> {
        let mut entries = self.storage.load().await?;

        let Some(access_token) = entries.remove(ACCESS_TOKEN) else {
            return Ok(None);
        };

        let refresh_token = entries.remove(REFRESH_TOKEN);
        let user = entries.remove(USER).and_then(|raw| parse_user(&raw));

        match (refresh_token, user) {
            (Some(refresh_token), Some(user)) => Ok(Some(Session {
                access_token,
                refresh_token,
                user,
            })),
            (refresh_token, user) => {
                tracing::warn!(
                    has_refresh_token = refresh_token.is_some(),
                    has_user = user.is_some(),
                    "Incomplete session in storage, treating as signed out"
                );
                Ok(None)
            }
        }
    }

    pub async fn access_token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.storage.load().await?.remove(ACCESS_TOKEN))
    }

    pub async fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.storage.load().await?.remove(REFRESH_TOKEN))
    }

    /// 缓存的用户资料；内容损坏时视为不存在
    pub async fn user(&self) -> Result<Option<UserProfile>, StoreError> {
        Ok(self
            .storage
            .load()
            .await?
            .remove(USER)
            .and_then(|raw| parse_user(&raw)))
    }

    /// 刷新成功后替换访问令牌，刷新令牌和用户资料保持不变
    pub async fn set_access_token(&self, token: &str) -> Result<(), StoreError> {
        let mut entries = self.storage.load().await?;
        entries.insert(ACCESS_TOKEN.to_string(), token.to_string());
        self.storage.replace(entries).await
    }

    /// 清除全部条目，可重复调用
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.storage.replace(Entries::new()).await?;
        tracing::debug!("Session cleared");
        Ok(())
    }

    pub async fn is_authenticated(&self) -> Result<bool, StoreError> {
        Ok(self.read().await?.is_some())
    }
}

fn parse_user(raw: &str) -> Option<UserProfile> {
    match serde_json::from_str(raw) {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::warn!(error = %e, "Cached user profile is not valid JSON");
            None
        }
    }
}
