//! User profile model, as returned by the backend's login endpoint

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// CMS 角色
///
/// 后端可能返回未知角色（例如注册时默认的 `viewer`），统一映射为 `Other`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    Author,
    #[default]
    #[serde(other)]
    Other,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Author => "author",
            Role::Other => "other",
        }
    }
}

fn default_language() -> String {
    "pl".to_string()
}

/// 缓存在会话中的用户资料（客户端只读）
///
/// 没有 profile 的账号，后端只返回基础字段，其余字段取默认值。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub dark_mode: bool,
    /// 仅 `/auth/me/` 返回
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_joined: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin || self.is_superuser
    }

    pub fn is_editor(&self) -> bool {
        self.is_admin() || self.role == Role::Editor
    }

    pub fn is_author(&self) -> bool {
        self.is_editor() || self.role == Role::Author
    }

    /// 显示名称：优先使用姓名，否则退回用户名
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}
