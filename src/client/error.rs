//! 后端调用错误
//!
//! 网关只在本地恢复 401（一次刷新），其余错误原样交给调用方。

use serde_json::Value;
use thiserror::Error;

use crate::session::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// 传输层错误：连接失败、超时等
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// 401，且已无法在本地恢复
    #[error("Authentication failed: {message}")]
    Unauthorized { message: String },

    /// 后端拒绝了凭据或表单
    #[error("Validation failed: {0}")]
    Validation(String),

    /// 其余 4xx / 5xx，原样透传
    #[error("Backend responded with {status}: {message}")]
    Backend {
        status: u16,
        message: String,
        body: Value,
    },

    /// 刷新失败，会话已清除，需要重新登录
    #[error("Session invalidated, login required at {login_path}")]
    SessionInvalidated {
        login_path: String,
        #[source]
        cause: Box<ApiError>,
    },

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// 根据后端响应构造错误
    pub(crate) fn from_response(status: u16, body: Value) -> Self {
        let message = backend_message(&body)
            .unwrap_or_else(|| default_message(status).to_string());

        match status {
            401 => ApiError::Unauthorized { message },
            _ => ApiError::Backend {
                status,
                message,
                body,
            },
        }
    }

    /// 后端返回的 HTTP 状态码（如果有）
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Backend { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// 调用方应跳转到登录页
    pub fn is_login_required(&self) -> bool {
        matches!(self, ApiError::SessionInvalidated { .. })
    }

    /// 需要跳转时的登录入口
    pub fn login_path(&self) -> Option<&str> {
        match self {
            ApiError::SessionInvalidated { login_path, .. } => Some(login_path),
            _ => None,
        }
    }

    /// 面向用户的错误消息
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => "Unable to reach the server".to_string(),
            ApiError::Unauthorized { message } => message.clone(),
            ApiError::Validation(message) => message.clone(),
            ApiError::Backend { message, .. } => message.clone(),
            ApiError::SessionInvalidated { .. } => {
                "Your session has expired, please sign in again".to_string()
            }
            ApiError::Storage(_) => "Session storage error".to_string(),
            ApiError::Decode(_) => "Unexpected response from the server".to_string(),
        }
    }
}

/// 提取后端（DRF）错误消息：`error`、`detail` 或 `message`
pub(crate) fn backend_message(body: &Value) -> Option<String> {
    ["error", "detail", "message"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

fn default_message(status: u16) -> &'static str {
    match status {
        400 => "Bad request",
        401 => "Authentication required",
        403 => "Access denied",
        404 => "Resource not found",
        429 => "Too many requests",
        500..=599 => "Server error",
        _ => "Request failed",
    }
}
