//! 后端 API 客户端（带认证的请求网关）
//!
//! 每次调用自动附加 `Authorization: Bearer <access_token>`。收到 401 时
//! 最多刷新一次访问令牌并重发一次原请求；刷新失败则清除会话，
//! 返回 `ApiError::SessionInvalidated`，由调用方决定如何跳转。

pub mod error;

use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::models::{RefreshTokenRequest, RefreshTokenResponse};
use crate::session::SessionStore;

pub use error::ApiError;

/// 刷新访问令牌的接口
pub const REFRESH_PATH: &str = "/auth/refresh/";

/// 单次出站调用的上下文，不持久化
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, ApiError> {
        Ok(self.with_body(serde_json::to_value(body)?))
    }

    /// 是否已经因 401 重发过
    pub fn is_retried(&self) -> bool {
        self.retried
    }
}

/// 成功响应，空响应体解析为 `null`
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        Ok(serde_json::from_value(self.body)?)
    }
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    login_path: String,
    session: SessionStore,
    /// 同一时刻只允许一个刷新请求在途
    refresh_lock: Mutex<()>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("login_path", &self.login_path)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// 创建新的客户端
    pub fn new(config: &ApiConfig, session: SessionStore) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            login_path: config.login_path.clone(),
            session,
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.execute(ApiRequest::get(path)).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        self.execute(ApiRequest::post(path).with_json(body)?).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        self.execute(ApiRequest::new(Method::PUT, path).with_json(body)?)
            .await
    }

    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        self.execute(ApiRequest::new(Method::PATCH, path).with_json(body)?)
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.execute(ApiRequest::new(Method::DELETE, path)).await
    }

    /// 带认证执行请求
    ///
    /// 401 且未重发过：刷新一次并重发一次；重发后仍为 401 则直接返回。
    /// 其他错误原样返回，不重试，不改动会话。
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let token = self.session.access_token().await?;

        match self.dispatch(&request, token.as_deref()).await {
            Err(err) if err.is_unauthorized() && !request.retried => {
                request.retried = true;
                debug!(
                    method = %request.method,
                    path = %request.path,
                    "Access token rejected, attempting refresh"
                );

                match self.refresh_access_token(token.as_deref()).await {
                    Ok(new_token) => self.dispatch(&request, Some(&new_token)).await,
                    Err(refresh_err) => {
                        warn!(
                            path = %request.path,
                            error = %refresh_err,
                            "Token refresh failed, invalidating session"
                        );
                        Err(self.invalidate_session(err).await)
                    }
                }
            }
            other => other,
        }
    }

    /// 不附加令牌、不做 401 恢复的请求（登录、注册、刷新）
    pub async fn send_public(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.dispatch(&request, None).await
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let mut builder = self.http.request(request.method.clone(), self.url(&request.path));

        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            retried = request.retried,
            "Backend call completed"
        );

        if status.is_success() {
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes)?
            };
            return Ok(ApiResponse {
                status: status.as_u16(),
                body,
            });
        }

        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        Err(ApiError::from_response(status.as_u16(), body))
    }

    /// 用刷新令牌换取新的访问令牌
    ///
    /// `stale` 是被拒绝的访问令牌。拿到锁时如果存储中的访问令牌已经变化，
    /// 说明并发调用已经刷新过，直接复用。
    async fn refresh_access_token(&self, stale: Option<&str>) -> Result<String, ApiError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.session.access_token().await? {
            if Some(current.as_str()) != stale {
                debug!("Access token already refreshed by a concurrent call");
                return Ok(current);
            }
        }

        let refresh = self.session.refresh_token().await?.ok_or_else(|| {
            ApiError::Unauthorized {
                message: "No refresh token available".to_string(),
            }
        })?;

        let request = ApiRequest::post(REFRESH_PATH).with_json(&RefreshTokenRequest { refresh })?;
        let result = match self.send_public(request).await {
            Ok(response) => response.json::<RefreshTokenResponse>(),
            Err(e) => Err(e),
        };

        let outcome = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!("api_token_refresh_total", "outcome" => outcome).increment(1);

        let RefreshTokenResponse { access } = result?;
        self.session.set_access_token(&access).await?;

        info!("Access token refreshed");
        Ok(access)
    }

    async fn invalidate_session(&self, cause: ApiError) -> ApiError {
        if let Err(e) = self.session.clear().await {
            tracing::error!(error = %e, "Failed to clear session after refresh failure");
            return ApiError::Storage(e);
        }

        metrics::counter!("api_session_invalidated_total").increment(1);

        ApiError::SessionInvalidated {
            login_path: self.login_path.clone(),
            cause: Box::new(cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> ApiClient {
        let config = ApiConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
            login_path: "/login".to_string(),
        };
        ApiClient::new(&config, SessionStore::in_memory()).unwrap()
    }

    #[test]
    fn test_url_joining() {
        let client = client("http://localhost:8004/api/");
        assert_eq!(client.base_url(), "http://localhost:8004/api");
        assert_eq!(client.url("/auth/login/"), "http://localhost:8004/api/auth/login/");
        assert_eq!(client.url("public/blog/"), "http://localhost:8004/api/public/blog/");
    }

    #[test]
    fn test_request_builder() {
        let request = ApiRequest::post("/auth/logout/")
            .with_json(&serde_json::json!({"refresh": "r1"}))
            .unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body.as_ref().unwrap()["refresh"], "r1");
        assert!(!request.is_retried());
    }

    #[test]
    fn test_response_json_decoding() {
        let response = ApiResponse {
            status: 200,
            body: serde_json::json!({"access": "a2"}),
        };
        let parsed: RefreshTokenResponse = response.json().unwrap();
        assert_eq!(parsed.access, "a2");
    }
}
