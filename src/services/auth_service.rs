//! 认证服务：登录、登出、注册、当前用户

use secrecy::{ExposeSecret, Secret};
use serde_json::Value;
use std::sync::Arc;
use validator::Validate;

use crate::{
    client::{error::backend_message, ApiClient, ApiError, ApiRequest},
    models::*,
    session::Session,
};

pub const LOGIN_PATH: &str = "/auth/login/";
pub const LOGOUT_PATH: &str = "/auth/logout/";
pub const REGISTER_PATH: &str = "/auth/register/";
pub const ME_PATH: &str = "/auth/me/";
pub const PROFILE_PATH: &str = "/auth/profile/";
pub const CHANGE_PASSWORD_PATH: &str = "/auth/change-password/";

#[derive(Debug, Clone)]
pub struct AuthService {
    client: Arc<ApiClient>,
}

impl AuthService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// 用户登录
    ///
    /// 成功后一次性写入访问令牌、刷新令牌和用户资料。
    /// 后端拒绝（400/401）时返回 `ApiError::Validation`，会话保持不变。
    pub async fn login(
        &self,
        username: &str,
        password: &Secret<String>,
    ) -> Result<Session, ApiError> {
        let req = LoginRequest {
            username: username.to_string(),
            password: password.expose_secret().clone(),
        };
        req.validate().map_err(|e| ApiError::Validation(first_validation_message(&e)))?;

        let response = self
            .client
            .send_public(ApiRequest::post(LOGIN_PATH).with_json(&req)?)
            .await
            .map_err(into_validation)?;

        let LoginResponse {
            access,
            refresh,
            user,
        } = response.json()?;

        let session = Session {
            access_token: access,
            refresh_token: refresh,
            user,
        };
        self.client.session().save(&session).await?;

        tracing::info!(
            username = %session.user.username,
            role = session.user.role.as_str(),
            "User logged in"
        );
        Ok(session)
    }

    /// 登出：把刷新令牌交给后端作废，无论结果如何都清除本地会话
    ///
    /// 后端调用失败时，在清除会话之后返回该错误。
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = match self.client.session().refresh_token().await? {
            Some(refresh) => self
                .client
                .post(LOGOUT_PATH, &LogoutRequest { refresh })
                .await
                .map(|_| ()),
            None => Ok(()),
        };

        self.client.session().clear().await?;

        match &result {
            Ok(()) => tracing::info!("User logged out"),
            Err(e) => tracing::warn!(error = %e, "Logout call failed, local session cleared"),
        }
        result
    }

    /// 注册新用户，不写入会话
    pub async fn register(&self, req: &RegisterRequest) -> Result<LoginResponse, ApiError> {
        req.validate().map_err(|e| ApiError::Validation(first_validation_message(&e)))?;

        let response = self
            .client
            .send_public(ApiRequest::post(REGISTER_PATH).with_json(req)?)
            .await
            .map_err(into_validation)?;

        response.json()
    }

    /// 从后端获取当前用户资料
    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        self.client.get(ME_PATH).await?.json()
    }

    /// 更新当前用户资料（部分字段）
    pub async fn update_profile(&self, changes: &Value) -> Result<Value, ApiError> {
        Ok(self.client.patch(PROFILE_PATH, changes).await?.body)
    }

    /// 修改密码，后端重新签发的令牌替换当前会话中的令牌
    pub async fn change_password(&self, req: &ChangePasswordRequest) -> Result<(), ApiError> {
        req.validate().map_err(|e| ApiError::Validation(first_validation_message(&e)))?;

        let ChangePasswordResponse { access, refresh } =
            self.client.post(CHANGE_PASSWORD_PATH, req).await?.json()?;

        match self.client.session().read().await? {
            Some(session) => {
                self.client
                    .session()
                    .save(&Session {
                        access_token: access,
                        refresh_token: refresh,
                        user: session.user,
                    })
                    .await?;
            }
            None => {
                tracing::warn!("Password changed without a cached session, tokens not stored");
            }
        }

        Ok(())
    }

    /// 缓存的用户资料
    pub async fn current_user(&self) -> Result<Option<UserProfile>, ApiError> {
        Ok(self.client.session().user().await?)
    }

    pub async fn is_authenticated(&self) -> Result<bool, ApiError> {
        Ok(self.client.session().is_authenticated().await?)
    }
}

/// 凭据被拒绝时转换为面向用户的校验错误
fn into_validation(err: ApiError) -> ApiError {
    match err {
        ApiError::Unauthorized { message } => ApiError::Validation(message),
        ApiError::Backend {
            status: 400, body, ..
        } => ApiError::Validation(
            backend_message(&body).unwrap_or_else(|| "Login failed".to_string()),
        ),
        other => other,
    }
}

fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid request".to_string())
}
