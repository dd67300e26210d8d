//! Authentication-related models

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::user::UserProfile;

/// Login request
#[derive(Debug, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login / register response
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserProfile,
}

/// Token refresh request
#[derive(Debug, Serialize)]
pub struct RefreshTokenRequest {
    pub refresh: String,
}

/// Token refresh response，只使用 access 字段
#[derive(Debug, Deserialize)]
pub struct RefreshTokenResponse {
    pub access: String,
}

/// Logout request
#[derive(Debug, Serialize)]
pub struct LogoutRequest {
    pub refresh: String,
}

/// 注册请求
#[derive(Debug, Serialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150, message = "Username is required"))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub password2: String,
    pub first_name: String,
    pub last_name: String,
}

/// 修改密码请求
#[derive(Debug, Serialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub old_password: String,
    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "New passwords do not match"))]
    pub new_password2: String,
}

/// 修改密码后后端会重新签发令牌
#[derive(Debug, Deserialize)]
pub struct ChangePasswordResponse {
    pub access: String,
    pub refresh: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_requires_credentials() {
        let req = LoginRequest {
            username: String::new(),
            password: "admin123".to_string(),
        };
        assert!(req.validate().is_err());

        let req = LoginRequest {
            username: "admin".to_string(),
            password: "admin123".to_string(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_register_request_password_mismatch() {
        let req = RegisterRequest {
            username: "anna".to_string(),
            email: "anna@kapm.pl".to_string(),
            password: "Haslo123".to_string(),
            password2: "Haslo124".to_string(),
            first_name: String::new(),
            last_name: String::new(),
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password2"));
    }

    #[test]
    fn test_register_request_invalid_email() {
        let req = RegisterRequest {
            username: "anna".to_string(),
            email: "not-an-email".to_string(),
            password: "Haslo123".to_string(),
            password2: "Haslo123".to_string(),
            first_name: String::new(),
            last_name: String::new(),
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }
}
