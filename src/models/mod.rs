//! 数据模型模块
//! 后端认证接口与用户资料的请求/响应结构

pub mod auth;
pub mod user;

pub use auth::{
    ChangePasswordRequest, ChangePasswordResponse, LoginRequest, LoginResponse, LogoutRequest,
    RefreshTokenRequest, RefreshTokenResponse, RegisterRequest,
};
pub use user::{Role, UserProfile};
