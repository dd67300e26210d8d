//! KAPM 门户库
//! 会话存储、带认证的 API 网关、路由守卫以及门户服务

pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod routing;
pub mod services;
pub mod session;
pub mod telemetry;
