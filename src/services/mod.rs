//! Business logic services layer

pub mod auth_service;
pub mod cms_service;

pub use auth_service::AuthService;
pub use cms_service::{AdminApi, PublicApi, Resource};
