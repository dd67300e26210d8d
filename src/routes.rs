//! 路由注册
//! 页面路由外包一层路由守卫，守卫先于路由匹配执行

use axum::{http::Uri, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::{error::AppError, handlers, middleware};

/// 创建门户路由
pub fn create_router() -> Router {
    let pages = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/{locale}", get(handlers::pages::home))
        .route("/{locale}/{*page}", get(handlers::pages::page))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http());

    // Router::layer 在路由匹配之后运行，语言改写必须放在外层
    Router::new()
        .fallback_service(pages)
        .layer(axum::middleware::from_fn(middleware::route_guard_middleware))
        .layer(axum::middleware::from_fn(middleware::request_tracking_middleware))
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
