//! HTTP 中间件
//! 请求追踪、路由守卫

use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderValue, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    error::AppError,
    routing::{classify, GuardDecision},
    session::ACCESS_TOKEN,
};

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    let uri = req.uri().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    async move {
        let start = Instant::now();

        let mut response = next.run(req).await;

        let elapsed = start.elapsed();
        let status = response.status().as_u16();

        // 标签只使用有限取值
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "HEAD" => "HEAD",
            _ => "OTHER",
        };
        let status_class = match status {
            200..=299 => "2xx",
            300..=399 => "3xx",
            400..=499 => "4xx",
            _ => "5xx",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_class)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            method = %method,
            uri = %uri,
            status = status,
            elapsed_ms = elapsed.as_millis(),
            "Request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// 路由守卫中间件
///
/// 必须包在 Router 外层运行：改写后的 URI 要在路由匹配之前生效。
pub async fn route_guard_middleware(mut req: Request, next: Next) -> Result<Response, AppError> {
    let has_token = has_cookie(req.headers(), ACCESS_TOKEN);
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|q| q.to_string());

    match classify(&path, query.as_deref(), has_token) {
        GuardDecision::Redirect(location) => {
            metrics::counter!("route_guard_redirects_total").increment(1);
            tracing::debug!(path = %path, location = %location, "Route guard redirect");
            Ok(Redirect::temporary(&location).into_response())
        }
        GuardDecision::Rewrite(target) => {
            let uri: Uri = target.parse().map_err(|e| {
                tracing::error!(path = %path, target = %target, error = %e, "Invalid rewrite target");
                AppError::Internal
            })?;
            tracing::debug!(path = %path, target = %target, "Locale rewrite");
            *req.uri_mut() = uri;
            Ok(next.run(req).await)
        }
        GuardDecision::Skip | GuardDecision::Proceed => Ok(next.run(req).await),
    }
}

/// Cookie 头中是否存在指定名称且值非空的 cookie
pub fn has_cookie(headers: &HeaderMap, name: &str) -> bool {
    cookie_value(headers, name).is_some_and(|v| !v.is_empty())
}

/// 读取指定 cookie 的值
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_or_generate_trace_id() {
        let mut headers = HeaderMap::new();
        headers.insert("x-trace-id", "test-trace-123".parse().unwrap());

        let trace_id = extract_or_generate_trace_id(&headers);
        assert_eq!(trace_id, "test-trace-123");

        let headers = HeaderMap::new();
        let trace_id = extract_or_generate_trace_id(&headers);
        assert!(!trace_id.is_empty());
        assert_ne!(trace_id, "test-trace-123");
    }

    #[test]
    fn test_cookie_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "theme=dark; access_token=a1; NEXT_LOCALE=pl".parse().unwrap(),
        );

        assert!(has_cookie(&headers, "access_token"));
        assert_eq!(cookie_value(&headers, "NEXT_LOCALE").as_deref(), Some("pl"));
        assert!(!has_cookie(&headers, "refresh_token"));
    }

    #[test]
    fn test_cookie_name_must_match_exactly() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "old_access_token=a0; access_token=".parse().unwrap());

        assert!(!has_cookie(&headers, "access_token"));
        assert!(!has_cookie(&HeaderMap::new(), "access_token"));
    }
}
