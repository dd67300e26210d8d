//! 路由守卫
//!
//! 渲染页面之前按路径和 `access_token` cookie 是否存在决定去向。
//! 只检查令牌是否存在，不校验有效期或签名；失效令牌由 API 网关在
//! 第一次后端调用时处理。

use super::locale::{normalize_path, resolve_locale, Locale};

/// 不经过守卫的路径前缀
const EXCLUDED_PREFIXES: [&str; 5] = ["/api", "/_next/static", "/_next/image", "/favicon.ico", "/health"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// 静态资源等，不处理
    Skip,
    /// 重定向到给定地址
    Redirect(String),
    /// 内部改写路径后继续路由
    Rewrite(String),
    /// 原样继续
    Proceed,
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

pub fn is_excluded(path: &str) -> bool {
    EXCLUDED_PREFIXES.iter().any(|prefix| {
        path == *prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/') || prefix.contains('.'))
    }) || path.ends_with(".png")
}

/// 管理后台路径：任一段为 `admin`（可带语言前缀）
pub fn is_admin_path(path: &str) -> bool {
    segments(path).any(|s| s == "admin")
}

/// 登录路径：任一段为 `login`
pub fn is_login_path(path: &str) -> bool {
    segments(path).any(|s| s == "login")
}

pub fn login_path(locale: Locale) -> String {
    format!("/{}/login", locale)
}

pub fn dashboard_path(locale: Locale) -> String {
    format!("/{}/admin/dashboard", locale)
}

/// 未登录访问后台时的登录地址，原路径放在 `redirect` 参数中
pub fn login_redirect(path: &str) -> String {
    format!(
        "{}?redirect={}",
        login_path(resolve_locale(path)),
        encode_query_value(path)
    )
}

/// 登录成功后的返回地址，只接受站内绝对路径，否则回到仪表盘
pub fn safe_redirect_target(redirect: Option<&str>, locale: Locale) -> String {
    match redirect {
        Some(target)
            if target.starts_with('/') && !target.starts_with("//") && !target.contains('\\') =>
        {
            target.to_string()
        }
        _ => dashboard_path(locale),
    }
}

/// 按顺序应用守卫规则
pub fn classify(path: &str, query: Option<&str>, has_access_token: bool) -> GuardDecision {
    if is_excluded(path) {
        return GuardDecision::Skip;
    }

    if is_admin_path(path) && !has_access_token {
        return GuardDecision::Redirect(login_redirect(path));
    }

    if is_login_path(path) && has_access_token {
        return GuardDecision::Redirect(dashboard_path(resolve_locale(path)));
    }

    match normalize_path(path) {
        Some(normalized) => match query {
            Some(q) if !q.is_empty() => GuardDecision::Rewrite(format!("{}?{}", normalized, q)),
            _ => GuardDecision::Rewrite(normalized),
        },
        None => GuardDecision::Proceed,
    }
}

/// 逐段编码，保留 `/` 分隔符；已有的 `%` 编码为 `%25`，读取时还原为原路径
fn encode_query_value(path: &str) -> String {
    path.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}
