//! 请求路由：语言前缀解析与访问守卫

pub mod guard;
pub mod locale;

pub use guard::{classify, safe_redirect_target, GuardDecision};
pub use locale::{resolve_locale, Locale};
