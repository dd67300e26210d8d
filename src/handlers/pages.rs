//! 页面处理器
//!
//! 页面内容由前端渲染，这里只解析路径对应的页面并返回描述。

use axum::{
    extract::{Path, Query},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    routing::{safe_redirect_target, Locale},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Home,
    About,
    Contact,
    Careers,
    Team,
    Blog,
    Login,
    AdminDashboard,
}

impl Page {
    pub fn from_slug(slug: &str) -> Option<Page> {
        match slug.trim_matches('/') {
            "" => Some(Page::Home),
            "o-nas" => Some(Page::About),
            "kontakt" => Some(Page::Contact),
            "kariera" => Some(Page::Careers),
            "zespol" => Some(Page::Team),
            "blogi" => Some(Page::Blog),
            "login" | "auth/login" => Some(Page::Login),
            "admin" | "admin/dashboard" => Some(Page::AdminDashboard),
            _ => None,
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Page::Home => "",
            Page::About => "o-nas",
            Page::Contact => "kontakt",
            Page::Careers => "kariera",
            Page::Team => "zespol",
            Page::Blog => "blogi",
            Page::Login => "login",
            Page::AdminDashboard => "admin/dashboard",
        }
    }

    pub fn path(&self, locale: Locale) -> String {
        match self.slug() {
            "" => format!("/{}", locale),
            slug => format!("/{}/{}", locale, slug),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub locale: Locale,
    pub page: Page,
    pub path: String,
    /// 登录页：登录成功后的去向
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub redirect: Option<String>,
}

fn parse_locale(raw: &str) -> Result<Locale, AppError> {
    Locale::parse(raw).ok_or_else(|| AppError::NotFound(format!("/{}", raw)))
}

/// 首页 `/{locale}`
pub async fn home(Path(locale): Path<String>) -> Result<Json<PageResponse>, AppError> {
    let locale = parse_locale(&locale)?;
    Ok(Json(PageResponse {
        locale,
        page: Page::Home,
        path: Page::Home.path(locale),
        next: None,
    }))
}

/// 其他页面 `/{locale}/{*page}`
pub async fn page(
    Path((locale, slug)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse>, AppError> {
    let locale = parse_locale(&locale)?;
    let page = Page::from_slug(&slug)
        .ok_or_else(|| AppError::NotFound(format!("/{}/{}", locale, slug)))?;

    let next = (page == Page::Login)
        .then(|| safe_redirect_target(query.redirect.as_deref(), locale));

    Ok(Json(PageResponse {
        locale,
        page,
        path: page.path(locale),
        next,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_slugs() {
        assert_eq!(Page::from_slug("o-nas"), Some(Page::About));
        assert_eq!(Page::from_slug("/kontakt/"), Some(Page::Contact));
        assert_eq!(Page::from_slug("auth/login"), Some(Page::Login));
        assert_eq!(Page::from_slug("admin"), Some(Page::AdminDashboard));
        assert_eq!(Page::from_slug("nieznana"), None);
    }

    #[test]
    fn test_page_paths() {
        assert_eq!(Page::Home.path(Locale::En), "/en");
        assert_eq!(Page::Careers.path(Locale::Pl), "/pl/kariera");
        assert_eq!(Page::AdminDashboard.path(Locale::En), "/en/admin/dashboard");
    }
}
