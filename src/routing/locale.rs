//! 语言区域
//!
//! 路径的第一段表示语言：`pl`（默认）或 `en`。

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Pl,
    En,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::Pl, Locale::En];
    pub const DEFAULT: Locale = Locale::Pl;

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Pl => "pl",
            Locale::En => "en",
        }
    }

    pub fn parse(segment: &str) -> Option<Locale> {
        Locale::ALL.into_iter().find(|l| l.as_str() == segment)
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale::DEFAULT
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locale::parse(s).ok_or_else(|| format!("Unsupported locale: {}", s))
    }
}

/// 第一段路径
fn first_segment(path: &str) -> &str {
    path.trim_start_matches('/').split('/').next().unwrap_or("")
}

/// 形如语言代码的段：两个小写字母
fn looks_like_locale(segment: &str) -> bool {
    segment.len() == 2 && segment.bytes().all(|b| b.is_ascii_lowercase())
}

/// 拆分语言前缀：`/en/kontakt` -> `(Some(En), "/kontakt")`，`/en` -> `(Some(En), "/")`
pub fn split_locale(path: &str) -> (Option<Locale>, &str) {
    let trimmed = path.trim_start_matches('/');
    let segment = first_segment(path);

    match Locale::parse(segment) {
        Some(locale) => {
            let rest = &trimmed[segment.len()..];
            (Some(locale), if rest.is_empty() { "/" } else { rest })
        }
        None => (None, path),
    }
}

/// 路径中的语言，缺失或无法识别时返回默认语言
pub fn resolve_locale(path: &str) -> Locale {
    split_locale(path).0.unwrap_or_default()
}

/// 规范化语言前缀
///
/// 已有合法前缀时返回 `None`（`/pl/` 去掉结尾斜杠）；缺失时补上默认语言；
/// 无法识别的两字母前缀替换为默认语言。
pub fn normalize_path(path: &str) -> Option<String> {
    let segment = first_segment(path);
    let trimmed = path.trim_start_matches('/');

    if let Some(locale) = Locale::parse(segment) {
        return (&trimmed[segment.len()..] == "/").then(|| format!("/{}", locale));
    }

    let rest = if looks_like_locale(segment) {
        match &trimmed[segment.len()..] {
            "/" => String::new(),
            rest => rest.to_string(),
        }
    } else if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    };

    Some(format!("/{}{}", Locale::DEFAULT, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Locale::parse("pl"), Some(Locale::Pl));
        assert_eq!(Locale::parse("en"), Some(Locale::En));
        assert_eq!(Locale::parse("de"), None);
        assert_eq!("en".parse::<Locale>().unwrap(), Locale::En);
        assert!("EN".parse::<Locale>().is_err());
    }

    #[test]
    fn test_split_locale() {
        assert_eq!(split_locale("/en/kontakt"), (Some(Locale::En), "/kontakt"));
        assert_eq!(split_locale("/pl"), (Some(Locale::Pl), "/"));
        assert_eq!(split_locale("/pl/"), (Some(Locale::Pl), "/"));
        assert_eq!(split_locale("/kontakt"), (None, "/kontakt"));
        // 前缀必须是完整的一段
        assert_eq!(split_locale("/plany"), (None, "/plany"));
    }

    #[test]
    fn test_resolve_locale() {
        assert_eq!(resolve_locale("/en/admin/dashboard"), Locale::En);
        assert_eq!(resolve_locale("/admin/dashboard"), Locale::Pl);
        assert_eq!(resolve_locale("/de/login"), Locale::Pl);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/pl/kontakt"), None);
        assert_eq!(normalize_path("/en"), None);
        assert_eq!(normalize_path("/"), Some("/pl".to_string()));
        assert_eq!(normalize_path(""), Some("/pl".to_string()));
        assert_eq!(normalize_path("/kontakt"), Some("/pl/kontakt".to_string()));
        assert_eq!(normalize_path("/o-nas/"), Some("/pl/o-nas/".to_string()));
        assert_eq!(normalize_path("/de/kontakt"), Some("/pl/kontakt".to_string()));
        assert_eq!(normalize_path("/de"), Some("/pl".to_string()));
        assert_eq!(normalize_path("/de/"), Some("/pl".to_string()));
        // 首页结尾斜杠
        assert_eq!(normalize_path("/pl/"), Some("/pl".to_string()));
        assert_eq!(normalize_path("/en/"), Some("/en".to_string()));
        assert_eq!(normalize_path("/en/kontakt/"), None);
    }
}
