//! 配置系统
//! 从环境变量加载所有配置（前缀 KAPM_），在代码中给出默认值

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址，例如 "0.0.0.0:3000"
    pub addr: String,
    /// 优雅关闭超时时间（秒）
    pub graceful_shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// 后端 REST API 根地址，例如 "http://localhost:8004/api"
    pub base_url: String,
    /// 单次 HTTP 请求超时（秒）
    pub timeout_secs: u64,
    /// 会话失效后的登录入口
    pub login_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// CLI 使用的会话文件路径
    pub store_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        settings = settings
            .set_default("server.addr", "0.0.0.0:3000")?
            .set_default("server.graceful_shutdown_timeout_secs", 30)?
            .set_default("api.base_url", "http://localhost:8004/api")?
            .set_default("api.timeout_secs", 30)?
            .set_default("api.login_path", "/login")?
            .set_default("session.store_path", ".kapm/session.json")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?;

        // 环境变量覆盖，例如 KAPM_API__BASE_URL
        settings = settings.add_source(
            Environment::with_prefix("KAPM")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    /// 验证配置合法性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(port_str) = self.server.addr.split(':').next_back() {
            if let Ok(port) = port_str.parse::<u16>() {
                if port != 0 && port < 1024 {
                    return Err(ConfigError::Message("Server port should be >= 1024".to_string()));
                }
            }
        }

        let base_url = url::Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::Message(format!("Invalid api.base_url {}: {}", self.api.base_url, e))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::Message(format!(
                "api.base_url must use http or https, got {}",
                base_url.scheme()
            )));
        }

        if self.api.timeout_secs == 0 || self.api.timeout_secs > 300 {
            return Err(ConfigError::Message(
                "api.timeout_secs must be between 1 and 300".to_string(),
            ));
        }

        if !self.api.login_path.starts_with('/') {
            return Err(ConfigError::Message(
                "api.login_path must be an absolute path".to_string(),
            ));
        }

        if self.session.store_path.trim().is_empty() {
            return Err(ConfigError::Message("session.store_path must not be empty".to_string()));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        Ok(())
    }
}
