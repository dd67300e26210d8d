//! KAPM 门户主入口
//! `serve` 启动门户服务；其余子命令通过 API 网关操作后端会话

use anyhow::Context;
use clap::{Parser, Subcommand};
use kapm_portal::{
    client::{ApiClient, ApiError, ApiRequest},
    config::AppConfig,
    handlers::health,
    routes,
    services::AuthService,
    session::SessionStore,
    telemetry,
};
use reqwest::Method;
use secrecy::Secret;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

#[derive(Debug, Parser)]
#[command(name = "kapm-portal", version, about = "KAPM portal server and API session client")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 启动门户服务（默认）
    Serve,
    #[command(flatten)]
    Client(ClientCommand),
}

/// 通过 API 网关执行的命令
#[derive(Debug, Subcommand)]
enum ClientCommand {
    /// 登录并保存会话
    Login {
        #[arg(long, short)]
        username: String,
        #[arg(long, env = "KAPM_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// 作废刷新令牌并清除会话
    Logout,
    /// 显示当前会话的用户
    Whoami,
    /// 以当前会话调用后端接口
    Request {
        /// HTTP 方法，例如 GET、POST
        method: String,
        /// API 路径，例如 /admin/dashboard/stats/
        path: String,
        /// JSON 请求体
        #[arg(long)]
        data: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 按优先级加载：.env.local > .env.development > .env
    if let Ok(env) = std::env::var("KAPM_ENV") {
        dotenv::from_filename(format!(".env.{}", env)).ok();
    } else {
        dotenv::from_filename(".env.local").ok();
        dotenv::from_filename(".env.development").ok();
        dotenv::dotenv().ok();
    }

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    telemetry::init_telemetry(&config);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Client(command) => run_client(config, command).await,
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    health::set_start_time();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "KAPM portal starting...");

    let app = routes::create_router();

    let addr = &config.server.addr;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.graceful_shutdown_timeout_secs))
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn run_client(config: AppConfig, command: ClientCommand) -> anyhow::Result<()> {
    let session = SessionStore::file(&config.session.store_path);
    let client = Arc::new(ApiClient::new(&config.api, session)?);
    let auth = AuthService::new(client.clone());

    let result = match command {
        ClientCommand::Login { username, password } => auth
            .login(&username, &Secret::new(password))
            .await
            .map(|session| {
                println!(
                    "Logged in as {} ({})",
                    session.user.display_name(),
                    session.user.role.as_str()
                );
            }),
        ClientCommand::Logout => auth.logout().await.map(|()| println!("Logged out")),
        ClientCommand::Whoami => match auth.current_user().await {
            Ok(Some(user)) => serde_json::to_string_pretty(&user)
                .map(|json| println!("{}", json))
                .map_err(ApiError::from),
            Ok(None) => {
                println!("Not logged in");
                Ok(())
            }
            Err(e) => Err(e),
        },
        ClientCommand::Request { method, path, data } => {
            let method = Method::from_bytes(method.to_uppercase().as_bytes())
                .context("Invalid HTTP method")?;
            let mut request = ApiRequest::new(method, path);
            if let Some(data) = data {
                request = request.with_body(serde_json::from_str(&data).context("Invalid JSON body")?);
            }
            client.execute(request).await.and_then(|response| {
                println!("{}", serde_json::to_string_pretty(&response.body)?);
                Ok(())
            })
        }
    };

    match result {
        Ok(()) => Ok(()),
        Err(ApiError::SessionInvalidated { login_path, .. }) => {
            anyhow::bail!("Session expired, please log in again (login entry point: {})", login_path)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            anyhow::bail!(e.user_message())
        }
    }
}

/// 优雅关闭信号处理
///
/// 收到信号后开始关闭，超时仍未完成则强制退出。
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Terminate signal received, starting graceful shutdown");
        },
    }

    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(timeout_secs)).await;
        tracing::warn!("Graceful shutdown timeout reached, forcing exit");
        std::process::exit(1);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_to_serve() {
        let cli = Cli::try_parse_from(["kapm-portal"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["kapm-portal", "serve"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Serve)));
    }

    #[test]
    fn test_cli_client_commands() {
        let cli = Cli::try_parse_from([
            "kapm-portal",
            "request",
            "PATCH",
            "/admin/comments/3/",
            "--data",
            r#"{"is_approved": true}"#,
        ])
        .unwrap();

        match cli.command {
            Some(Command::Client(ClientCommand::Request { method, path, data })) => {
                assert_eq!(method, "PATCH");
                assert_eq!(path, "/admin/comments/3/");
                assert!(data.is_some());
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["kapm-portal", "whoami"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Client(ClientCommand::Whoami))));
    }
}
