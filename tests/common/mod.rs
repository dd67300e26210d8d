//! 测试公共模块
//! 提供模拟后端和客户端构造工具

#![allow(dead_code)]

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use kapm_portal::{
    client::ApiClient,
    config::ApiConfig,
    models::UserProfile,
    session::{Session, SessionStore},
};
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use tokio::net::TcpListener;

/// 模拟后端记录的状态
pub struct MockState {
    /// 受保护接口接受的访问令牌
    pub valid_access: Mutex<String>,
    /// 刷新接口签发的访问令牌
    pub refreshed_access: String,
    /// 刷新接口是否接受刷新令牌
    pub refresh_enabled: AtomicBool,
    /// 刷新接口返回 200 但响应体缺少 `access`
    pub refresh_malformed: AtomicBool,
    pub refresh_calls: AtomicUsize,
    /// 受保护接口收到的 Authorization 头
    pub authorizations: Mutex<Vec<Option<String>>>,
    pub logout_bodies: Mutex<Vec<Value>>,
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockBackend {
    /// 启动模拟后端，绑定随机端口
    pub async fn start(valid_access: &str) -> Self {
        let state = Arc::new(MockState {
            valid_access: Mutex::new(valid_access.to_string()),
            refreshed_access: "a2".to_string(),
            refresh_enabled: AtomicBool::new(true),
            refresh_malformed: AtomicBool::new(false),
            refresh_calls: AtomicUsize::new(0),
            authorizations: Mutex::new(Vec::new()),
            logout_bodies: Mutex::new(Vec::new()),
        });

        let api = Router::new()
            .route("/auth/login/", post(login))
            .route("/auth/refresh/", post(refresh))
            .route("/auth/logout/", post(logout))
            .route("/admin/dashboard/stats/", get(stats))
            .route("/admin/always-unauthorized/", get(always_unauthorized))
            .route("/admin/broken/", get(broken))
            .route("/public/blog/missing/", get(missing))
            .with_state(state.clone());
        let app = Router::new().nest("/api", api);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("Failed to read mock address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            base_url: format!("http://{}/api", addr),
            state,
        }
    }

    pub fn refresh_calls(&self) -> usize {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn authorizations(&self) -> Vec<Option<String>> {
        self.state.authorizations.lock().unwrap().clone()
    }

    pub fn reject_refresh(&self) {
        self.state.refresh_enabled.store(false, Ordering::SeqCst);
    }

    pub fn malform_refresh(&self) {
        self.state.refresh_malformed.store(true, Ordering::SeqCst);
    }

    /// 指向模拟后端的客户端
    pub fn client(&self, session: SessionStore) -> Arc<ApiClient> {
        client_for(&self.base_url, session)
    }
}

pub fn client_for(base_url: &str, session: SessionStore) -> Arc<ApiClient> {
    let config = ApiConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        login_path: "/login".to_string(),
    };
    Arc::new(ApiClient::new(&config, session).expect("Failed to create API client"))
}

pub fn admin_user() -> UserProfile {
    serde_json::from_value(json!({
        "id": 1,
        "username": "admin",
        "email": "admin@example.com",
        "role": "admin",
        "is_staff": true,
        "is_superuser": true
    }))
    .expect("Invalid user fixture")
}

/// 预置会话的内存存储
pub async fn seeded_store(access: &str, refresh: &str) -> SessionStore {
    let store = SessionStore::in_memory();
    store
        .save(&Session {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            user: admin_user(),
        })
        .await
        .expect("Failed to seed session");
    store
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["username"] == "admin" && body["password"] == "admin123" {
        Json(json!({
            "access": "a1",
            "refresh": "r1",
            "user": {
                "id": 1,
                "username": "admin",
                "email": "admin@example.com",
                "role": "admin",
                "is_staff": true,
                "is_superuser": true
            }
        }))
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid username or password"})),
        )
            .into_response()
    }
}

async fn refresh(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    // 拉长刷新耗时，让并发请求在刷新期间排队
    tokio::time::sleep(Duration::from_millis(50)).await;

    if state.refresh_malformed.load(Ordering::SeqCst) {
        return Json(json!({"token": "unexpected"})).into_response();
    }

    if state.refresh_enabled.load(Ordering::SeqCst) && body["refresh"] == "r1" {
        *state.valid_access.lock().unwrap() = state.refreshed_access.clone();
        Json(json!({"access": state.refreshed_access})).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Token is invalid or expired"})),
        )
            .into_response()
    }
}

async fn logout(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.logout_bodies.lock().unwrap().push(body);
    Json(json!({"message": "Logged out"})).into_response()
}

async fn stats(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    let auth = bearer(&headers);
    state.authorizations.lock().unwrap().push(auth.clone());

    let expected = format!("Bearer {}", state.valid_access.lock().unwrap());
    if auth.as_deref() == Some(expected.as_str()) {
        Json(json!({"total_posts": 3, "pending_comments": 1})).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Given token not valid for any token type"})),
        )
            .into_response()
    }
}

async fn always_unauthorized(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.authorizations.lock().unwrap().push(bearer(&headers));
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Not allowed"})),
    )
        .into_response()
}

async fn broken(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.authorizations.lock().unwrap().push(bearer(&headers));
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"detail": "Database unavailable"})),
    )
        .into_response()
}

async fn missing() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response()
}
