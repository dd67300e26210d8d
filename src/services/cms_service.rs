//! CMS 接口封装
//! 公开接口（博客、页面、分类、标签、评论）与管理接口（仪表盘及各资源 CRUD）

use serde_json::{json, Value};
use std::sync::Arc;

use crate::client::{ApiClient, ApiError};

/// 单个 REST 资源的 CRUD 操作，路径形如 `/admin/blog/` 与 `/admin/blog/{id}/`
#[derive(Debug, Clone, Copy)]
pub struct Resource<'a> {
    client: &'a ApiClient,
    base: &'static str,
}

impl<'a> Resource<'a> {
    fn new(client: &'a ApiClient, base: &'static str) -> Self {
        Self { client, base }
    }

    pub fn path(&self) -> &'static str {
        self.base
    }

    fn item_path(&self, id: impl std::fmt::Display) -> String {
        format!("{}{}/", self.base, id)
    }

    pub async fn list(&self) -> Result<Value, ApiError> {
        Ok(self.client.get(self.base).await?.body)
    }

    pub async fn get(&self, id: impl std::fmt::Display) -> Result<Value, ApiError> {
        Ok(self.client.get(&self.item_path(id)).await?.body)
    }

    pub async fn create(&self, data: &Value) -> Result<Value, ApiError> {
        Ok(self.client.post(self.base, data).await?.body)
    }

    pub async fn update(&self, id: impl std::fmt::Display, data: &Value) -> Result<Value, ApiError> {
        Ok(self.client.put(&self.item_path(id), data).await?.body)
    }

    pub async fn delete(&self, id: impl std::fmt::Display) -> Result<(), ApiError> {
        self.client.delete(&self.item_path(id)).await?;
        Ok(())
    }
}

/// 公开接口，无需登录
#[derive(Debug, Clone)]
pub struct PublicApi {
    client: Arc<ApiClient>,
}

impl PublicApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub fn blog(&self) -> Resource<'_> {
        Resource::new(&self.client, "/public/blog/")
    }

    pub fn pages(&self) -> Resource<'_> {
        Resource::new(&self.client, "/public/pages/")
    }

    pub fn categories(&self) -> Resource<'_> {
        Resource::new(&self.client, "/public/categories/")
    }

    pub fn tags(&self) -> Resource<'_> {
        Resource::new(&self.client, "/public/tags/")
    }

    /// 页面按 slug 获取
    pub async fn page(&self, slug: &str) -> Result<Value, ApiError> {
        self.pages().get(slug).await
    }

    /// 某篇文章下的评论
    pub async fn comments(&self, post_id: i64) -> Result<Value, ApiError> {
        Ok(self
            .client
            .get(&format!("/public/comments/?post={}", post_id))
            .await?
            .body)
    }

    pub async fn create_comment(&self, data: &Value) -> Result<Value, ApiError> {
        Ok(self.client.post("/public/comments/", data).await?.body)
    }
}

/// 管理后台接口，需要有效会话
#[derive(Debug, Clone)]
pub struct AdminApi {
    client: Arc<ApiClient>,
}

impl AdminApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn dashboard_stats(&self) -> Result<Value, ApiError> {
        Ok(self.client.get("/admin/dashboard/stats/").await?.body)
    }

    pub async fn recent_posts(&self) -> Result<Value, ApiError> {
        Ok(self.client.get("/admin/dashboard/recent-posts/").await?.body)
    }

    pub async fn recent_comments(&self) -> Result<Value, ApiError> {
        Ok(self.client.get("/admin/dashboard/recent-comments/").await?.body)
    }

    pub fn blog(&self) -> Resource<'_> {
        Resource::new(&self.client, "/admin/blog/")
    }

    pub fn pages(&self) -> Resource<'_> {
        Resource::new(&self.client, "/admin/pages/")
    }

    pub fn categories(&self) -> Resource<'_> {
        Resource::new(&self.client, "/admin/categories/")
    }

    pub fn tags(&self) -> Resource<'_> {
        Resource::new(&self.client, "/admin/tags/")
    }

    /// 媒体文件（上传走 multipart，不在此封装）
    pub fn media(&self) -> Resource<'_> {
        Resource::new(&self.client, "/admin/media/")
    }

    pub fn comments(&self) -> Resource<'_> {
        Resource::new(&self.client, "/admin/comments/")
    }

    pub fn users(&self) -> Resource<'_> {
        Resource::new(&self.client, "/admin/users/")
    }

    /// 审核通过评论
    pub async fn approve_comment(&self, id: i64) -> Result<Value, ApiError> {
        Ok(self
            .client
            .patch(&format!("/admin/comments/{}/", id), &json!({ "is_approved": true }))
            .await?
            .body)
    }
}
