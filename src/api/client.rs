use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

use crate::api::types::{
    CreateUserRequest, ErrorBody, HealthStatus, LoginRequest, LoginResponse, RoleAssignment,
    RoleInfo, UpdateUserRequest, UserAccount, UserPayload,
};
use crate::api::AuthApi;
use crate::config::Config;
use crate::errors::ApiError;

/// Stateless wrapper over the dashboard backend. Holds no session
/// state of its own: callers supply the bearer token on each request.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(config: &Config) -> Self {
        ApiClient {
            http: reqwest::Client::builder()
                .timeout(config.http_timeout)
                .user_agent(config.user_agent())
                .build()
                .expect("failed to build backend HTTP client"),
            base: config.api_url.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base.as_str().trim_end_matches('/'), path)
    }

    /// Normalize a response: 2xx bodies decode into `T`, everything
    /// else becomes `ApiError::Status` carrying the backend's message
    /// when the body has one.
    async fn handle<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
        let status = resp.status();
        if status.is_success() {
            resp.json::<T>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()))
        } else {
            Err(Self::status_error(status.as_u16(), resp).await)
        }
    }

    /// Like `handle` but for endpoints whose success carries no body
    /// (204, or a body we do not care about).
    async fn handle_empty(resp: reqwest::Response) -> Result<(), ApiError> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::status_error(status.as_u16(), resp).await)
        }
    }

    async fn status_error(status: u16, resp: reqwest::Response) -> ApiError {
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| {
                if body.is_empty() {
                    "unknown error".to_string()
                } else {
                    body
                }
            });
        ApiError::Status { status, message }
    }

    // ── User/role management (admin views) ──────────────────────

    pub async fn users(&self, token: &str) -> Result<Vec<UserAccount>, ApiError> {
        let resp = self
            .http
            .get(self.url("/api/users"))
            .bearer_auth(token)
            .send()
            .await?;
        Self::handle(resp).await
    }

    pub async fn users_with_roles(&self, token: &str) -> Result<Vec<UserAccount>, ApiError> {
        let resp = self
            .http
            .get(self.url("/api/users/with-roles"))
            .bearer_auth(token)
            .send()
            .await?;
        Self::handle(resp).await
    }

    pub async fn create_user(
        &self,
        token: &str,
        user: &CreateUserRequest,
    ) -> Result<UserAccount, ApiError> {
        let resp = self
            .http
            .post(self.url("/api/users"))
            .bearer_auth(token)
            .json(user)
            .send()
            .await?;
        Self::handle(resp).await
    }

    pub async fn update_user(
        &self,
        token: &str,
        id: i64,
        update: &UpdateUserRequest,
    ) -> Result<UserAccount, ApiError> {
        let resp = self
            .http
            .put(self.url(&format!("/api/users/{id}")))
            .bearer_auth(token)
            .json(update)
            .send()
            .await?;
        Self::handle(resp).await
    }

    pub async fn delete_user(&self, token: &str, id: i64) -> Result<(), ApiError> {
        let resp = self
            .http
            .delete(self.url(&format!("/api/users/{id}")))
            .bearer_auth(token)
            .send()
            .await?;
        Self::handle_empty(resp).await
    }

    pub async fn roles(&self, token: &str) -> Result<Vec<RoleInfo>, ApiError> {
        let resp = self
            .http
            .get(self.url("/api/roles"))
            .bearer_auth(token)
            .send()
            .await?;
        Self::handle(resp).await
    }

    pub async fn user_roles(&self, token: &str, user_id: i64) -> Result<Vec<String>, ApiError> {
        let resp = self
            .http
            .get(self.url(&format!("/api/users/{user_id}/roles")))
            .bearer_auth(token)
            .send()
            .await?;
        Self::handle(resp).await
    }

    pub async fn assign_user_role(
        &self,
        token: &str,
        user_id: i64,
        role_name: &str,
    ) -> Result<Vec<String>, ApiError> {
        let resp = self
            .http
            .post(self.url(&format!("/api/users/{user_id}/roles")))
            .bearer_auth(token)
            .json(&RoleAssignment { name: role_name })
            .send()
            .await?;
        Self::handle(resp).await
    }

    pub async fn remove_user_role(
        &self,
        token: &str,
        user_id: i64,
        role_name: &str,
    ) -> Result<Vec<String>, ApiError> {
        let resp = self
            .http
            .delete(self.url(&format!("/api/users/{user_id}/roles")))
            .bearer_auth(token)
            .json(&RoleAssignment { name: role_name })
            .send()
            .await?;
        Self::handle(resp).await
    }

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        let resp = self.http.get(self.url("/api/health/db")).send().await?;
        Self::handle(resp).await
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let resp = self
            .http
            .post(self.url("/auth/login"))
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        let result: Result<LoginResponse, ApiError> = Self::handle(resp).await;
        match &result {
            Ok(r) => tracing::debug!(username = %r.user.username, "login accepted by backend"),
            Err(e) => tracing::debug!(username, "login rejected: {e}"),
        }
        result
    }

    async fn current_user(&self, token: &str) -> Result<UserPayload, ApiError> {
        let resp = self
            .http
            .get(self.url("/auth/me"))
            .bearer_auth(token)
            .send()
            .await?;
        Self::handle(resp).await
    }

    async fn logout(&self, token: &str) -> Result<(), ApiError> {
        let resp = self
            .http
            .post(self.url("/auth/logout"))
            .bearer_auth(token)
            .send()
            .await?;
        Self::handle_empty(resp).await
    }
}
