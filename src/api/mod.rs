//! Stateless HTTP wrapper over the dashboard's REST microservices.
//!
//! The session manager only depends on the [`AuthApi`] seam so tests
//! can drive it with a stub backend; the concrete [`ApiClient`] also
//! carries the user/role management and health plumbing used by the
//! admin views.

use async_trait::async_trait;

use crate::errors::ApiError;

pub mod client;
pub mod types;

pub use client::ApiClient;
pub use types::{LoginResponse, UserPayload};

/// The auth-backend contract consumed by the session manager.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a token and a user snapshot.
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError>;

    /// Validate a bearer token and fetch the current user.
    async fn current_user(&self, token: &str) -> Result<UserPayload, ApiError>;

    /// Best-effort server-side session termination.
    async fn logout(&self, token: &str) -> Result<(), ApiError>;
}
