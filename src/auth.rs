//! Authentication seam behind `POST /auth`.

use crate::error::AppError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// JSON body returned to the client (typically a token), or `AppError::Unauthorized`.
    async fn authenticate(&self, credentials: &Credentials) -> Result<Value, AppError>;
}
