//! Seams to external collaborators whose failures feed the error pipeline.

use crate::core_types::{metadata, AppResult};
use crate::handler::ErrorHandler;
use crate::logging::{log_debug, log_warn};
use crate::registry::codes;

use async_trait::async_trait;
use serde_json::json;

/// Signed-in user as seen by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: String,
}

impl UserIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Issues access tokens for the video conferencing service.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue_token(&self, user_id: &str) -> anyhow::Result<String>;
}

/// Issue a video token for the signed-in user.
///
/// # Errors
///
/// - `AUTH_UNAUTHORIZED` when nobody is signed in
/// - `STREAM_TOKEN_INVALID` (with `userId` metadata) when the issuer fails
///
/// Errors are recorded in the handler's history but not handled; the caller
/// decides how to surface them.
pub async fn issue_video_token(
    handler: &ErrorHandler,
    user: Option<&UserIdentity>,
    issuer: &dyn TokenIssuer,
) -> AppResult<String> {
    let Some(user) = user else {
        return Err(handler.create_error(codes::AUTH_UNAUTHORIZED, None, None));
    };

    match issuer.issue_token(&user.id).await {
        Ok(token) => {
            log_debug!(user_id = %user.id, "Video token issued");
            Ok(token)
        }
        Err(cause) => {
            log_warn!(user_id = %user.id, error = %cause, "Video token issuance failed");
            Err(handler.create_error(
                codes::STREAM_TOKEN_INVALID,
                Some(cause),
                Some(metadata(json!({ "userId": user.id }))),
            ))
        }
    }
}
