//! Remote collaborators consumed by a notification section.
//!
//! The section never talks HTTP directly; it goes through these traits so the
//! same state machine runs against [`HttpApi`] in production and [`MockApi`]
//! in tests.
//!
//! - [`FeedApi`] - paginated notification listing and read-state updates
//! - [`ProjectApi`] - display metadata for project-scoped sections

mod http;
pub mod mock;

pub use http::HttpApi;
pub use mock::{MockApi, MockCall};

use crate::feed::{FeedPage, NotificationEntity, NotificationId, SectionKey};
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Transport-level failure talking to a remote API.
///
/// Cloneable so the section can keep a copy in its error slot while also
/// returning it to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out")]
    Timeout,
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Malformed response: {0}")]
    Decode(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ApiError {
    /// Returns true if this error is transient and the request may be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Timeout | ApiError::Network(_) => true,
            ApiError::HttpStatus(status) => *status >= 500,
            ApiError::ResponseTooLarge(_) | ApiError::Decode(_) | ApiError::NotFound(_) => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

// ============================================================================
// Request Types
// ============================================================================

/// Parameters of one `list` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub section: SectionKey,
    pub page: u32,
    pub page_size: u32,
    /// `Some(false)` restricts the listing to unread notifications.
    pub delivered: Option<bool>,
}

/// Fields the client is allowed to change on a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationPatch {
    pub delivered: bool,
}

/// Display metadata of a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectMeta {
    pub display_name: String,
    pub avatar_src: Option<String>,
    pub slug: Option<String>,
}

// ============================================================================
// Collaborator Traits
// ============================================================================

#[async_trait]
pub trait FeedApi: Send + Sync {
    /// Fetch one page of notifications for a section.
    async fn list(&self, query: ListQuery) -> Result<FeedPage, ApiError>;

    /// Apply a patch to one notification and persist it.
    async fn update(
        &self,
        id: &NotificationId,
        patch: NotificationPatch,
    ) -> Result<NotificationEntity, ApiError>;
}

#[async_trait]
pub trait ProjectApi: Send + Sync {
    async fn get_project(&self, project_id: &str) -> Result<ProjectMeta, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ApiError::Timeout.is_retryable());
        assert!(ApiError::Network("reset".into()).is_retryable());
        assert!(ApiError::HttpStatus(503).is_retryable());
        assert!(!ApiError::HttpStatus(404).is_retryable());
        assert!(!ApiError::Decode("bad".into()).is_retryable());
        assert!(!ApiError::NotFound("project 1".into()).is_retryable());
    }

    #[test]
    fn test_decode_error_from_serde() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let api: ApiError = err.into();
        assert!(matches!(api, ApiError::Decode(_)));
        assert!(api.to_string().starts_with("Malformed response"));
    }
}
