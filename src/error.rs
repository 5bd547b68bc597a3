use crate::models::SiteConfig;
use crate::templates::{ErrorTemplate, Layout};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors surfaced to the operator or client by a request handler.
///
/// Every failing action aborts before the document is written back, so a
/// returned error always means the store is unchanged.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Admin privileges required")]
    Forbidden,

    /// The GitHub Contents API rejected the request.
    #[error("Publish failed: {0}")]
    Publish(String),

    /// An imported or fetched document could not be parsed.
    #[error("Invalid document: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::InvalidDocument(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Publish(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request error");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }

        (status, error_page(status, &self)).into_response()
    }
}

fn error_page(status: StatusCode, err: &AppError) -> ErrorTemplate {
    ErrorTemplate {
        layout: Layout {
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            site_name: SiteConfig::default_site_name(),
            ..Layout::default()
        },
        code: status.as_u16(),
        message: err.to_string(),
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use askama_axum::Template;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_page_escapes_message() {
        let err = AppError::BadRequest("<script>alert(1)</script>".into());
        let html = error_page(err.status(), &err).render().unwrap();
        assert!(html.contains("400"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_into_response_keeps_status() {
        let response = AppError::NotFound("movie_1".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = AppError::Publish("Bad credentials".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
