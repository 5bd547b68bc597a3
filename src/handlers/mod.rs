pub mod admin;
pub mod auth_handlers;
pub mod backup;
pub mod client;
pub mod pages;

use crate::error::{AppError, Result};
use axum::response::Redirect;

/// Redirect to `path` with a flash message for the next page render.
pub fn redirect_with(path: &str, key: &str, message: &str) -> Redirect {
    let separator = if path.contains('?') { '&' } else { '?' };
    Redirect::to(&format!(
        "{}{}{}={}",
        path,
        separator,
        key,
        urlencoding::encode(message)
    ))
}

pub fn notice(path: &str, message: &str) -> Redirect {
    redirect_with(path, "notice", message)
}

/// Rejected actions go back to `path` showing the reason. Server faults
/// still surface as error pages.
pub fn back_with_error(path: &str, err: AppError) -> Result<Redirect> {
    if err.status().is_client_error() {
        Ok(redirect_with(path, "error", &err.to_string()))
    } else {
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use axum::response::IntoResponse;

    fn location(redirect: Redirect) -> String {
        redirect
            .into_response()
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_redirect_with_encodes_message() {
        assert_eq!(
            location(notice("/admin/clients", "Client 12345 renewed")),
            "/admin/clients?notice=Client%2012345%20renewed"
        );
        assert_eq!(
            location(redirect_with("/admin/clients?page=2", "error", "a&b")),
            "/admin/clients?page=2&error=a%26b"
        );
    }

    #[test]
    fn test_back_with_error_only_swallows_client_errors() {
        let redirect = back_with_error("/admin", AppError::BadRequest("nope".to_string())).unwrap();
        assert_eq!(location(redirect), "/admin?error=nope");

        let internal = AppError::Internal(anyhow::anyhow!("disk"));
        assert!(back_with_error("/admin", internal).is_err());
    }
}
