use crate::auth::Session;
use crate::error::Result;
use crate::handlers::{back_with_error, notice};
use crate::watch;
use axum::{
    extract::{Extension, Path, State},
    http::{header, HeaderMap},
    response::Redirect,
};
use reqwest::Url;
use std::sync::Arc;

/// Path and query of the referring page, so an action returns where it was
/// triggered. Only same-site paths are produced; a path starting with `//`
/// would be read by browsers as another host.
fn referer_path(headers: &HeaderMap) -> Option<String> {
    let referer = headers.get(header::REFERER)?.to_str().ok()?;
    let url = Url::parse(referer).ok()?;
    if url.path().starts_with("//") {
        return None;
    }
    Some(match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    })
}

pub async fn toggle_favorite(
    State(state): State<Arc<crate::AppState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Redirect> {
    let back = referer_path(&headers).unwrap_or_else(|| "/catalog/favorites".to_string());

    match state
        .store
        .update(|doc| watch::toggle_favorite(doc, &session.username, &id))
        .await
    {
        Ok(added) => {
            tracing::debug!("{} favorite {} -> {}", session.username, id, added);
            Ok(Redirect::to(&back))
        }
        Err(e) => back_with_error(&back, e),
    }
}

pub async fn clear_history(
    State(state): State<Arc<crate::AppState>>,
    Extension(session): Extension<Session>,
) -> Result<Redirect> {
    state.store.clear_history(&session.username).await?;
    Ok(notice("/catalog/history", "History cleared"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_referer_path_keeps_only_path_and_query() {
        let mut headers = HeaderMap::new();
        assert_eq!(referer_path(&headers), None);

        headers.insert(
            header::REFERER,
            HeaderValue::from_static("https://evil.example/catalog/movies?q=a%C3%A7%C3%A3o&page=2"),
        );
        assert_eq!(
            referer_path(&headers).as_deref(),
            Some("/catalog/movies?q=a%C3%A7%C3%A3o&page=2")
        );
    }

    #[test]
    fn test_referer_path_rejects_protocol_relative_paths() {
        for referer in ["https://x//evil.example/", "https://x/\\evil.example/"] {
            let mut headers = HeaderMap::new();
            headers.insert(header::REFERER, HeaderValue::from_str(referer).unwrap());
            assert_eq!(referer_path(&headers), None, "{}", referer);
        }
    }
}
