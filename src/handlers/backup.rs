use crate::bootstrap::BootstrapOutcome;
use crate::error::{AppError, Result};
use crate::handlers::{back_with_error, notice, redirect_with};
use axum::{
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use std::sync::Arc;

const BACK: &str = "/admin/backup";
const EXPORT_FILE_NAME: &str = "cinemaDB.json";

#[derive(Debug, Deserialize)]
pub struct PublishForm {
    #[serde(default)]
    pub token: String,
    pub save_token: Option<String>,
}

pub async fn export(State(state): State<Arc<crate::AppState>>) -> Result<Response> {
    let json = state.store.export().await?;
    tracing::info!("Exported document ({} bytes)", json.len());

    Ok((
        [
            (header::CONTENT_TYPE, "application/json; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
            ),
        ],
        json,
    )
        .into_response())
}

async fn read_upload(mut multipart: Multipart) -> Result<String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
        return String::from_utf8(bytes.to_vec())
            .map_err(|_| AppError::BadRequest("The file is not valid UTF-8 text".to_string()));
    }
    Err(AppError::BadRequest("No file uploaded".to_string()))
}

pub async fn import(State(state): State<Arc<crate::AppState>>, multipart: Multipart) -> Result<Redirect> {
    let result = match read_upload(multipart).await {
        Ok(text) => state.store.import(&text).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(doc) => Ok(notice(
            BACK,
            &format!(
                "Imported {} clients, {} tests, {} movies, {} series and {} animes",
                doc.users.clients.len(),
                doc.users.tests.len(),
                doc.movies.len(),
                doc.series.len(),
                doc.animes.len()
            ),
        )),
        Err(e) => back_with_error(BACK, e),
    }
}

pub async fn reset(State(state): State<Arc<crate::AppState>>) -> Result<Redirect> {
    state.store.reset().await?;
    Ok(notice(BACK, "Database reset to defaults"))
}

pub async fn publish(
    State(state): State<Arc<crate::AppState>>,
    Form(form): Form<PublishForm>,
) -> Result<Redirect> {
    let typed = form.token.trim();
    let token = if typed.is_empty() {
        state.store.publish_token().await?.unwrap_or_default()
    } else {
        typed.to_string()
    };

    if token.is_empty() {
        return Ok(redirect_with(BACK, "error", "A GitHub token is required to publish"));
    }

    let remember = form.save_token.is_some();
    state
        .store
        .save_publish_token(remember.then_some(token.as_str()))
        .await?;

    let content = state.store.export().await?;
    match state.publisher.publish(&token, &content).await {
        Ok(receipt) => {
            let action = if receipt.created { "created" } else { "updated" };
            Ok(notice(
                BACK,
                &format!("Published to {} ({})", state.publisher.target(), action),
            ))
        }
        Err(e @ AppError::Publish(_)) => Ok(redirect_with(BACK, "error", &e.to_string())),
        Err(e) => back_with_error(BACK, e),
    }
}

pub async fn sync(State(state): State<Arc<crate::AppState>>) -> Result<Redirect> {
    let message = match state.bootstrap.run(&state.store).await? {
        BootstrapOutcome::Remote => "Database reloaded from the published copy",
        BootstrapOutcome::Stored => "Remote copy unavailable; the local database was kept",
        BootstrapOutcome::Default => "Remote copy unavailable; started from an empty database",
        BootstrapOutcome::Disabled => "Remote sync is not configured",
    };
    Ok(notice(BACK, message))
}
