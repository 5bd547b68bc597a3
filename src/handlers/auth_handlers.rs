use crate::accounts;
use crate::error::{AppError, Result};
use crate::handlers::redirect_with;
use crate::router::Route;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<crate::AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse> {
    let doc = state.store.get().await?;

    let session = match accounts::authenticate(&doc, &form.username, &form.password, Utc::now()) {
        Ok(session) => session,
        Err(e) => {
            tracing::info!("Failed login for '{}': {}", form.username.trim(), e);
            return Ok((jar, redirect_with("/login", "error", &e.to_string())));
        }
    };

    let token = state
        .auth
        .create_token(&session)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create token: {}", e)))?;

    tracing::info!("{} logged in as {:?}", session.username, session.role);
    Ok((
        jar.add(state.auth.session_cookie(token)),
        Redirect::to(Route::home_path(session.role)),
    ))
}

pub async fn logout(State(state): State<Arc<crate::AppState>>, jar: CookieJar) -> impl IntoResponse {
    (jar.remove(state.auth.removal_cookie()), Redirect::to("/"))
}
