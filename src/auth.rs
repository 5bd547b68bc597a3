use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AppError;

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Client,
}

/// The logged-in user as carried by the session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub role: Role,
}

impl Session {
    pub fn new(username: &str, role: Role) -> Self {
        Self {
            username: username.to_string(),
            role,
        }
    }
}

// Claims for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // username
    pub role: Role,
    pub exp: i64,
}

#[derive(Clone)]
pub struct AuthState {
    pub jwt_secret: String,
    pub session_timeout_hours: i64,
    pub secure_cookies: bool,
}

impl AuthState {
    pub fn new(jwt_secret: String, session_timeout_hours: i64, secure_cookies: bool) -> Self {
        Self {
            jwt_secret,
            session_timeout_hours,
            secure_cookies,
        }
    }

    pub fn create_token(&self, session: &Session) -> Result<String, jsonwebtoken::errors::Error> {
        let expiration = (Utc::now() + Duration::hours(self.session_timeout_hours)).timestamp();

        let claims = Claims {
            sub: session.username.clone(),
            role: session.role,
            exp: expiration,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
    }

    pub fn verify_token(&self, token: &str) -> Result<Session, jsonwebtoken::errors::Error> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(Session {
            username: token_data.claims.sub,
            role: token_data.claims.role,
        })
    }

    /// Session from the cookie, or from an `Authorization: Bearer` header.
    pub fn session_from(&self, jar: &CookieJar, headers: &HeaderMap) -> Option<Session> {
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .or_else(|| {
                headers
                    .get(header::AUTHORIZATION)
                    .and_then(|h| h.to_str().ok())
                    .map(|auth| auth.strip_prefix("Bearer ").unwrap_or(auth).to_string())
            })?;

        match self.verify_token(&token) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::debug!("Ignoring invalid session token: {}", e);
                None
            }
        }
    }

    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Lax)
            .build()
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, "")).path("/").build()
    }
}

/// Rejects requests whose session is missing, stale, or of another role.
/// The user record is re-checked so blocked or deleted accounts lose access
/// immediately.
async fn require_role(state: &crate::AppState, role: Role, mut request: Request, next: Next) -> Response {
    let jar = CookieJar::from_headers(request.headers());
    let session = state.auth.session_from(&jar, request.headers());

    let Some(session) = session else {
        return Redirect::to("/").into_response();
    };
    if session.role != role {
        return AppError::Forbidden.into_response();
    }

    let doc = match state.store.get().await {
        Ok(doc) => doc,
        Err(e) => return e.into_response(),
    };
    if !crate::accounts::session_active(&doc, &session, Utc::now()) {
        return Redirect::to("/").into_response();
    }

    request.extensions_mut().insert(session);
    next.run(request).await
}

pub async fn admin_middleware(
    State(state): State<Arc<crate::AppState>>,
    request: Request,
    next: Next,
) -> Response {
    require_role(&state, Role::Admin, request, next).await
}

pub async fn client_middleware(
    State(state): State<Arc<crate::AppState>>,
    request: Request,
    next: Next,
) -> Response {
    require_role(&state, Role::Client, request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn auth() -> AuthState {
        AuthState::new("test-secret".to_string(), 24, false)
    }

    #[test]
    fn test_token_round_trip() {
        let auth = auth();
        let session = Session::new("12345", Role::Client);
        let token = auth.create_token(&session).unwrap();
        assert_eq!(auth.verify_token(&token).unwrap(), session);
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let token = AuthState::new("other".to_string(), 24, false)
            .create_token(&Session::new("admin", Role::Admin))
            .unwrap();
        assert!(auth().verify_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let auth = AuthState::new("test-secret".to_string(), -2, false);
        let token = auth.create_token(&Session::new("admin", Role::Admin)).unwrap();
        assert!(auth.verify_token(&token).is_err());
    }

    #[test]
    fn test_session_from_cookie_and_header() {
        let auth = auth();
        let token = auth.create_token(&Session::new("admin", Role::Admin)).unwrap();

        let jar = CookieJar::new().add(auth.session_cookie(token.clone()));
        let session = auth.session_from(&jar, &HeaderMap::new()).unwrap();
        assert_eq!(session.role, Role::Admin);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        assert!(auth.session_from(&CookieJar::new(), &headers).is_some());

        let bad = CookieJar::new().add(auth.session_cookie("garbage".to_string()));
        assert!(auth.session_from(&bad, &HeaderMap::new()).is_none());
    }
}
