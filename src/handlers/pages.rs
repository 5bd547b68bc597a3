use crate::accounts;
use crate::auth::Session;
use crate::error::Result;
use crate::models::Document;
use crate::router::{self, AdminPage, ClientPage, PlayerQuery, Route};
use crate::views::{self, ListQuery};
use crate::watch;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, Uri},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub page: Option<usize>,
    pub notice: Option<String>,
    pub error: Option<String>,
    /// Username of an account just generated.
    pub created: Option<String>,
    pub id: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl PageQuery {
    fn player(&self) -> PlayerQuery {
        PlayerQuery {
            id: self.id.clone(),
            season: self.season,
            episode: self.episode,
        }
    }

    fn list(&self) -> ListQuery {
        ListQuery {
            q: self.q.clone().unwrap_or_default(),
            category: self.category.clone().unwrap_or_default(),
            page: self.page.unwrap_or(1),
        }
    }
}

/// Every HTML page: resolves the path against the session and renders the
/// matching screen from the current document.
pub async fn page(
    State(state): State<Arc<crate::AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<PageQuery>,
) -> Result<Response> {
    let doc = state.store.get().await?;
    let now = Utc::now();

    let session = state
        .auth
        .session_from(&jar, &headers)
        .filter(|s| accounts::session_active(&doc, s, now));

    let route = router::resolve(uri.path(), &query.player(), session.as_ref());
    tracing::debug!("GET {} -> {:?}", uri.path(), route);

    render(&state, &doc, route, session.as_ref(), &query, now).await
}

async fn render(
    state: &crate::AppState,
    doc: &Document,
    route: Route,
    session: Option<&Session>,
    query: &PageQuery,
    now: DateTime<Utc>,
) -> Result<Response> {
    let layout = |title: &str| {
        let mut layout = views::layout(doc, title, session);
        layout.notice = query.notice.clone();
        layout.error = query.error.clone();
        layout
    };
    let list = query.list();
    let username = session.map(|s| s.username.as_str()).unwrap_or_default();

    let response = match route {
        Route::Login => views::login(layout("Sign in")).into_response(),
        Route::Home(role) => Redirect::to(Route::home_path(role)).into_response(),

        Route::Admin(page) => match page {
            AdminPage::Dashboard => {
                let default_password = accounts::verify_admin_password(
                    &doc.users.admin.password,
                    &state.config.catalog.default_admin_password,
                );
                views::dashboard(doc, layout("Dashboard"), default_password, now).into_response()
            }
            AdminPage::Generate(kind) => {
                views::generate(doc, layout("Generate"), kind, query.created.as_deref(), now).into_response()
            }
            AdminPage::Accounts(kind) => {
                views::accounts(doc, layout(kind.segment()), kind, &list, now).into_response()
            }
            AdminPage::Content(kind) => {
                views::content(doc, layout(kind.label()), kind, &list, None)?.into_response()
            }
            AdminPage::EditContent(kind, id) => {
                views::content(doc, layout(kind.label()), kind, &list, Some(&id))?.into_response()
            }
            AdminPage::Backup => {
                let saved_token = state.store.publish_token().await?.is_some();
                views::backup(
                    layout("Backup"),
                    state.publisher.target(),
                    saved_token,
                    state.bootstrap.enabled(),
                )
                .into_response()
            }
            AdminPage::Settings => views::settings(doc, layout("Settings")).into_response(),
        },

        Route::Client(page) => match page {
            ClientPage::Catalog(kind) => {
                views::catalog(doc, layout(kind.label()), username, kind, &list).into_response()
            }
            ClientPage::Favorites => views::favorites(doc, layout("Favorites"), username).into_response(),
            ClientPage::History => {
                let entries = state.store.history(username).await?;
                views::history(doc, layout("History"), username, &entries, list.page).into_response()
            }
        },

        Route::Player { id, season, episode } => {
            let playback = watch::playback(doc, &id, season, episode)?;
            let kind = playback.item.kind();
            state
                .store
                .update_history(username, |entries| watch::record_history(entries, &id, kind, now))
                .await?;
            views::player(doc, layout(playback.item.name()), username, &playback).into_response()
        }
    };

    Ok(response)
}
