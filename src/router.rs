use crate::auth::{Role, Session};
use crate::models::{AccountKind, ContentKind};

/// Admin screens, by path under `/admin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminPage {
    Dashboard,
    Generate(AccountKind),
    Accounts(AccountKind),
    Content(ContentKind),
    EditContent(ContentKind, String),
    Backup,
    Settings,
}

/// Client screens, by path under `/catalog`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientPage {
    Catalog(ContentKind),
    Favorites,
    History,
}

/// What a GET request renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    /// Redirect to the landing page of a role.
    Home(Role),
    Admin(AdminPage),
    Client(ClientPage),
    Player {
        id: String,
        season: Option<u32>,
        episode: Option<u32>,
    },
}

impl Route {
    pub fn home_path(role: Role) -> &'static str {
        match role {
            Role::Admin => "/admin",
            Role::Client => "/catalog/movies",
        }
    }
}

/// Query parameters the router itself consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerQuery {
    pub id: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

/// Maps a request path to a screen. No session, or a session whose role
/// does not own the section, gets the login screen.
pub fn resolve(path: &str, query: &PlayerQuery, session: Option<&Session>) -> Route {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let role = session.map(|s| s.role);

    match segments.first().copied() {
        None | Some("login") => match role {
            Some(role) => Route::Home(role),
            None => Route::Login,
        },
        Some("admin") => match role {
            Some(Role::Admin) => Route::Admin(admin_page(&segments[1..])),
            _ => Route::Login,
        },
        Some("catalog") => match role {
            Some(Role::Client) => client_route(&segments[1..]),
            _ => Route::Login,
        },
        Some("player") => match (role, &query.id) {
            (Some(Role::Client), Some(id)) if !id.is_empty() => Route::Player {
                id: id.clone(),
                season: query.season,
                episode: query.episode,
            },
            (Some(role), _) => Route::Home(role),
            (None, _) => Route::Login,
        },
        Some(_) => match role {
            Some(role) => Route::Home(role),
            None => Route::Login,
        },
    }
}

fn admin_page(segments: &[&str]) -> AdminPage {
    match segments {
        [section, "new"] => match AccountKind::from_segment(section) {
            Some(kind) => AdminPage::Generate(kind),
            None => content_or_dashboard(segments),
        },
        [section] => match AccountKind::from_segment(section) {
            Some(kind) => AdminPage::Accounts(kind),
            None => content_or_dashboard(segments),
        },
        _ => content_or_dashboard(segments),
    }
}

fn content_or_dashboard(segments: &[&str]) -> AdminPage {
    match segments {
        ["backup", ..] => AdminPage::Backup,
        ["settings", ..] => AdminPage::Settings,
        [section, rest @ ..] => match ContentKind::from_segment(section) {
            Some(kind) => match rest.first() {
                Some(id) => AdminPage::EditContent(kind, id.to_string()),
                None => AdminPage::Content(kind),
            },
            None => AdminPage::Dashboard,
        },
        [] => AdminPage::Dashboard,
    }
}

fn client_route(segments: &[&str]) -> Route {
    match segments {
        ["favorites", ..] => Route::Client(ClientPage::Favorites),
        ["history", ..] => Route::Client(ClientPage::History),
        [section, rest @ ..] => match ContentKind::from_segment(section) {
            Some(kind) => match rest.first() {
                Some(id) => Route::Player {
                    id: id.to_string(),
                    season: None,
                    episode: None,
                },
                None => Route::Client(ClientPage::Catalog(kind)),
            },
            None => Route::Client(ClientPage::Catalog(ContentKind::Movie)),
        },
        [] => Route::Client(ClientPage::Catalog(ContentKind::Movie)),
    }
}
