use askama_axum::Template;

/// Fields every page shares with `base.html`.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub title: String,
    pub site_name: String,
    pub username: String,
    pub admin: bool,
    pub logged_in: bool,
    pub notice: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone)]
pub struct PageLink {
    pub number: usize,
    pub href: String,
    pub current: bool,
}

/// Pagination controls for one list.
#[derive(Debug, Clone, Default)]
pub struct Pager {
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
    pub links: Vec<PageLink>,
}

#[derive(Debug, Clone)]
pub struct AccountRow {
    pub username: String,
    pub password: String,
    pub description: String,
    pub created: String,
    pub expires: String,
    pub status_label: String,
    pub status_class: String,
    pub remaining: String,
    pub blocked: bool,
    pub contact: String,
}

#[derive(Debug, Clone)]
pub struct ContentRow {
    pub id: String,
    pub name: String,
    pub cover: String,
    pub category: String,
    pub release_year: String,
    pub episodes: usize,
    pub edit_href: String,
}

/// Add/edit form state for one content item.
#[derive(Debug, Clone, Default)]
pub struct ContentForm {
    pub action: String,
    pub editing: bool,
    pub name: String,
    pub description: String,
    pub release_year: String,
    pub cover: String,
    pub link: String,
    pub seasons: String,
    pub categories: Vec<SelectOption>,
}

#[derive(Debug, Clone)]
pub struct CardView {
    pub id: String,
    pub name: String,
    pub cover: String,
    pub category: String,
    pub release_year: String,
    pub href: String,
    pub favorite: bool,
}

#[derive(Debug, Clone)]
pub struct HistoryView {
    pub card: CardView,
    pub watched_at: String,
}

#[derive(Debug, Clone)]
pub struct EpisodeLink {
    pub number: u32,
    pub href: String,
    pub current: bool,
}

#[derive(Debug, Clone)]
pub struct SeasonView {
    pub number: u32,
    pub episodes: Vec<EpisodeLink>,
}

#[derive(Debug, Clone)]
pub struct NavTab {
    pub label: String,
    pub href: String,
    pub active: bool,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
}

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub clients: usize,
    pub active_clients: usize,
    pub tests: usize,
    pub movies: usize,
    pub series: usize,
    pub animes: usize,
    pub expiring: Vec<AccountRow>,
    pub default_password: bool,
}

#[derive(Template)]
#[template(path = "admin/generate.html")]
pub struct GenerateTemplate {
    pub layout: Layout,
    pub kind_label: String,
    pub segment: String,
    pub duration_days: i64,
    pub created: Option<AccountRow>,
}

#[derive(Template)]
#[template(path = "admin/accounts.html")]
pub struct AccountsTemplate {
    pub layout: Layout,
    pub kind_label: String,
    pub segment: String,
    pub is_test: bool,
    pub q: String,
    pub rows: Vec<AccountRow>,
    pub pager: Pager,
    pub activation_days: Vec<i64>,
}

#[derive(Template)]
#[template(path = "admin/content.html")]
pub struct ContentTemplate {
    pub layout: Layout,
    pub kind_label: String,
    pub segment: String,
    pub has_seasons: bool,
    pub q: String,
    pub rows: Vec<ContentRow>,
    pub pager: Pager,
    pub form: ContentForm,
    pub allowed_domains: String,
}

#[derive(Template)]
#[template(path = "admin/backup.html")]
pub struct BackupTemplate {
    pub layout: Layout,
    pub publish_target: String,
    pub saved_token: bool,
    pub bootstrap_enabled: bool,
}

#[derive(Template)]
#[template(path = "admin/settings.html")]
pub struct SettingsTemplate {
    pub layout: Layout,
    pub expiration_days: i64,
    pub test_duration_days: i64,
    pub site_name: String,
}

#[derive(Template)]
#[template(path = "catalog/catalog.html")]
pub struct CatalogTemplate {
    pub layout: Layout,
    pub tabs: Vec<NavTab>,
    pub kind_label: String,
    pub segment: String,
    pub q: String,
    pub categories: Vec<SelectOption>,
    pub cards: Vec<CardView>,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "catalog/favorites.html")]
pub struct FavoritesTemplate {
    pub layout: Layout,
    pub tabs: Vec<NavTab>,
    pub cards: Vec<CardView>,
}

#[derive(Template)]
#[template(path = "catalog/history.html")]
pub struct HistoryTemplate {
    pub layout: Layout,
    pub tabs: Vec<NavTab>,
    pub entries: Vec<HistoryView>,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "catalog/player.html")]
pub struct PlayerTemplate {
    pub layout: Layout,
    pub tabs: Vec<NavTab>,
    pub item: CardView,
    pub description: String,
    pub position: Option<String>,
    pub embed: Option<String>,
    pub link: String,
    pub seasons: Vec<SeasonView>,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub layout: Layout,
    pub code: u16,
    pub message: String,
}
