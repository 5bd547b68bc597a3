use crate::config::CatalogConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Current layout of the persisted document. Older layouts are upgraded by
/// `store::upgrade` before parsing.
pub const SCHEMA_VERSION: u32 = 1;

/// Fixed username of the singleton admin account.
pub const ADMIN_USERNAME: &str = "admin";

/// The whole persisted state, read and written as one JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub schema_version: u32,
    pub config: SiteConfig,
    pub users: Users,
    #[serde(default)]
    pub movies: Vec<Movie>,
    #[serde(default)]
    pub series: Vec<Show>,
    #[serde(default)]
    pub animes: Vec<Show>,
}

/// Runtime-editable settings stored inside the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    #[serde(default = "SiteConfig::default_expiration_days")]
    pub expiration_days: i64,
    #[serde(default = "SiteConfig::default_test_duration_days")]
    pub test_duration_days: i64,
    #[serde(default = "SiteConfig::default_site_name")]
    pub site_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Users {
    pub admin: AdminAccount,
    #[serde(default)]
    pub clients: Vec<Account>,
    #[serde(default)]
    pub tests: Vec<Account>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminAccount {
    pub username: String,
    /// Plaintext in legacy documents, an argon2 PHC string once changed here.
    pub password: String,
    /// Admin settings this server does not model are carried through as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: AccountStatus,
    #[serde(default)]
    pub favorites: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Stored account status. Only `Active` and `Blocked` are written by admin
/// actions; expiry is derived from `expires_at` at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    #[serde(rename = "ativo", alias = "válido", alias = "valido")]
    Active,
    #[serde(rename = "bloqueado")]
    Blocked,
    #[serde(rename = "expirado")]
    Expired,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ativo",
            AccountStatus::Blocked => "bloqueado",
            AccountStatus::Expired => "expirado",
        }
    }
}

/// Which of the two account lists an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    Client,
    Test,
}

impl AccountKind {
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "clients" => Some(AccountKind::Client),
            "tests" => Some(AccountKind::Test),
            _ => None,
        }
    }

    pub fn segment(&self) -> &'static str {
        match self {
            AccountKind::Client => "clients",
            AccountKind::Test => "tests",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AccountKind::Client => "client",
            AccountKind::Test => "test",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Movie,
    Series,
    Anime,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [ContentKind::Movie, ContentKind::Series, ContentKind::Anime];

    pub fn id_prefix(&self) -> &'static str {
        match self {
            ContentKind::Movie => "movie_",
            ContentKind::Series => "series_",
            ContentKind::Anime => "anime_",
        }
    }

    /// Plural path segment used by both the admin and catalog routes.
    pub fn segment(&self) -> &'static str {
        match self {
            ContentKind::Movie => "movies",
            ContentKind::Series => "series",
            ContentKind::Anime => "animes",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "movies" => Some(ContentKind::Movie),
            "series" => Some(ContentKind::Series),
            "animes" => Some(ContentKind::Anime),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Movie => "Movies",
            ContentKind::Series => "Series",
            ContentKind::Anime => "Animes",
        }
    }

    pub fn has_seasons(&self) -> bool {
        !matches!(self, ContentKind::Movie)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub link: String,
}

/// A series or an anime: both are seasons of linked episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub seasons: Vec<Season>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Season {
    pub season_number: u32,
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub episode_number: u32,
    pub link: String,
}

/// Borrowed view over any catalog entry.
#[derive(Debug, Clone, Copy)]
pub enum ContentRef<'a> {
    Movie(&'a Movie),
    Show(ContentKind, &'a Show),
}

impl<'a> ContentRef<'a> {
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentRef::Movie(_) => ContentKind::Movie,
            ContentRef::Show(kind, _) => *kind,
        }
    }

    pub fn id(&self) -> &'a str {
        match self {
            ContentRef::Movie(m) => &m.id,
            ContentRef::Show(_, s) => &s.id,
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            ContentRef::Movie(m) => &m.name,
            ContentRef::Show(_, s) => &s.name,
        }
    }

    pub fn description(&self) -> &'a str {
        match self {
            ContentRef::Movie(m) => &m.description,
            ContentRef::Show(_, s) => &s.description,
        }
    }

    pub fn cover(&self) -> &'a str {
        match self {
            ContentRef::Movie(m) => &m.cover,
            ContentRef::Show(_, s) => &s.cover,
        }
    }

    pub fn category(&self) -> &'a str {
        match self {
            ContentRef::Movie(m) => &m.category,
            ContentRef::Show(_, s) => &s.category,
        }
    }

    pub fn release_year(&self) -> Option<i32> {
        match self {
            ContentRef::Movie(m) => m.release_year,
            ContentRef::Show(_, s) => s.release_year,
        }
    }
}

/// One entry of a client's watch history, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub timestamp: DateTime<Utc>,
}

impl Document {
    /// The document a fresh store starts from.
    pub fn new(catalog: &CatalogConfig) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            config: SiteConfig {
                expiration_days: catalog.expiration_days,
                test_duration_days: catalog.test_duration_days,
                site_name: catalog.site_name.clone(),
            },
            users: Users {
                admin: AdminAccount {
                    username: ADMIN_USERNAME.to_string(),
                    password: catalog.default_admin_password.clone(),
                    extra: Map::new(),
                },
                clients: Vec::new(),
                tests: Vec::new(),
            },
            movies: Vec::new(),
            series: Vec::new(),
            animes: Vec::new(),
        }
    }

    pub fn accounts(&self, kind: AccountKind) -> &Vec<Account> {
        match kind {
            AccountKind::Client => &self.users.clients,
            AccountKind::Test => &self.users.tests,
        }
    }

    pub fn accounts_mut(&mut self, kind: AccountKind) -> &mut Vec<Account> {
        match kind {
            AccountKind::Client => &mut self.users.clients,
            AccountKind::Test => &mut self.users.tests,
        }
    }

    pub fn find_account(&self, kind: AccountKind, username: &str) -> Option<&Account> {
        self.accounts(kind).iter().find(|a| a.username == username)
    }

    pub fn find_account_mut(&mut self, kind: AccountKind, username: &str) -> Option<&mut Account> {
        self.accounts_mut(kind)
            .iter_mut()
            .find(|a| a.username == username)
    }

    /// Client or test account by username, clients first.
    pub fn find_any_account_mut(&mut self, username: &str) -> Option<&mut Account> {
        if self.find_account(AccountKind::Client, username).is_some() {
            return self.find_account_mut(AccountKind::Client, username);
        }
        self.find_account_mut(AccountKind::Test, username)
    }

    pub fn find_any_account(&self, username: &str) -> Option<&Account> {
        self.find_account(AccountKind::Client, username)
            .or_else(|| self.find_account(AccountKind::Test, username))
    }

    pub fn shows(&self, kind: ContentKind) -> &Vec<Show> {
        match kind {
            ContentKind::Anime => &self.animes,
            _ => &self.series,
        }
    }

    pub fn shows_mut(&mut self, kind: ContentKind) -> &mut Vec<Show> {
        match kind {
            ContentKind::Anime => &mut self.animes,
            _ => &mut self.series,
        }
    }

    /// Every item of one kind, in stored order.
    pub fn content(&self, kind: ContentKind) -> Vec<ContentRef<'_>> {
        match kind {
            ContentKind::Movie => self.movies.iter().map(ContentRef::Movie).collect(),
            _ => self
                .shows(kind)
                .iter()
                .map(|s| ContentRef::Show(kind, s))
                .collect(),
        }
    }

    /// Looks an id up across movies, series and animes.
    pub fn find_content(&self, id: &str) -> Option<ContentRef<'_>> {
        ContentKind::ALL
            .iter()
            .flat_map(|kind| self.content(*kind))
            .find(|item| item.id() == id)
    }
}

impl SiteConfig {
    fn default_expiration_days() -> i64 {
        31
    }

    fn default_test_duration_days() -> i64 {
        7
    }

    pub(crate) fn default_site_name() -> String {
        "MeuFlix".to_string()
    }
}
