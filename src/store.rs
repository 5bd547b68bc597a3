use crate::config::CatalogConfig;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{Document, HistoryEntry, SCHEMA_VERSION};
use chrono::{SecondsFormat, TimeZone, Utc};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

const HISTORY_KEY_PREFIX: &str = "watchHistory_";
const PUBLISH_TOKEN_KEY: &str = "githubToken";

/// Whole-document store over one storage key.
///
/// Reads never fail on bad data: an absent or corrupt document reads as the
/// default one. Writes replace the document wholesale. `update` serialises
/// read-modify-write cycles so concurrent requests cannot drop each other's
/// changes.
#[derive(Clone)]
pub struct Store {
    db: Database,
    key: String,
    catalog: Arc<CatalogConfig>,
    lock: Arc<Mutex<()>>,
}

impl Store {
    pub fn new(db: Database, catalog: &CatalogConfig) -> Self {
        Self {
            db,
            key: catalog.document_key.clone(),
            catalog: Arc::new(catalog.clone()),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn default_document(&self) -> Document {
        Document::new(&self.catalog)
    }

    /// The current document, or the default when absent or corrupt.
    pub async fn get(&self) -> Result<Document> {
        Ok(self
            .stored()
            .await?
            .unwrap_or_else(|| self.default_document()))
    }

    /// The stored document if one exists and parses.
    pub async fn stored(&self) -> Result<Option<Document>> {
        let Some(raw) = self.db.get_value(&self.key).await? else {
            return Ok(None);
        };

        match parse_document(&raw) {
            Ok(doc) => Ok(Some(doc)),
            Err(e) => {
                tracing::warn!("Stored document under '{}' is unreadable: {}", self.key, e);
                Ok(None)
            }
        }
    }

    pub async fn set(&self, doc: &Document) -> Result<()> {
        let json = serde_json::to_string(doc)?;
        self.db.set_value(&self.key, &json).await?;
        Ok(())
    }

    /// Reads, mutates and writes back the document under the store lock.
    /// Nothing is written when `f` fails.
    pub async fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Document) -> Result<T>,
    {
        let _guard = self.lock.lock().await;
        let mut doc = self.get().await?;
        let out = f(&mut doc)?;
        self.set(&doc).await?;
        Ok(out)
    }

    /// Overwrites the document under the store lock.
    pub async fn replace(&self, doc: &Document) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.set(doc).await
    }

    pub async fn export(&self) -> Result<String> {
        let doc = self.get().await?;
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    /// Replaces the document with an uploaded one. Corrupt input is an error
    /// and leaves the store untouched.
    pub async fn import(&self, text: &str) -> Result<Document> {
        let doc = parse_document(text)?;
        self.replace(&doc).await?;
        tracing::info!(
            "Imported document: {} clients, {} tests, {} movies, {} series, {} animes",
            doc.users.clients.len(),
            doc.users.tests.len(),
            doc.movies.len(),
            doc.series.len(),
            doc.animes.len()
        );
        Ok(doc)
    }

    pub async fn reset(&self) -> Result<Document> {
        let doc = self.default_document();
        self.replace(&doc).await?;
        tracing::warn!("Document under '{}' reset to defaults", self.key);
        Ok(doc)
    }

    pub async fn history(&self, username: &str) -> Result<Vec<HistoryEntry>> {
        let key = history_key(username);
        let Some(raw) = self.db.get_value(&key).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!("Discarding unreadable history for {}: {}", username, e);
                Ok(Vec::new())
            }
        }
    }

    pub async fn set_history(&self, username: &str, entries: &[HistoryEntry]) -> Result<()> {
        let json = serde_json::to_string(entries)?;
        self.db.set_value(&history_key(username), &json).await?;
        Ok(())
    }

    /// Read-modify-write of one user's history under the store lock.
    pub async fn update_history<F>(&self, username: &str, f: F) -> Result<Vec<HistoryEntry>>
    where
        F: FnOnce(&mut Vec<HistoryEntry>),
    {
        let _guard = self.lock.lock().await;
        let mut entries = self.history(username).await?;
        f(&mut entries);
        self.set_history(username, &entries).await?;
        Ok(entries)
    }

    pub async fn clear_history(&self, username: &str) -> Result<()> {
        self.db.delete_value(&history_key(username)).await?;
        Ok(())
    }

    pub async fn publish_token(&self) -> Result<Option<String>> {
        Ok(self.db.get_value(PUBLISH_TOKEN_KEY).await?)
    }

    pub async fn save_publish_token(&self, token: Option<&str>) -> Result<()> {
        match token {
            Some(token) => self.db.set_value(PUBLISH_TOKEN_KEY, token).await?,
            None => self.db.delete_value(PUBLISH_TOKEN_KEY).await?,
        }
        Ok(())
    }
}

fn history_key(username: &str) -> String {
    format!("{}{}", HISTORY_KEY_PREFIX, username)
}

/// Parses document text of any known schema version.
pub fn parse_document(text: &str) -> Result<Document> {
    let raw: Value = serde_json::from_str(text)?;
    parse_document_value(raw)
}

pub fn parse_document_value(raw: Value) -> Result<Document> {
    let upgraded = upgrade(raw)?;
    Ok(serde_json::from_value(upgraded)?)
}

type UpgradeStep = fn(&mut Map<String, Value>);

/// Schema steps in order; step `n` upgrades version `n` to `n + 1`.
const UPGRADES: [UpgradeStep; SCHEMA_VERSION as usize] = [upgrade_v0_to_v1];

/// Brings a raw document up to `SCHEMA_VERSION`.
pub fn upgrade(mut raw: Value) -> Result<Value> {
    let obj = raw
        .as_object_mut()
        .ok_or_else(|| AppError::BadRequest("Document must be a JSON object".to_string()))?;

    let version = obj
        .get("schemaVersion")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    if version > u64::from(SCHEMA_VERSION) {
        return Err(AppError::BadRequest(format!(
            "Document schema version {} is newer than supported version {}",
            version, SCHEMA_VERSION
        )));
    }

    for step in &UPGRADES[version as usize..] {
        step(obj);
    }
    obj.insert("schemaVersion".to_string(), json!(SCHEMA_VERSION));

    Ok(raw)
}

/// v0 is every document written before versioning: lists may be missing,
/// timestamps may be epoch milliseconds, statuses come in several spellings.
fn upgrade_v0_to_v1(doc: &mut Map<String, Value>) {
    ensure_object(doc, "config");

    for key in ["movies", "series", "animes"] {
        ensure_array(doc, key);
        if let Some(Value::Array(items)) = doc.get_mut(key) {
            for item in items.iter_mut().filter_map(Value::as_object_mut) {
                null_to_empty(item, "description");
                null_to_empty(item, "cover");
                null_to_empty(item, "category");
            }
        }
    }

    let users = ensure_object(doc, "users");
    for key in ["clients", "tests"] {
        ensure_array(users, key);
        if let Some(Value::Array(accounts)) = users.get_mut(key) {
            for account in accounts.iter_mut().filter_map(Value::as_object_mut) {
                upgrade_account_v1(account);
            }
        }
    }
}

fn upgrade_account_v1(account: &mut Map<String, Value>) {
    ensure_array(account, "favorites");
    null_to_empty(account, "description");

    let blocked_flag = account
        .remove("isBlocked")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let status = account
        .get("status")
        .and_then(Value::as_str)
        .map(|s| s.to_lowercase());
    let status = match status.as_deref() {
        _ if blocked_flag => "bloqueado",
        Some("bloqueado") => "bloqueado",
        Some("expirado") => "expirado",
        _ => "ativo",
    };
    account.insert("status".to_string(), json!(status));

    for field in ["createdAt", "expiresAt"] {
        if let Some(ms) = account.get(field).and_then(Value::as_i64) {
            if let Some(ts) = Utc.timestamp_millis_opt(ms).single() {
                account.insert(
                    field.to_string(),
                    json!(ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
                );
            }
        }
    }

    if !account.contains_key("createdAt") {
        let created = account
            .get("expiresAt")
            .cloned()
            .unwrap_or_else(|| json!(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)));
        account.insert("createdAt".to_string(), created);
    }
}

fn ensure_object<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let entry = map.entry(key.to_string()).or_insert_with(|| json!({}));
    if !entry.is_object() {
        *entry = json!({});
    }
    match entry {
        Value::Object(obj) => obj,
        _ => unreachable!("entry was just set to an object"),
    }
}

fn ensure_array(map: &mut Map<String, Value>, key: &str) {
    let entry = map.entry(key.to_string()).or_insert_with(|| json!([]));
    if !entry.is_array() {
        *entry = json!([]);
    }
}

fn null_to_empty(map: &mut Map<String, Value>, key: &str) {
    if let Some(value) = map.get_mut(key) {
        if value.is_null() {
            *value = json!("");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{Account, AccountStatus, ContentKind, Movie};
    use chrono::Duration;

    async fn test_store() -> Store {
        let db = Database::new("sqlite::memory:", 1).await.unwrap();
        Store::new(db, &Config::default().catalog)
    }

    fn sample_account(username: &str) -> Account {
        let now = Utc::now();
        Account {
            username: username.to_string(),
            password: "54321".to_string(),
            description: "Loja X".to_string(),
            created_at: now,
            expires_at: now + Duration::days(31),
            status: AccountStatus::Active,
            favorites: vec!["movie_1".to_string()],
            name: None,
            whatsapp: None,
            email: None,
        }
    }

    #[tokio::test]
    async fn test_get_returns_default_when_absent() {
        let store = test_store().await;
        let doc = store.get().await.unwrap();
        assert_eq!(doc, store.default_document());
        assert_eq!(doc.users.admin.username, "admin");
        assert_eq!(doc.schema_version, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_corrupt_document_reads_as_default() {
        let store = test_store().await;
        store.db.set_value(&store.key, "{not json").await.unwrap();

        let doc = store.get().await.unwrap();
        assert_eq!(doc, store.default_document());
        assert!(store.stored().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_persists_whole_document() {
        let store = test_store().await;
        store
            .update(|doc| {
                doc.users.clients.push(sample_account("12345"));
                Ok(())
            })
            .await
            .unwrap();

        let doc = store.get().await.unwrap();
        assert_eq!(doc.users.clients.len(), 1);
        assert_eq!(doc.users.clients[0].username, "12345");
    }

    #[tokio::test]
    async fn test_failed_update_leaves_store_unchanged() {
        let store = test_store().await;
        let before = store.get().await.unwrap();

        let result: Result<()> = store
            .update(|doc| {
                doc.users.clients.push(sample_account("12345"));
                Err(AppError::BadRequest("nope".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(store.get().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_export_import_round_trip() {
        let store = test_store().await;
        store
            .update(|doc| {
                doc.users.clients.push(sample_account("12345"));
                doc.movies.push(Movie {
                    id: "movie_1700000000000abcdefghi".to_string(),
                    name: "Ação Total".to_string(),
                    description: "Um filme".to_string(),
                    cover: "data:image/png;base64,AAAA".to_string(),
                    category: "acao".to_string(),
                    release_year: Some(1999),
                    created_at: Some(Utc::now()),
                    link: "https://youtu.be/abc".to_string(),
                });
                Ok(())
            })
            .await
            .unwrap();

        let exported = store.export().await.unwrap();
        let imported = store.import(&exported).await.unwrap();
        let exported_again = store.export().await.unwrap();

        assert_eq!(exported, exported_again);
        let first: Value = serde_json::from_str(&exported).unwrap();
        let second: Value = serde_json::from_str(&exported_again).unwrap();
        assert_eq!(first, second);
        assert_eq!(imported.movies[0].name, "Ação Total");
    }

    #[tokio::test]
    async fn test_corrupt_import_is_rejected() {
        let store = test_store().await;
        store
            .update(|doc| {
                doc.users.tests.push(sample_account("11111"));
                Ok(())
            })
            .await
            .unwrap();
        let before = store.get().await.unwrap();

        assert!(store.import("[1, 2, 3]").await.is_err());
        assert!(store.import("{\"users\": ").await.is_err());
        assert_eq!(store.get().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_reset_restores_defaults() {
        let store = test_store().await;
        store
            .update(|doc| {
                doc.users.clients.push(sample_account("12345"));
                Ok(())
            })
            .await
            .unwrap();

        store.reset().await.unwrap();
        assert!(store.get().await.unwrap().users.clients.is_empty());
    }

    #[tokio::test]
    async fn test_history_is_kept_per_user() {
        let store = test_store().await;
        let entry = HistoryEntry {
            id: "movie_1".to_string(),
            kind: ContentKind::Movie,
            timestamp: Utc::now(),
        };
        store.set_history("12345", &[entry.clone()]).await.unwrap();

        assert_eq!(store.history("12345").await.unwrap(), vec![entry]);
        assert!(store.history("54321").await.unwrap().is_empty());

        store.clear_history("12345").await.unwrap();
        assert!(store.history("12345").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_token_save_and_forget() {
        let store = test_store().await;
        store.save_publish_token(Some("ghp_abc")).await.unwrap();
        assert_eq!(store.publish_token().await.unwrap().as_deref(), Some("ghp_abc"));
        store.save_publish_token(None).await.unwrap();
        assert_eq!(store.publish_token().await.unwrap(), None);
    }

    #[test]
    fn test_upgrade_legacy_document() {
        let legacy = json!({
            "config": { "expirationDays": 31 },
            "users": {
                "admin": { "username": "admin", "password": "36365852" },
                "clients": [
                    {
                        "username": "12345",
                        "password": "11111",
                        "description": null,
                        "createdAt": 1700000000000i64,
                        "expiresAt": 1702592000000i64,
                        "status": "válido"
                    },
                    {
                        "username": "22222",
                        "password": "33333",
                        "createdAt": "2024-01-01T00:00:00.000Z",
                        "expiresAt": "2024-02-01T00:00:00.000Z",
                        "isBlocked": true
                    }
                ]
            },
            "movies": [],
            "series": []
        });

        let doc = parse_document_value(legacy).unwrap();
        assert_eq!(doc.schema_version, SCHEMA_VERSION);
        assert!(doc.users.tests.is_empty());
        assert!(doc.animes.is_empty());
        assert_eq!(doc.config.test_duration_days, 7);

        let first = &doc.users.clients[0];
        assert_eq!(first.status, AccountStatus::Active);
        assert_eq!(first.description, "");
        assert!(first.favorites.is_empty());
        assert_eq!(first.created_at.timestamp_millis(), 1700000000000);

        assert_eq!(doc.users.clients[1].status, AccountStatus::Blocked);
    }

    #[test]
    fn test_upgrade_rejects_newer_schema() {
        let future = json!({ "schemaVersion": SCHEMA_VERSION + 1 });
        assert!(upgrade(future).is_err());
    }

    #[test]
    fn test_upgrade_is_idempotent_on_current_version() {
        let catalog = Config::default().catalog;
        let doc = Document::new(&catalog);
        let value = serde_json::to_value(&doc).unwrap();
        let upgraded = upgrade(value.clone()).unwrap();
        assert_eq!(value, upgraded);
    }
}
