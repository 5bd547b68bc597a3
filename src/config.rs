use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    #[serde(default)]
    pub publish: PublishConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "ServerConfig::default_static_dir")]
    pub static_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub session_timeout_hours: i64,
    #[serde(default)]
    pub secure_cookies: bool,
}

/// Seed values for a fresh document and catalog limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Storage key the whole document is persisted under.
    pub document_key: String,
    pub site_name: String,
    pub default_admin_password: String,
    pub expiration_days: i64,
    pub test_duration_days: i64,
    pub max_cover_size_kb: usize,
    pub max_import_size_mb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub enabled: bool,
    pub url: String,
    pub timeout_secs: u64,
}

/// Target file of the GitHub Contents API publish flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub branch: String,
    pub commit_message: String,
    pub timeout_secs: u64,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());

        let mut config = Self::from_path(&config_path)?;

        // Override with environment variables if present
        config.apply_env_overrides();

        if config.security.jwt_secret.is_empty()
            || config.security.jwt_secret == "your-secret-key-here-change-this"
        {
            tracing::warn!("JWT secret not configured, generating random secret");
            config.security.jwt_secret = Self::generate_jwt_secret();
        }

        config.validate()?;

        Ok(config)
    }

    /// Reads a TOML file, falling back to defaults when it does not exist.
    pub fn from_path(config_path: &str) -> Result<Self> {
        if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)
                .context(format!("Failed to read config file at {}", config_path))?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            tracing::warn!("Config file not found at {}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("SERVER_PORT") {
            if let Ok(port_num) = port.parse() {
                self.server.port = port_num;
            }
        }
        if let Ok(db_url) = std::env::var("DATABASE_URL") {
            self.database.url = db_url;
        }
        if let Ok(jwt_secret) = std::env::var("JWT_SECRET") {
            self.security.jwt_secret = jwt_secret;
        }
        if let Ok(url) = std::env::var("BOOTSTRAP_URL") {
            self.bootstrap.enabled = !url.is_empty();
            self.bootstrap.url = url;
        }
    }

    fn generate_jwt_secret() -> String {
        use rand::Rng;
        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
        let mut rng = rand::thread_rng();
        (0..43)
            .map(|_| {
                let idx = rng.gen_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let days = 1..=crate::accounts::MAX_DAYS;
        if !days.contains(&self.catalog.expiration_days) {
            bail!("catalog.expiration_days must be between 1 and {}", days.end());
        }
        if !days.contains(&self.catalog.test_duration_days) {
            bail!("catalog.test_duration_days must be between 1 and {}", days.end());
        }
        if self.catalog.document_key.trim().is_empty() {
            bail!("catalog.document_key cannot be empty");
        }
        if self.bootstrap.enabled && self.bootstrap.url.trim().is_empty() {
            bail!("bootstrap.url is required when bootstrap is enabled");
        }

        // Create the directory holding the SQLite file (for easier setup)
        if let Some(parent) = self.sqlite_parent_dir() {
            if !parent.exists() {
                tracing::info!("Creating database directory: {:?}", parent);
                std::fs::create_dir_all(parent).context("Failed to create database directory")?;
            }
        }

        Ok(())
    }

    fn sqlite_parent_dir(&self) -> Option<&Path> {
        let path = self.database.url.strip_prefix("sqlite:")?;
        let path = path.trim_start_matches("//");
        if path.starts_with(":memory:") || path.is_empty() {
            return None;
        }
        let path = path.split('?').next().unwrap_or(path);
        Path::new(path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
    }

    pub fn max_cover_size_bytes(&self) -> usize {
        self.catalog.max_cover_size_kb * 1024
    }

    pub fn max_body_size_bytes(&self) -> usize {
        (self.catalog.max_import_size_mb * 1024 * 1024) as usize
    }
}

impl ServerConfig {
    fn default_static_dir() -> String {
        "static".to_string()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                static_dir: ServerConfig::default_static_dir(),
            },
            database: DatabaseConfig {
                url: "sqlite:./data/meuflix.db".to_string(),
                max_connections: 5,
            },
            security: SecurityConfig {
                jwt_secret: "your-secret-key-here-change-this".to_string(),
                session_timeout_hours: 24,
                secure_cookies: false,
            },
            catalog: CatalogConfig {
                document_key: "startflix_db".to_string(),
                site_name: "MeuFlix".to_string(),
                default_admin_password: "admin".to_string(),
                expiration_days: 31,
                test_duration_days: 7,
                max_cover_size_kb: 1024,
                max_import_size_mb: 50,
            },
            bootstrap: BootstrapConfig::default(),
            publish: PublishConfig::default(),
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            timeout_secs: 10,
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            owner: "future-xrl".to_string(),
            repo: "MeuFlix".to_string(),
            path: "cinemaDB.json".to_string(),
            branch: "main".to_string(),
            commit_message: "Update catalog database".to_string(),
            timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            ..Config::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.catalog.expiration_days, 31);
        assert_eq!(config.catalog.test_duration_days, 7);
        assert_eq!(config.max_cover_size_bytes(), 1024 * 1024);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::from_path("/nonexistent/meuflix.toml").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.catalog.document_key, "startflix_db");
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
host = "127.0.0.1"
port = 3000

[database]
url = "sqlite::memory:"
max_connections = 1

[security]
jwt_secret = "secret"
session_timeout_hours = 12

[catalog]
document_key = "catalog"
site_name = "Test"
default_admin_password = "pw"
expiration_days = 30
test_duration_days = 3
max_cover_size_kb = 512
max_import_size_mb = 5

[bootstrap]
enabled = true
url = "https://example.com/cinemaDB.json"
timeout_secs = 5
"#
        )
        .unwrap();

        let config = Config::from_path(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.static_dir, "static");
        assert_eq!(config.catalog.test_duration_days, 3);
        assert!(config.bootstrap.enabled);
        // Sections left out of the file fall back to defaults
        assert_eq!(config.publish.branch, "main");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_enabled_bootstrap_without_url() {
        let mut config = Config::default();
        config.database.url = "sqlite::memory:".to_string();
        config.bootstrap.enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_durations() {
        let mut config = Config::default();
        config.database.url = "sqlite::memory:".to_string();
        config.catalog.expiration_days = 100_000_000;
        assert!(config.validate().is_err());

        config.catalog.expiration_days = 31;
        config.catalog.test_duration_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sqlite_parent_dir() {
        let mut config = Config::default();
        assert_eq!(config.sqlite_parent_dir(), Some(Path::new("./data")));

        config.database.url = "sqlite::memory:".to_string();
        assert_eq!(config.sqlite_parent_dir(), None);
    }
}
