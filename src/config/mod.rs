use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub orders: OrdersConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL. Defaults to `storefront.db` inside the data dir.
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Store Argon2 hashes instead of the submitted password
    #[serde(default = "default_hash_passwords")]
    pub hash_passwords: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            hash_passwords: default_hash_passwords(),
        }
    }
}

fn default_hash_passwords() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrdersConfig {
    /// Reject orders that reference product ids with no matching product
    #[serde(default)]
    pub validate_products: bool,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse configuration file")
    }

    /// The SQLite URL the server connects to.
    pub fn database_url(&self) -> String {
        match &self.database.url {
            Some(url) => url.clone(),
            None => format!(
                "sqlite:{}",
                self.server.data_dir.join("storefront.db").display()
            ),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Check for settings that would prevent the server from starting.
    /// Returns one message per problem found.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.server.host.trim().is_empty() {
            problems.push("server.host must not be empty".to_string());
        }
        if self.server.port == 0 {
            problems.push("server.port must be between 1 and 65535".to_string());
        }
        if self.database.max_connections == 0 {
            problems.push("database.max_connections must be at least 1".to_string());
        }
        if let Some(url) = &self.database.url {
            if !url.starts_with("sqlite:") {
                problems.push(format!("database.url must be a sqlite: URL, got '{}'", url));
            }
        }
        if let Err(e) = EnvFilter::try_new(&self.logging.level) {
            problems.push(format!(
                "logging.level '{}' is not a valid filter: {}",
                self.logging.level, e
            ));
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert!(config.auth.hash_passwords);
        assert!(!config.orders.validate_products);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 9100

            [orders]
            validate_products = true
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.max_connections, 5);
        assert!(config.orders.validate_products);
    }

    #[test]
    fn test_example_file_parses() {
        let config = Config::from_toml(include_str!("../../storefront.example.toml")).unwrap();
        assert!(config.validate().is_empty());
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_database_url_defaults_to_data_dir() {
        let mut config = Config::default();
        config.server.data_dir = PathBuf::from("/var/lib/storefront");
        assert_eq!(
            config.database_url(),
            "sqlite:/var/lib/storefront/storefront.db"
        );

        config.database.url = Some("sqlite::memory:".to_string());
        assert_eq!(config.database_url(), "sqlite::memory:");
    }

    #[test]
    fn test_validate_reports_each_problem() {
        let config = Config::from_toml(
            r#"
            [server]
            host = ""
            port = 0

            [database]
            url = "postgres://localhost/shop"
            max_connections = 0

            [logging]
            level = "storefront=loud"
            "#,
        )
        .unwrap();

        assert_eq!(config.validate().len(), 5);
    }

    #[test]
    fn test_validate_accepts_filter_directives() {
        let mut config = Config::default();
        for level in ["debug", "WARN", "storefront=debug", "info,tower_http=trace"] {
            config.logging.level = level.to_string();
            assert!(config.validate().is_empty(), "rejected {}", level);
        }

        config.logging.level = "storefront=loud".to_string();
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"debug\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();

        assert!(Config::load(file.path()).is_err());
    }
}
