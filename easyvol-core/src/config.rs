use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Centralized configuration for the EasyVol backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EasyvolConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub pdf: PdfSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// Allow permissive CORS (default: false = localhost only)
    pub cors_permissive: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3040,
            cors_permissive: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    /// Root directory for uploaded files. Every download is resolved
    /// and contained under this directory.
    pub uploads_root: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            uploads_root: PathBuf::from("uploads"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfSection {
    /// External HTML-to-PDF converter binary
    pub binary: String,
    pub timeout_secs: u64,
}

impl Default for PdfSection {
    fn default() -> Self {
        Self {
            binary: "wkhtmltopdf".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for EasyvolConfig {
    fn default() -> Self {
        Self {
            server: ServerSection::default(),
            database: DatabaseSection::default(),
            storage: StorageSection::default(),
            pdf: PdfSection::default(),
        }
    }
}

impl EasyvolConfig {
    /// Load config from ~/.easyvol/config.toml (or `EASYVOL_CONFIG`).
    ///
    /// A missing file yields defaults so that a deployment driven purely by
    /// environment variables works; a present-but-invalid file fails hard.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .context(format!("Failed to read config file: {:?}", config_path))?;
            toml::from_str(&content).context("Failed to parse config file (invalid TOML)")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Get config file path: ~/.easyvol/config.toml
    pub fn config_path() -> PathBuf {
        if let Ok(path) = env::var("EASYVOL_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".easyvol/config.toml")
    }

    /// Resolve the database URL, failing with an actionable message.
    pub fn database_url(&self) -> Result<String> {
        self.database
            .url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL not set and [database].url missing from config"))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Ok(host) = env::var("EASYVOL_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("EASYVOL_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(root) = env::var("EASYVOL_UPLOADS_ROOT") {
            self.storage.uploads_root = PathBuf::from(root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_localhost() {
        let config = EasyvolConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3040);
        assert!(!config.server.cors_permissive);
    }

    #[test]
    fn parses_partial_toml() {
        let config: EasyvolConfig = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            cors_permissive = true
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert!(config.server.cors_permissive);
        // Untouched sections fall back to defaults
        assert_eq!(config.pdf.binary, "wkhtmltopdf");
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn missing_database_url_is_actionable() {
        let config = EasyvolConfig::default();
        let err = config.database_url().unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }
}
