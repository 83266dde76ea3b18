use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub anilist: AniListConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Local file path or a `libsql://` Turso URL.
    pub url: String,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AniListConfig {
    pub api_url: String,
    pub timeout_seconds: u64,
    pub per_page: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: String,
    pub file_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "anilog.db".to_string(),
            auth_token: None,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_minutes: 15,
            refresh_token_days: 7,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Default for AniListConfig {
    fn default() -> Self {
        Self {
            api_url: "https://graphql.anilist.co".to_string(),
            timeout_seconds: 10,
            per_page: 20,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            file_prefix: "anilog.log".to_string(),
        }
    }
}

impl Config {
    /// Loads the optional TOML file, applies environment overrides, then validates.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new("config.toml").exists() => Self::from_file(Path::new("config.toml"))?,
            None => Config::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(port) = env::var("ANILOG_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("ANILOG_PORT is not a port: {}", port)))?;
        }
        if let Ok(url) = env::var("LIBSQL_URL") {
            self.database.url = url;
        }
        if let Ok(token) = env::var("LIBSQL_AUTH_TOKEN") {
            self.database.auth_token = Some(token);
        }
        if let Ok(secret) = env::var("ANILOG_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(url) = env::var("ANILIST_API_URL") {
            self.anilist.api_url = url;
        }
        if let Ok(dir) = env::var("ANILOG_LOG_DIR") {
            self.logging.dir = dir;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid(
                "JWT secret must be at least 32 bytes (set ANILOG_JWT_SECRET)".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server port must be non-zero".to_string()));
        }
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::Invalid(format!(
                "bcrypt cost {} is outside 4..=31",
                self.auth.bcrypt_cost
            )));
        }
        if self.auth.access_token_minutes <= 0 || self.auth.refresh_token_days <= 0 {
            return Err(ConfigError::Invalid("token lifetimes must be positive".to_string()));
        }
        if self.anilist.per_page == 0 {
            return Err(ConfigError::Invalid("anilist.per_page must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9090

[auth]
jwt_secret = "{SECRET}"
bcrypt_cost = 4

[anilist]
per_page = 50
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.auth.bcrypt_cost, 4);
        assert_eq!(config.auth.access_token_minutes, 15);
        assert_eq!(config.anilist.per_page, 50);
        assert_eq!(config.anilist.api_url, "https://graphql.anilist.co");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_short_secret_is_rejected() {
        let mut config = Config::default();
        config.auth.jwt_secret = "too-short".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.auth.jwt_secret = SECRET.to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = Config::from_file(Path::new("/nonexistent/anilog.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/anilog.toml"));
    }
}
