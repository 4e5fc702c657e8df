use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Without a database the server runs on the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub cors_origins: Vec<String>,
    pub reward_catalog_path: Option<PathBuf>,
    pub run_migrations: bool,
}

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_raw = non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            key: "BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let jwt_secret = non_empty("JWT_SECRET_KEY").ok_or(ConfigError::Missing("JWT_SECRET_KEY"))?;

        let cors_origins = non_empty("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let run_migrations = match non_empty("RUN_MIGRATIONS").as_deref() {
            None | Some("false") | Some("0") => false,
            Some("true") | Some("1") => true,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "RUN_MIGRATIONS",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            bind_addr,
            database_url: non_empty("DATABASE_URL"),
            jwt_secret,
            cors_origins,
            reward_catalog_path: non_empty("REWARD_CATALOG_PATH").map(PathBuf::from),
            run_migrations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET_KEY", "s")])).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:3000".parse().unwrap());
        assert!(config.database_url.is_none());
        assert!(config.cors_origins.is_empty());
        assert!(!config.run_migrations);
    }

    #[test]
    fn test_full_environment() {
        let config = Config::from_lookup(lookup(&[
            ("JWT_SECRET_KEY", "s"),
            ("BIND_ADDR", "0.0.0.0:8080"),
            ("DATABASE_URL", "postgres://localhost/dino"),
            ("CORS_ORIGINS", "https://dino18.example, http://127.0.0.1:8080,"),
            ("REWARD_CATALOG_PATH", "rewards.json"),
            ("RUN_MIGRATIONS", "true"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/dino"));
        assert_eq!(config.cors_origins, vec!["https://dino18.example", "http://127.0.0.1:8080"]);
        assert_eq!(config.reward_catalog_path, Some(PathBuf::from("rewards.json")));
        assert!(config.run_migrations);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            Config::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::Missing("JWT_SECRET_KEY")
        );
        assert!(matches!(
            Config::from_lookup(lookup(&[("JWT_SECRET_KEY", "s"), ("BIND_ADDR", "nowhere")])),
            Err(ConfigError::Invalid { key: "BIND_ADDR", .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("JWT_SECRET_KEY", "s"), ("RUN_MIGRATIONS", "maybe")])),
            Err(ConfigError::Invalid { key: "RUN_MIGRATIONS", .. })
        ));
    }
}
