use serde::{Deserialize, Serialize};
use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in milliseconds, read fresh by every request
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub insecure_skip_verify: bool,
    /// Extra PEM root certificate, empty to use the bundled roots only
    #[serde(default)]
    pub ca_cert_path: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "http://localhost:5984".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    format!("couchdb-rs/{}", env!("CARGO_PKG_VERSION"))
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Build a config from `COUCHDB_URL` (or `DB_URL`), `COUCHDB_TIMEOUT_MS`
    /// and `COUCHDB_INSECURE_SKIP_VERIFY`, falling back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Config::default();

        if let Some(url) = var("COUCHDB_URL").or_else(|| var("DB_URL")) {
            config.base_url = url;
        }
        if let Some(timeout) = var("COUCHDB_TIMEOUT_MS") {
            config.timeout_ms = timeout
                .trim()
                .parse()
                .with_context(|| format!("COUCHDB_TIMEOUT_MS is not a number: {}", timeout))?;
        }
        if let Some(insecure) = var("COUCHDB_INSECURE_SKIP_VERIFY") {
            config.insecure_skip_verify = matches!(insecure.trim(), "1" | "true" | "yes");
        }

        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            insecure_skip_verify: false,
            ca_cert_path: String::new(),
            user_agent: default_user_agent(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://localhost:5984");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert!(!config.insecure_skip_verify);
        assert!(config.user_agent.starts_with("couchdb-rs/"));
    }

    #[test]
    fn test_load_fills_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"base_url": "https://db.example.com:6984", "timeout_ms": 2500}}"#
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.base_url, "https://db.example.com:6984");
        assert_eq!(config.timeout_ms, 2500);
        assert!(config.ca_cert_path.is_empty());
    }

    #[test]
    fn test_load_missing_file_is_error() {
        assert!(Config::load("/definitely/not/here.json").is_err());
    }

    #[test]
    fn test_from_vars_prefers_couchdb_url() {
        let config = Config::from_vars(vars(&[
            ("COUCHDB_URL", "http://couch:5984"),
            ("DB_URL", "http://other:5984"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://couch:5984");

        let config = Config::from_vars(vars(&[("DB_URL", "http://other:5984")])).unwrap();
        assert_eq!(config.base_url, "http://other:5984");
    }

    #[test]
    fn test_from_vars_timeout_and_tls() {
        let config = Config::from_vars(vars(&[
            ("COUCHDB_TIMEOUT_MS", " 3000 "),
            ("COUCHDB_INSECURE_SKIP_VERIFY", "true"),
        ]))
        .unwrap();
        assert_eq!(config.timeout_ms, 3000);
        assert!(config.insecure_skip_verify);

        assert!(Config::from_vars(vars(&[("COUCHDB_TIMEOUT_MS", "soon")])).is_err());
    }
}
