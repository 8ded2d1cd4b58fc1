use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StubConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Largest `count` accepted by `/_uuids`
    #[serde(default = "default_max_uuids")]
    pub max_uuids: usize,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Directory for JSON log files, empty for console only
    #[serde(default)]
    pub log_dir: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5984
}

fn default_workers() -> usize {
    2
}

fn default_max_uuids() -> usize {
    1000
}

fn default_max_body_bytes() -> usize {
    64 * 1024 * 1024
}

impl StubConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        let config: StubConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
            max_uuids: default_max_uuids(),
            max_body_bytes: default_max_body_bytes(),
            log_dir: String::new(),
        }
    }
}
