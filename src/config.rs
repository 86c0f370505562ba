use serde::Deserialize;
use std::time::Duration;

use crate::models::KnownChordPolicy;
use crate::services::group::UnreachableMemberPolicy;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the remote catalog service
    #[serde(default)]
    pub catalog_url: Option<String>,

    /// Path to a catalog JSON file, used when no catalog URL is set
    #[serde(default)]
    pub catalog_path: Option<String>,

    /// How long a catalog snapshot is served before it is refetched
    #[serde(default = "default_catalog_ttl_secs")]
    pub catalog_ttl_secs: u64,

    /// Which inventory entries count as known chords
    #[serde(default)]
    pub known_chord_policy: KnownChordPolicy,

    /// What to do when a group member's inventory cannot be fetched
    #[serde(default)]
    pub unreachable_member_policy: UnreachableMemberPolicy,

    /// Page size for list endpoints when the caller gives none
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_catalog_ttl_secs() -> u64 {
    30 * 60
}

fn default_page_size() -> usize {
    100
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.catalog_url.is_none() && self.catalog_path.is_none() {
            anyhow::bail!("Either CATALOG_URL or CATALOG_PATH must be set");
        }
        if self.default_page_size == 0 {
            anyhow::bail!("DEFAULT_PAGE_SIZE must be greater than zero");
        }
        Ok(())
    }

    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_ttl_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
