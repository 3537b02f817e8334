use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// REST backend base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Bearer token attached to backend calls
    #[serde(default)]
    pub api_token: Option<String>,

    /// Maximum number of items requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Load more once this many items (or fewer) remain below the current one
    #[serde(default = "default_load_more_threshold")]
    pub load_more_threshold: usize,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Genres applied to the feed walker's filters, comma separated
    #[serde(default)]
    pub genres: Vec<String>,

    /// Number of items the feed walker scrolls through before exiting
    #[serde(default = "default_walk_limit")]
    pub walk_limit: usize,
}

fn default_api_base_url() -> String {
    "http://localhost:8443".to_string()
}

fn default_page_size() -> usize {
    10
}

fn default_load_more_threshold() -> usize {
    4
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_walk_limit() -> usize {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_token: None,
            page_size: default_page_size(),
            load_more_threshold: default_load_more_threshold(),
            request_timeout_secs: default_request_timeout_secs(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            genres: Vec::new(),
            walk_limit: default_walk_limit(),
        }
    }
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

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.page_size == 0 {
            anyhow::bail!("PAGE_SIZE must be greater than zero");
        }
        if self.retry_max_attempts == 0 {
            anyhow::bail!("RETRY_MAX_ATTEMPTS must be greater than zero");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.retry_base_delay_ms)
    }
}
