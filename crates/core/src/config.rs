use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `CAMPAIGN_PLANNER__` and an optional TOML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlannerConfig {
    /// Optional TOML/JSON file replacing the built-in allocation tables.
    #[serde(default)]
    pub tables_path: Option<String>,
    /// Flight length used when a campaign does not carry one.
    #[serde(default = "default_duration_days")]
    pub default_duration_days: u32,
    /// Plans kept in memory; the oldest is evicted past this.
    #[serde(default = "default_max_stored_plans")]
    pub max_stored_plans: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    #[serde(default = "default_scraper_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Postgres backing the `users` table. Without a URL users stay in memory.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

// Default functions
fn default_node_id() -> String {
    "planner-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_duration_days() -> u32 {
    30
}
fn default_max_stored_plans() -> usize {
    1000
}
fn default_db_max_connections() -> u32 {
    5
}
fn default_db_acquire_timeout_secs() -> u64 {
    5
}
fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    60
}
fn default_llm_temperature() -> f32 {
    0.7
}
fn default_scraper_timeout_secs() -> u64 {
    15
}
fn default_max_content_chars() -> usize {
    8000
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; CampaignPlanner/0.1)".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            tables_path: None,
            default_duration_days: default_duration_days(),
            max_stored_plans: default_max_stored_plans(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key: None,
            timeout_secs: default_llm_timeout_secs(),
            temperature: default_llm_temperature(),
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_scraper_timeout_secs(),
            max_content_chars: default_max_content_chars(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_db_max_connections(),
            acquire_timeout_secs: default_db_acquire_timeout_secs(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            planner: PlannerConfig::default(),
            llm: LlmConfig::default(),
            scraper: ScraperConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional config file, then environment
    /// variables (which win).
    pub fn load(file: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("CAMPAIGN_PLANNER")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(","),
            )
            .build()?;
        config.try_deserialize()
    }
}
