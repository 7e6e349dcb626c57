/// All configuration loaded from environment variables at startup.
/// Every knob has a default so a bare `quantd` starts out of the box; the
/// LLM key is optional and gates only the insight endpoint.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,

    // Market data
    pub market_data_base_url: String,
    /// Per-request deadline for provider calls, in seconds.
    pub provider_timeout_secs: u64,

    // LLM insight
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        Config {
            port: optional_env("QUANTD_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            market_data_base_url: optional_env("MARKET_DATA_BASE_URL")
                .unwrap_or_else(|| "https://query1.finance.yahoo.com".to_string()),
            provider_timeout_secs: optional_env("PROVIDER_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            llm_api_key: optional_env("LLM_API_KEY"),
            llm_base_url: optional_env("LLM_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            llm_model: optional_env("LLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
