use std::net::SocketAddr;

/// Longest accepted rescore interval: one year.
pub const MAX_RESCORE_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Which scoring backend the process wires into the rescore scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Local title-lexicon + recency heuristic. Always available.
    Lexicon,
    /// Chat-completions HTTP API. Available only with an API key.
    OpenAi,
    /// Never available; every cycle skips its candidates.
    Disabled,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Lexicon => write!(f, "lexicon"),
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Disabled => write!(f, "disabled"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexicon" => Ok(ProviderKind::Lexicon),
            "openai" => Ok(ProviderKind::OpenAi),
            "disabled" | "none" => Ok(ProviderKind::Disabled),
            other => Err(format!("unknown score provider \"{other}\"")),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub history_capacity: usize,
    pub rescore_interval_secs: u64,
    pub rescore_max_concurrent_jobs: usize,
    pub insight_stale_after_secs: u64,
    pub rescore_run_on_start: bool,
    pub score_provider: ProviderKind,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub provider_timeout_secs: u64,
    pub provider_max_retries: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("history_capacity", &self.history_capacity)
            .field("rescore_interval_secs", &self.rescore_interval_secs)
            .field(
                "rescore_max_concurrent_jobs",
                &self.rescore_max_concurrent_jobs,
            )
            .field("insight_stale_after_secs", &self.insight_stale_after_secs)
            .field("rescore_run_on_start", &self.rescore_run_on_start)
            .field("score_provider", &self.score_provider)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("openai_model", &self.openai_model)
            .field("openai_base_url", &self.openai_base_url)
            .field("provider_timeout_secs", &self.provider_timeout_secs)
            .field("provider_max_retries", &self.provider_max_retries)
            .finish()
    }
}
