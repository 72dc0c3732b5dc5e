//! Scoring providers for ranking snapshots.
//!
//! A [`ScoreProvider`] turns a [`hnrank_core::RankingSnapshot`] into an
//! [`hnrank_core::Insight`]. The rescore scheduler only sees the trait; which
//! backend sits behind it is decided once at startup by [`build_provider`].

pub mod error;
pub mod lexicon;
pub mod mock;
pub mod openai;
pub mod provider;

mod retry;

use std::sync::Arc;

use hnrank_core::{AppConfig, ProviderKind};

pub use error::ScoringError;
pub use lexicon::{lexicon_score, LexiconProvider};
pub use mock::MockProvider;
pub use openai::OpenAiProvider;
pub use provider::{DisabledProvider, DynScoreProvider, ScoreProvider};

/// Settings needed to construct any provider.
#[derive(Clone)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl ProviderSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            kind: config.score_provider,
            openai_api_key: config.openai_api_key.clone(),
            openai_model: config.openai_model.clone(),
            openai_base_url: config.openai_base_url.clone(),
            timeout_secs: config.provider_timeout_secs,
            max_retries: config.provider_max_retries,
        }
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("kind", &self.kind)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("openai_model", &self.openai_model)
            .field("openai_base_url", &self.openai_base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Build the configured provider.
///
/// An `openai` provider without an API key is still built; it reports itself
/// unavailable so every rescore cycle skips it until a key is configured.
///
/// # Errors
///
/// Returns [`ScoringError`] if the HTTP client or base URL is invalid.
pub fn build_provider(settings: &ProviderSettings) -> Result<DynScoreProvider, ScoringError> {
    let provider: DynScoreProvider = match settings.kind {
        ProviderKind::Lexicon => Arc::new(LexiconProvider::new()),
        ProviderKind::Disabled => Arc::new(DisabledProvider),
        ProviderKind::OpenAi => {
            if settings.openai_api_key.is_none() {
                tracing::warn!("OPENAI_API_KEY not set; openai score provider will be unavailable");
            }
            let provider = OpenAiProvider::with_base_url(
                settings.openai_api_key.as_deref(),
                &settings.openai_model,
                settings.timeout_secs,
                &settings.openai_base_url,
            )?
            .with_retry(settings.max_retries, openai::DEFAULT_BACKOFF_BASE_MS);
            Arc::new(provider)
        }
    };

    tracing::info!(
        provider = provider.name(),
        available = provider.is_available(),
        "score provider ready"
    );
    Ok(provider)
}
