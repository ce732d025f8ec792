use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::config::Config;
use crate::llm_client::TextGenerator;
use crate::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Every LLM call goes through this. `GeminiClient` in production.
    pub llm: Arc<dyn TextGenerator>,
    pub sessions: SessionStore,
    /// Caps in-flight evaluation calls across all requests.
    /// Sized by `MAX_CONCURRENT_EVALUATIONS`.
    pub evaluation_permits: Arc<Semaphore>,
}

impl AppState {
    pub fn new(llm: Arc<dyn TextGenerator>, config: &Config) -> Self {
        Self {
            llm,
            sessions: SessionStore::new(),
            evaluation_permits: Arc::new(Semaphore::new(config.max_concurrent_evaluations)),
        }
    }

    #[cfg(test)]
    pub fn for_tests(llm: Arc<dyn TextGenerator>) -> Self {
        let config = Config {
            gemini_api_key: "test-key".to_string(),
            gemini_api_url: crate::config::DEFAULT_GEMINI_API_URL.to_string(),
            llm_timeout_secs: 5,
            max_concurrent_evaluations: 2,
            session_ttl_secs: 0,
            port: 0,
            rust_log: "debug".to_string(),
        };
        Self::new(llm, &config)
    }
}
