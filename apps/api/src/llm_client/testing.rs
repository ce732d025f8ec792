//! Test doubles for `TextGenerator`.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{LlmError, TextGenerator};

/// Replies with the same text to every prompt and records what it was asked.
pub struct CannedGenerator {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl CannedGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Fails every call as the remote service would on a 503.
pub struct FailingGenerator;

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::Api {
            status: 503,
            message: "service unavailable".to_string(),
        })
    }
}

/// Picks a reply by the first marker found in the prompt; fails when none matches.
pub struct RoutedGenerator {
    routes: Vec<(String, String)>,
}

impl RoutedGenerator {
    pub fn new(routes: &[(&str, &str)]) -> Self {
        Self {
            routes: routes
                .iter()
                .map(|(marker, reply)| (marker.to_string(), reply.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl TextGenerator for RoutedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.routes
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map(|(_, reply)| reply.clone())
            .ok_or(LlmError::MalformedResponse)
    }
}
