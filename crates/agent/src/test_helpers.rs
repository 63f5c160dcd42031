//! Shared test helpers for agent and pipeline tests.

use std::sync::Mutex;

use agora_core::error::ProviderError;
use agora_core::message::{Message, Role};
use agora_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue.
/// Panics if more calls are made than responses provided.
pub struct ScriptedProvider {
    responses: Vec<String>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: responses.into_iter().map(String::from).collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The user prompt of every request so far.
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.messages.iter().find(|m| m.role == Role::User))
            .map(|m| m.content.clone())
            .collect()
    }

    /// The system message of every request so far.
    pub fn systems(&self) -> Vec<Option<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| {
                r.messages
                    .iter()
                    .find(|m| m.role == Role::System)
                    .map(|m| m.content.clone())
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let call = requests.len();
        if call >= self.responses.len() {
            panic!(
                "ScriptedProvider: no more responses (call #{}, have {})",
                call,
                self.responses.len()
            );
        }
        requests.push(request);
        Ok(make_text_response(&self.responses[call]))
    }
}

/// Answers by the first rule whose needle appears in the prompt.
///
/// Prompts matching no rule get `default`.
pub struct RoutedProvider {
    rules: Vec<(String, String)>,
    default: String,
    calls: Mutex<usize>,
}

impl RoutedProvider {
    pub fn new(rules: Vec<(&str, &str)>, default: &str) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|(needle, reply)| (needle.to_string(), reply.to_string()))
                .collect(),
            default: default.to_string(),
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl Provider for RoutedProvider {
    fn name(&self) -> &str {
        "routed"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        *self.calls.lock().unwrap() += 1;
        let prompt = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.as_str())
            .unwrap_or(&self.default);
        Ok(make_text_response(reply))
    }
}

/// A provider whose every call fails.
pub struct FailingProvider;

#[async_trait::async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}
