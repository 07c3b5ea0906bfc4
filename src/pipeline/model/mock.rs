use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use super::types::{ApiKey, CallKind, GenerationRequest, ModelClient, ModelProvider};
use super::ModelError;

/// Scripted model client for testing.
///
/// Responses are queued per `CallKind` because report calls run
/// concurrently and arrive in no fixed order. When a queue is empty the
/// fallback is returned.
pub struct MockModelClient {
    scripted: Mutex<HashMap<CallKind, VecDeque<Result<String, ModelError>>>>,
    fallback: Result<String, ModelError>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockModelClient {
    /// Client that answers every call with `response`.
    pub fn new(response: &str) -> Self {
        Self {
            scripted: Mutex::new(HashMap::new()),
            fallback: Ok(response.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Client that fails every unscripted call with `error`.
    pub fn failing(error: ModelError) -> Self {
        Self {
            scripted: Mutex::new(HashMap::new()),
            fallback: Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response for one call of `kind`.
    pub fn with_response(self, kind: CallKind, response: &str) -> Self {
        self.push(kind, Ok(response.to_string()));
        self
    }

    /// Queue a failure for one call of `kind`.
    pub fn with_error(self, kind: CallKind, error: ModelError) -> Self {
        self.push(kind, Err(error));
        self
    }

    fn push(&self, kind: CallKind, outcome: Result<String, ModelError>) {
        if let Ok(mut scripted) = self.scripted.lock() {
            scripted.entry(kind).or_default().push_back(outcome);
        }
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn calls_of(&self, kind: CallKind) -> usize {
        self.requests
            .lock()
            .map(|r| r.iter().filter(|req| req.kind == kind).count())
            .unwrap_or(0)
    }

    fn next_outcome(&self, kind: CallKind) -> Result<String, ModelError> {
        let queued = self
            .scripted
            .lock()
            .ok()
            .and_then(|mut scripted| scripted.get_mut(&kind).and_then(|q| q.pop_front()));
        queued.unwrap_or_else(|| self.fallback.clone())
    }
}

impl ModelClient for MockModelClient {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<String, ModelError>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let outcome = self.next_outcome(request.kind);
        async move {
            // Yield so concurrent callers interleave.
            tokio::task::yield_now().await;
            outcome
        }
        .boxed()
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Provider handing out one shared `MockModelClient`.
///
/// Only `valid_key` is accepted when set; any other key yields
/// `InvalidApiKey` from the provider itself.
pub struct MockModelProvider {
    client: Arc<MockModelClient>,
    valid_key: Option<String>,
}

impl MockModelProvider {
    pub fn new(client: MockModelClient) -> Self {
        Self {
            client: Arc::new(client),
            valid_key: None,
        }
    }

    pub fn accepting_only(mut self, key: &str) -> Self {
        self.valid_key = Some(key.to_string());
        self
    }

    /// The shared client, for inspecting recorded requests.
    pub fn mock(&self) -> Arc<MockModelClient> {
        Arc::clone(&self.client)
    }
}

impl ModelProvider for MockModelProvider {
    fn client(&self, api_key: Option<&ApiKey>) -> Result<Arc<dyn ModelClient>, ModelError> {
        let key = api_key.ok_or(ModelError::MissingApiKey)?;
        if let Some(valid) = &self.valid_key {
            if key.expose() != valid {
                return Ok(Arc::new(MockModelClient::failing(ModelError::InvalidApiKey)));
            }
        }
        let client: Arc<dyn ModelClient> = self.client.clone();
        Ok(client)
    }
}
