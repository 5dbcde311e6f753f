//! Cancellable multi-model fan-out
//!
//! Every call gets a [`CancelToken`] registered in the active set;
//! [`LlmEngineManager::cancel_all_requests`] fires them all. A cancelled call
//! resolves to an outcome with [`EditorError::Cancelled`] and is only logged at
//! debug level.

use std::collections::{BTreeMap, HashMap};
use std::pin::pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures_util::future::{join_all, select, Either};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, error, info, span, warn, Instrument, Level};

use super::cache::LlmResultCache;
use super::cancel::CancelToken;
use super::transport::GenerationTransport;
use crate::core::clock::now_ms;
use crate::core::{CacheConfig, DiagramType, EditorError, EditorEvent, EventBus};
use crate::validation::{
    analyze_consistency, validate_properties, ConsistencyReport, ModelSpec, PropertyValidation,
};

/// Logged instead of an error when a call is cancelled
pub const CANCEL_REASON: &str = "User navigation or explicit cancellation";

/// Request forwarded to the endpoint; unknown fields pass through
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenerationRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_diagram_type(mut self, diagram_type: DiagramType) -> Self {
        self.diagram_type = Some(diagram_type.as_str().to_string());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Wire body: the request plus `llm: <model>`
    pub fn body_for(&self, model: &str) -> Value {
        let mut body = match serde_json::to_value(self) {
            Ok(Value::Object(object)) => object,
            _ => Map::new(),
        };
        body.insert("llm".to_string(), Value::String(model.to_string()));
        Value::Object(body)
    }
}

/// Response envelope of the endpoint
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
struct GenerationEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    spec: Option<Value>,
    #[serde(default)]
    diagram_type: Option<String>,
    #[serde(default)]
    topics: Option<Value>,
    #[serde(default)]
    style_preferences: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// A successful model's payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    pub spec: Value,
    /// Normalised: `mind_map` arrives as `mindmap`
    pub diagram_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_preferences: Option<Value>,
}

fn error_message<S: Serializer>(
    error: &Option<EditorError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Settled state of one model call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelOutcome {
    pub model: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<GenerationResult>,
    #[serde(serialize_with = "error_message", skip_serializing_if = "Option::is_none")]
    pub error: Option<EditorError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<PropertyValidation>,
    /// Seconds
    pub elapsed: f64,
}

impl ModelOutcome {
    pub fn succeeded(
        model: &str,
        result: GenerationResult,
        validation: Option<PropertyValidation>,
        elapsed: f64,
    ) -> Self {
        Self {
            model: model.to_string(),
            success: true,
            result: Some(result),
            error: None,
            validation,
            elapsed,
        }
    }

    pub fn failed(model: &str, error: EditorError, elapsed: f64) -> Self {
        Self {
            model: model.to_string(),
            success: false,
            result: None,
            error: Some(error),
            validation: None,
            elapsed,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.error.as_ref().is_some_and(EditorError::is_cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressState {
    Started,
    Succeeded,
    Failed,
    Cancelled,
}

/// Per-call callbacks; every method defaults to doing nothing
pub trait GenerationObserver {
    fn on_success(&self, _outcome: &ModelOutcome) {}
    fn on_error(&self, _outcome: &ModelOutcome) {}
    fn on_progress(&self, _state: ProgressState, _model: &str) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl GenerationObserver for NoopObserver {}

/// Everything a fan-out produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport {
    pub outcomes: BTreeMap<String, ModelOutcome>,
    /// Present when at least two models succeeded
    pub consistency: Option<ConsistencyReport>,
}

impl GenerationReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.values().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Drives model calls through a [`GenerationTransport`]
pub struct LlmEngineManager<T> {
    transport: T,
    active: Mutex<HashMap<u64, CancelToken>>,
    next_id: AtomicU64,
    cache: Mutex<LlmResultCache>,
    bus: Option<EventBus>,
}

impl<T: GenerationTransport> LlmEngineManager<T> {
    pub fn new(transport: T, cache: &CacheConfig) -> Self {
        Self {
            transport,
            active: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            cache: Mutex::new(LlmResultCache::new(cache)),
            bus: None,
        }
    }

    /// Publish `llm:*` events on `bus`
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Locked access to the result cache
    pub fn cache(&self) -> MutexGuard<'_, LlmResultCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn active(&self) -> MutexGuard<'_, HashMap<u64, CancelToken>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn active_request_count(&self) -> usize {
        self.active().len()
    }

    /// Fire every active token; returns how many were fired
    pub fn cancel_all_requests(&self) -> usize {
        let tokens: Vec<CancelToken> = self.active().drain().map(|(_, t)| t).collect();
        for token in &tokens {
            token.cancel();
        }
        if !tokens.is_empty() {
            info!(count = tokens.len(), "Cancelled active LLM requests");
        }
        tokens.len()
    }

    /// Call one model; never fails, the outcome carries any error
    pub async fn call_llm_with_model(
        &self,
        model: &str,
        request: &GenerationRequest,
        observer: &dyn GenerationObserver,
    ) -> ModelOutcome {
        let token = CancelToken::new();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.active().insert(id, token.clone());

        observer.on_progress(ProgressState::Started, model);
        let started = now_ms();

        let call_span = span!(Level::INFO, "llm_call", model);
        let fetch = pin!(self.fetch(model, request).instrument(call_span));
        let cancelled = pin!(token.cancelled());
        let mut result = match select(fetch, cancelled).await {
            Either::Left((result, _)) => result,
            Either::Right(_) => Err(EditorError::Cancelled),
        };
        // A reply that lands after the cancel still counts as cancelled
        if token.is_cancelled() {
            result = Err(EditorError::Cancelled);
        }

        self.active().remove(&id);
        let elapsed = now_ms().saturating_sub(started) as f64 / 1000.0;

        match result {
            Ok((result, validation)) => {
                info!(model, elapsed, "Model call succeeded");
                let outcome = ModelOutcome::succeeded(model, result, validation, elapsed);
                observer.on_progress(ProgressState::Succeeded, model);
                observer.on_success(&outcome);
                outcome
            }
            Err(error) if error.is_cancelled() => {
                debug!(model, reason = CANCEL_REASON, "Model call cancelled");
                let outcome = ModelOutcome::failed(model, error, elapsed);
                observer.on_progress(ProgressState::Cancelled, model);
                observer.on_error(&outcome);
                outcome
            }
            Err(error) => {
                if matches!(error, EditorError::Transport { .. } | EditorError::HttpStatus { .. }) {
                    error!(
                        model,
                        elapsed,
                        is_auth = error.is_auth(),
                        is_network = error.is_network(),
                        error = %error,
                        "Model call failed"
                    );
                } else {
                    warn!(model, elapsed, error = %error, "Model call failed");
                }
                let outcome = ModelOutcome::failed(model, error, elapsed);
                observer.on_progress(ProgressState::Failed, model);
                observer.on_error(&outcome);
                outcome
            }
        }
    }

    async fn fetch(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<(GenerationResult, Option<PropertyValidation>), EditorError> {
        let response = self.transport.post_generate(request.body_for(model)).await?;
        if !response.is_success() {
            return Err(EditorError::http_status(response.status));
        }

        let envelope: GenerationEnvelope = serde_json::from_str(&response.body).map_err(|e| {
            EditorError::malformed_response(format!("invalid JSON envelope: {}", e))
        })?;
        if !envelope.success {
            return Err(EditorError::generation_failed(
                envelope
                    .error
                    .unwrap_or_else(|| "generation was not successful".to_string()),
            ));
        }
        let spec = envelope
            .spec
            .ok_or_else(|| EditorError::malformed_response("success envelope without spec"))?;

        let diagram_type = envelope
            .diagram_type
            .or_else(|| request.diagram_type.clone())
            .map(|t| DiagramType::normalize_name(&t));
        let validation = diagram_type.as_deref().map(|t| validate_properties(t, &spec));
        if let Some(v) = validation.as_ref().filter(|v| !v.is_valid) {
            debug!(model, problems = ?v.problems(), "Generated spec failed property validation");
        }

        Ok((
            GenerationResult {
                spec,
                diagram_type,
                topics: envelope.topics,
                style_preferences: envelope.style_preferences,
            },
            validation,
        ))
    }

    /// Call every model concurrently and collect outcomes by model name
    pub async fn call_multiple_models(
        &self,
        models: &[String],
        request: &GenerationRequest,
        observer: &dyn GenerationObserver,
    ) -> BTreeMap<String, ModelOutcome> {
        let mut unique: Vec<&String> = Vec::new();
        for model in models {
            if !unique.contains(&model) {
                unique.push(model);
            }
        }
        info!(models = ?unique, "Starting multi-model generation");

        let calls = unique
            .iter()
            .map(|model| self.call_llm_with_model(model, request, observer));
        join_all(calls)
            .await
            .into_iter()
            .map(|outcome| (outcome.model.clone(), outcome))
            .collect()
    }

    /// Fan out, cache successes, compare results and publish `llm:*` events
    pub async fn generate(
        &self,
        models: &[String],
        request: &GenerationRequest,
        observer: &dyn GenerationObserver,
    ) -> GenerationReport {
        let outcomes = self.call_multiple_models(models, request, observer).await;

        {
            let mut cache = self.cache();
            for outcome in outcomes.values().filter(|o| o.success) {
                cache.store(&outcome.model, outcome.clone());
            }
        }

        let successful: Vec<ModelSpec<'_>> = outcomes
            .values()
            .filter_map(|o| {
                let result = o.result.as_ref()?;
                Some(ModelSpec {
                    model: &o.model,
                    diagram_type: result.diagram_type.as_deref(),
                    spec: &result.spec,
                    validation: o.validation.as_ref(),
                })
            })
            .collect();
        let consistency = (successful.len() >= 2).then(|| analyze_consistency(&successful));
        drop(successful);

        let report = GenerationReport {
            consistency,
            outcomes,
        };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Multi-model generation finished"
        );

        if let Some(bus) = &self.bus {
            if let Some(consistency) = &report.consistency {
                bus.emit(EditorEvent::ConsistencyReport(consistency.clone()));
            }
            bus.emit(EditorEvent::GenerationCompleted {
                models: report.outcomes.keys().cloned().collect(),
                succeeded: report.succeeded(),
                failed: report.failed(),
            });
        }
        report
    }
}
