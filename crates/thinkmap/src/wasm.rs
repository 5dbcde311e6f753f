//! WebAssembly bindings
//!
//! JSON in, JSON out. Failures come back as a JavaScript error carrying the
//! kernel's error message.

use serde_json::Value;
use wasm_bindgen::prelude::*;

use crate::core::{parse_model_list, DiagramType, EngineConfig, KernelConfig, Language};
use crate::editor::blank_template;
use crate::llm::{GenerationRequest, HttpTransport, LlmEngineManager, NoopObserver};
use crate::validation::{analyze_consistency, validate_properties, ModelSpec};

/// Initialize WASM module
///
/// Sets up panic hooks and logging for better error messages in the browser.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    use crate::core::logging::init_logging;
    let _ = init_logging(Some("info"), None);
}

fn js_error(message: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&message.to_string())
}

fn parse_json(input: &str) -> Result<Value, JsValue> {
    serde_json::from_str(input).map_err(|e| js_error(format!("Invalid JSON: {}", e)))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(js_error)
}

/// Property-validate a spec; returns the validation report as JSON
#[wasm_bindgen]
pub fn validate_spec_json(diagram_type: &str, spec: &str) -> Result<String, JsValue> {
    let spec = parse_json(spec)?;
    to_json(&validate_properties(diagram_type, &spec))
}

/// Blank template for a diagram type in `zh` or `en`
#[wasm_bindgen]
pub fn blank_template_json(diagram_type: &str, language: &str) -> Result<String, JsValue> {
    let diagram_type: DiagramType = diagram_type.parse().map_err(js_error)?;
    let language: Language = language.parse().map_err(js_error)?;
    to_json(&blank_template(diagram_type, language))
}

/// Compare results keyed by model name: `{ "qwen": { "diagram_type", "spec" }, ... }`
#[wasm_bindgen]
pub fn analyze_consistency_json(results: &str) -> Result<String, JsValue> {
    let results = parse_json(results)?;
    let Value::Object(results) = results else {
        return Err(js_error("Expected an object keyed by model name"));
    };

    let entries: Vec<(String, Option<String>, Value)> = results
        .into_iter()
        .map(|(model, entry)| {
            let diagram_type = entry
                .get("diagram_type")
                .and_then(Value::as_str)
                .map(DiagramType::normalize_name);
            let spec = entry.get("spec").cloned().unwrap_or(Value::Null);
            (model, diagram_type, spec)
        })
        .collect();
    let validations: Vec<_> = entries
        .iter()
        .map(|(_, diagram_type, spec)| {
            diagram_type
                .as_deref()
                .map(|diagram_type| validate_properties(diagram_type, spec))
        })
        .collect();
    let specs: Vec<ModelSpec<'_>> = entries
        .iter()
        .zip(&validations)
        .map(|((model, diagram_type, spec), validation)| ModelSpec {
            model,
            diagram_type: diagram_type.as_deref(),
            spec,
            validation: validation.as_ref(),
        })
        .collect();
    to_json(&analyze_consistency(&specs))
}

/// Fan a prompt out to several models and resolve with the report as JSON
///
/// `models` is comma-separated; empty uses the configured defaults.
/// `base_url` resolves the endpoint path (normally `window.location.origin`).
#[wasm_bindgen]
pub async fn generate_graphs(
    prompt: String,
    diagram_type: String,
    language: String,
    models: String,
    base_url: String,
) -> Result<String, JsValue> {
    let config = KernelConfig::default();
    let engine_config: EngineConfig = config.engine;
    let transport = HttpTransport::new(&engine_config, Some(&base_url)).map_err(js_error)?;

    let diagram_type: DiagramType = diagram_type.parse().map_err(js_error)?;
    let request = GenerationRequest::new(prompt)
        .with_diagram_type(diagram_type)
        .with_language(language);

    let mut models = parse_model_list(&models);
    if models.is_empty() {
        models = engine_config.models.clone();
    }

    let engine = LlmEngineManager::new(transport, &config.cache);
    let report = engine.generate(&models, &request, &NoopObserver).await;
    to_json(&report)
}
