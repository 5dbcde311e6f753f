//! Integration tests for tracing spans and events
//!
//! These tests verify that the editing pipeline runs under an active
//! subscriber and that instrumented paths still produce their results.
//! Captured output pins the level of reported failures.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use thinkmap::core::logging::init_logging;
use thinkmap::editor::DiagramEditor;
use thinkmap::llm::{GenerationTransport, NoopObserver, TransportResponse};
use thinkmap::prelude::*;
use thinkmap::{parse_spec, validate_properties, CacheConfig};
use tracing_subscriber::util::SubscriberInitExt;

#[test]
fn test_tracing_spans_created_during_edit() {
    let _guard = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .set_default();

    let editor = DiagramEditor::headless(EventBus::new());
    editor.select_diagram_type(DiagramType::FlowMap);
    editor.add_node().unwrap();

    let status = editor.history().status();
    assert_eq!(status.history_size, 2);
    assert!(status.can_undo);
}

#[test]
fn test_validation_with_tracing() {
    let _ = init_logging(Some("debug"), Some("compact"));

    let report = validate_properties("mind_map", &json!({ "topic": "T", "children": [] }));
    assert!(!report.is_valid);
    assert_eq!(report.issues, vec!["'children' is empty"]);
}

#[test]
fn test_undo_with_tracing() {
    let _ = init_logging(Some("debug"), Some("compact"));

    let editor = DiagramEditor::headless(EventBus::new());
    editor.select_diagram_type(DiagramType::CircleMap);
    editor.add_node().unwrap();
    editor.undo();

    let status = editor.history().status();
    assert_eq!(status.history_index, Some(0));
    assert!(status.can_redo);
}

/// Shared buffer the fmt layer writes into
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture(level: tracing::Level) -> (Captured, tracing::subscriber::DefaultGuard) {
    let captured = Captured::default();
    let writer = captured.clone();
    let guard = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(level)
        .set_default();
    (captured, guard)
}

struct OfflineTransport;

impl GenerationTransport for OfflineTransport {
    async fn post_generate(&self, _body: Value) -> Result<TransportResponse, EditorError> {
        Err(EditorError::transport("connection refused", true))
    }
}

#[tokio::test]
async fn test_transport_failure_logged_as_error() {
    let (captured, _guard) = capture(tracing::Level::INFO);
    let engine = LlmEngineManager::new(OfflineTransport, &CacheConfig::default());
    let request = GenerationRequest::new("water").with_diagram_type(DiagramType::BubbleMap);

    let outcome = engine.call_llm_with_model("qwen", &request, &NoopObserver).await;

    assert!(!outcome.success);
    let logs = captured.text();
    let line = logs
        .lines()
        .find(|line| line.contains("Model call failed"))
        .expect("failure is logged");
    assert!(line.contains("ERROR"), "{}", line);
    assert!(line.contains("is_network=true"), "{}", line);
    assert!(line.contains("is_auth=false"), "{}", line);
}

#[test]
fn test_undeletable_bridge_node_logged_as_warning() {
    let (captured, _guard) = capture(tracing::Level::WARN);
    let registry = OperationRegistry::with_all_plugins();
    let module = registry.get(DiagramType::BridgeMap).unwrap();
    let bus = EventBus::new();
    let mut spec = parse_spec(
        "bridge_map",
        json!({ "dimension": "lives in", "analogies": [{ "left": "Bird", "right": "Nest" }] }),
    )
    .unwrap();
    let view = module.node_index(&spec);
    let ctx = OperationContext::new(&bus, &view, Language::En);

    let outcome = module.delete_nodes(&mut spec, &["dimension".to_string()], &ctx);

    assert_eq!(outcome, OperationOutcome::NoOp);
    let logs = captured.text();
    assert!(logs.contains("WARN"), "{}", logs);
    assert!(logs.contains("Node type is not deletable"), "{}", logs);
}
