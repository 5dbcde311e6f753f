//! Host collaborators the editor calls out to
//!
//! The kernel never draws, prompts or shows toasts itself. A browser host
//! implements these traits over the real canvas and toolbar; the in-memory
//! versions below back the CLI and tests.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use super::templates::{BuiltinTemplates, TemplateSource};
use crate::core::{DiagramSpec, Language, NodeIndex};
use crate::plugins::OperationRegistry;

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Warning,
    Error,
}

/// Toast/notification channel of the toolbar layer
pub trait NotificationSink: Send + Sync {
    fn notify(&self, message: &str, kind: NotificationKind);
}

/// Blocking yes/no question to the user
pub trait UserPrompt: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

/// Draws a spec and exposes what was drawn
pub trait Renderer: Send + Sync {
    fn render(&self, spec: &DiagramSpec) -> anyhow::Result<()>;

    /// Current rendered view, used to resolve node ids
    fn snapshot(&self) -> NodeIndex;
}

/// Sends notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, message: &str, kind: NotificationKind) {
        match kind {
            NotificationKind::Info => info!(message, "Notification"),
            NotificationKind::Warning | NotificationKind::Error => {
                warn!(message, ?kind, "Notification")
            }
        }
    }
}

/// Answers every prompt with a fixed value
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl UserPrompt for FixedAnswer {
    fn confirm(&self, message: &str) -> bool {
        debug!(message, answer = self.0, "Prompt answered");
        self.0
    }
}

/// Renders into a [`NodeIndex`] using the ids each plugin assigns
pub struct IndexRenderer {
    registry: OperationRegistry,
    index: RwLock<NodeIndex>,
}

impl IndexRenderer {
    pub fn new() -> Self {
        Self {
            registry: OperationRegistry::with_all_plugins(),
            index: RwLock::new(NodeIndex::new()),
        }
    }
}

impl Default for IndexRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for IndexRenderer {
    fn render(&self, spec: &DiagramSpec) -> anyhow::Result<()> {
        let module = self
            .registry
            .get(spec.diagram_type())
            .ok_or_else(|| anyhow::anyhow!("No renderer for {}", spec.diagram_type()))?;
        let index = module.node_index(spec);
        debug!(diagram_type = %spec.diagram_type(), nodes = index.len(), "Rendered");
        *self.index.write().unwrap_or_else(PoisonError::into_inner) = index;
        Ok(())
    }

    fn snapshot(&self) -> NodeIndex {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Everything the editor needs from its host
#[derive(Clone)]
pub struct Collaborators {
    pub renderer: Arc<dyn Renderer>,
    pub notifications: Arc<dyn NotificationSink>,
    pub prompt: Arc<dyn UserPrompt>,
    pub templates: Arc<dyn TemplateSource>,
    pub language: Language,
}

impl Collaborators {
    /// In-memory rendering, logged notifications, auto-confirm, builtin templates
    pub fn headless(language: Language) -> Self {
        Self {
            renderer: Arc::new(IndexRenderer::new()),
            notifications: Arc::new(TracingNotifier),
            prompt: Arc::new(FixedAnswer(true)),
            templates: Arc::new(BuiltinTemplates),
            language,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_notifications(mut self, notifications: Arc<dyn NotificationSink>) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn UserPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_templates(mut self, templates: Arc<dyn TemplateSource>) -> Self {
        self.templates = templates;
        self
    }

    /// Render and report failures to the user; returns false on failure
    pub fn render_or_notify(&self, spec: &DiagramSpec) -> bool {
        match self.renderer.render(spec) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, diagram_type = %spec.diagram_type(), "Render failed");
                self.notifications.notify(
                    self.language.pick("图表渲染失败", "Failed to render the diagram"),
                    NotificationKind::Error,
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DiagramType, RenderedDocument};
    use crate::editor::blank_template;

    #[test]
    fn test_index_renderer_tracks_last_render() {
        let renderer = IndexRenderer::new();
        assert!(renderer.snapshot().is_empty());
        renderer
            .render(&blank_template(DiagramType::BubbleMap, Language::En))
            .unwrap();
        let index = renderer.snapshot();
        assert_eq!(index.find_node("topic").unwrap().text(), "Main Topic");
        assert_eq!(index.find_node("attribute-4").unwrap().array_index, Some(4));
    }

    #[test]
    fn test_fixed_answer() {
        assert!(FixedAnswer(true).confirm("Reset?"));
        assert!(!FixedAnswer(false).confirm("Reset?"));
    }
}
