//! Completeness check over the rendered diagram
//!
//! Gates downstream actions (learning mode) until every rendered node has
//! text. Placeholder rejection is off unless
//! [`ValidatorConfig::reject_placeholders`] is set.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::placeholders::is_placeholder;
use crate::core::{Language, RenderedDocument, ValidatorConfig};

/// Node types that may legitimately be empty
const OPTIONAL_NODE_TYPES: [&str; 1] = ["dimension"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    Empty,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidNode {
    pub node_id: String,
    pub node_type: String,
    pub reason: InvalidReason,
    pub text: String,
}

/// Why the gate is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateReason {
    NoDiagram,
    EmptyNodes,
    PlaceholderNodes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramValidation {
    pub is_valid: bool,
    pub invalid_nodes: Vec<InvalidNode>,
    pub total_nodes: usize,
    pub reason: Option<GateReason>,
}

impl DiagramValidation {
    /// User-facing explanation; `None` when valid
    pub fn message(&self, language: Language) -> Option<String> {
        let reason = self.reason?;
        let count = self.invalid_nodes.len();
        Some(match (reason, language) {
            (GateReason::NoDiagram, Language::Zh) => "请先创建图示".to_string(),
            (GateReason::NoDiagram, Language::En) => "Please create a diagram first".to_string(),
            (GateReason::EmptyNodes, Language::Zh) => {
                format!("有 {} 个节点为空，请填写所有节点后再继续", count)
            }
            (GateReason::EmptyNodes, Language::En) => format!(
                "{} node{} empty. Please fill in every node before continuing",
                count,
                if count == 1 { " is" } else { "s are" }
            ),
            (GateReason::PlaceholderNodes, Language::Zh) => {
                format!("有 {} 个节点仍是模板文字，请替换为你自己的内容", count)
            }
            (GateReason::PlaceholderNodes, Language::En) => format!(
                "{} node{} still template text. Please replace it with your own content",
                count,
                if count == 1 { " is" } else { "s are" }
            ),
        })
    }

    /// Chinese and English explanation joined on one line
    pub fn bilingual_message(&self) -> Option<String> {
        Some(format!(
            "{} / {}",
            self.message(Language::Zh)?,
            self.message(Language::En)?
        ))
    }
}

/// A control enabled only while the diagram is complete
pub trait GatedControl {
    fn set_disabled(&mut self, disabled: bool);
}

#[derive(Debug, Clone, Default)]
pub struct DiagramValidator {
    reject_placeholders: bool,
}

impl DiagramValidator {
    pub fn new(config: &ValidatorConfig) -> Self {
        Self {
            reject_placeholders: config.reject_placeholders,
        }
    }

    pub fn rejects_placeholders(&self) -> bool {
        self.reject_placeholders
    }

    pub fn validate(&self, document: &dyn RenderedDocument) -> DiagramValidation {
        let nodes: Vec<_> = document
            .text_nodes()
            .into_iter()
            .filter(|n| !OPTIONAL_NODE_TYPES.contains(&n.node_type.as_str()))
            .collect();

        if nodes.is_empty() {
            debug!("No rendered nodes to validate");
            return DiagramValidation {
                is_valid: false,
                invalid_nodes: Vec::new(),
                total_nodes: 0,
                reason: Some(GateReason::NoDiagram),
            };
        }

        let total_nodes = nodes.len();
        let mut invalid_nodes = Vec::new();
        for node in nodes {
            let text = node.text();
            let reason = if text.is_empty() {
                Some(InvalidReason::Empty)
            } else if self.reject_placeholders && is_placeholder(&text) {
                Some(InvalidReason::Placeholder)
            } else {
                None
            };
            if let Some(reason) = reason {
                invalid_nodes.push(InvalidNode {
                    node_id: node.node_id,
                    node_type: node.node_type,
                    reason,
                    text,
                });
            }
        }

        let reason = if invalid_nodes.iter().any(|n| n.reason == InvalidReason::Empty) {
            Some(GateReason::EmptyNodes)
        } else if !invalid_nodes.is_empty() {
            Some(GateReason::PlaceholderNodes)
        } else {
            None
        };

        info!(
            total_nodes,
            invalid = invalid_nodes.len(),
            "Diagram completeness checked"
        );
        DiagramValidation {
            is_valid: invalid_nodes.is_empty(),
            invalid_nodes,
            total_nodes,
            reason,
        }
    }

    /// Validate and disable `control` while the diagram is incomplete
    pub fn validate_and_gate(
        &self,
        document: &dyn RenderedDocument,
        control: &mut dyn GatedControl,
    ) -> DiagramValidation {
        let result = self.validate(document);
        control.set_disabled(!result.is_valid);
        result
    }
}
