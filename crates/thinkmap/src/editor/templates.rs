//! Blank diagram templates
//!
//! Every fresh diagram starts from a localised skeleton whose texts are all
//! recognised by the placeholder catalogue, so the validator can tell an
//! untouched template from learner content.

use serde_json::Value;

use crate::core::{
    Analogy, BraceMapSpec, BridgeMapSpec, BubbleMapSpec, CircleMapSpec, ConceptMapSpec,
    ConceptNode, Connection, DiagramSpec, DiagramType, DoubleBubbleMapSpec, FlowMapSpec, Language,
    MindMapSpec, MindNode, MultiFlowMapSpec, Part, SpecBody, TreeMapSpec, TreeNode,
};

/// Source of blank specs for the diagram selector and reset
pub trait TemplateSource: Send + Sync {
    fn blank(&self, diagram_type: DiagramType, language: Language) -> DiagramSpec;
}

/// Templates shipped with the kernel
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplates;

impl TemplateSource for BuiltinTemplates {
    fn blank(&self, diagram_type: DiagramType, language: Language) -> DiagramSpec {
        blank_template(diagram_type, language)
    }
}

fn numbered(zh: &str, en: &str, language: Language, count: usize) -> Vec<String> {
    (1..=count)
        .map(|i| match language {
            Language::Zh => format!("{}{}", zh, i),
            Language::En => format!("{} {}", en, i),
        })
        .collect()
}

fn child_label(language: Language, parent: usize, child: usize) -> String {
    match language {
        Language::Zh => format!("子项{}.{}", parent, child),
        Language::En => format!("Sub-item {}.{}", parent, child),
    }
}

fn main_topic(language: Language) -> String {
    language.pick("主题", "Main Topic").to_string()
}

/// Localised blank spec for `diagram_type`
pub fn blank_template(diagram_type: DiagramType, language: Language) -> DiagramSpec {
    let body = match diagram_type {
        DiagramType::BubbleMap => SpecBody::BubbleMap(BubbleMapSpec {
            topic: main_topic(language),
            attributes: numbered("属性", "Attribute", language, 5),
            ..Default::default()
        }),
        DiagramType::CircleMap => SpecBody::CircleMap(CircleMapSpec {
            topic: main_topic(language),
            context: numbered("联想", "Context", language, 6),
            ..Default::default()
        }),
        DiagramType::MindMap => SpecBody::MindMap(MindMapSpec {
            topic: main_topic(language),
            children: numbered("分支", "Branch", language, 4)
                .into_iter()
                .enumerate()
                .map(|(i, label)| MindNode {
                    id: Some(format!("branch_{}", i)),
                    label,
                    children: (1..=2)
                        .map(|c| MindNode {
                            id: Some(format!("sub_{}_{}", i, c - 1)),
                            label: child_label(language, i + 1, c),
                            children: Vec::new(),
                        })
                        .collect(),
                })
                .collect(),
            ..Default::default()
        }),
        DiagramType::TreeMap => SpecBody::TreeMap(TreeMapSpec {
            topic: main_topic(language),
            children: numbered("类别", "Category", language, 4)
                .into_iter()
                .enumerate()
                .map(|(i, text)| TreeNode {
                    id: Some(format!("category_{}", i)),
                    text,
                    children: (1..=3)
                        .map(|c| TreeNode {
                            id: Some(format!("leaf_{}_{}", i, c - 1)),
                            text: child_label(language, i + 1, c),
                            children: Vec::new(),
                        })
                        .collect(),
                })
                .collect(),
            ..Default::default()
        }),
        DiagramType::BraceMap => SpecBody::BraceMap(BraceMapSpec {
            whole: main_topic(language),
            parts: numbered("部分", "Part", language, 3)
                .into_iter()
                .enumerate()
                .map(|(i, name)| Part {
                    name,
                    subparts: (1..=2)
                        .map(|c| Part {
                            name: child_label(language, i + 1, c),
                            subparts: Vec::new(),
                        })
                        .collect(),
                })
                .collect(),
            ..Default::default()
        }),
        DiagramType::BridgeMap => {
            let (left, right) = match language {
                Language::Zh => ("新事物A", "新事物B"),
                Language::En => ("New Item A", "New Item B"),
            };
            let mut spec = BridgeMapSpec {
                analogies: (0..3)
                    .map(|_| Analogy {
                        left: left.to_string(),
                        right: right.to_string(),
                    })
                    .collect(),
                ..Default::default()
            };
            spec.extra
                .insert("dimension".to_string(), Value::String(String::new()));
            SpecBody::BridgeMap(spec)
        }
        DiagramType::DoubleBubbleMap => SpecBody::DoubleBubbleMap(DoubleBubbleMapSpec {
            left: language.pick("主题A", "Topic A").to_string(),
            right: language.pick("主题B", "Topic B").to_string(),
            similarities: numbered("相似点", "Similarity", language, 2),
            left_differences: numbered("差异点", "Difference", language, 2),
            right_differences: numbered("差异点", "Difference", language, 2),
            ..Default::default()
        }),
        DiagramType::FlowMap => SpecBody::FlowMap(FlowMapSpec {
            title: language.pick("流程", "Process").to_string(),
            steps: numbered("步骤", "Step", language, 4),
            ..Default::default()
        }),
        DiagramType::MultiFlowMap => SpecBody::MultiFlowMap(MultiFlowMapSpec {
            event: language.pick("主要事件", "Main Event").to_string(),
            causes: numbered("原因", "Cause", language, 4),
            effects: numbered("结果", "Effect", language, 4),
            ..Default::default()
        }),
        DiagramType::ConceptMap => {
            let nodes: Vec<ConceptNode> = numbered("概念", "Concept", language, 3)
                .into_iter()
                .enumerate()
                .map(|(i, text)| ConceptNode {
                    id: format!("concept_{}", i),
                    text,
                })
                .collect();
            let connections = nodes
                .windows(2)
                .map(|pair| Connection {
                    from: pair[0].id.clone(),
                    to: pair[1].id.clone(),
                    label: String::new(),
                })
                .collect();
            let mut spec = ConceptMapSpec {
                nodes,
                connections,
                ..Default::default()
            };
            spec.extra
                .insert("topic".to_string(), Value::String(main_topic(language)));
            SpecBody::ConceptMap(spec)
        }
    };
    DiagramSpec::new(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::OperationRegistry;
    use crate::validation::placeholders::is_placeholder;
    use crate::validation::validate_properties;

    #[test]
    fn test_every_type_has_a_blank() {
        for diagram_type in DiagramType::ALL {
            let blank = blank_template(diagram_type, Language::En);
            assert_eq!(blank.diagram_type(), diagram_type);
        }
    }

    #[test]
    fn test_blanks_pass_structural_checks() {
        let registry = OperationRegistry::with_all_plugins();
        for diagram_type in DiagramType::ALL {
            for language in [Language::En, Language::Zh] {
                let blank = blank_template(diagram_type, language);
                let module = registry.get(diagram_type).unwrap();
                assert!(module.validate_spec(&blank), "{diagram_type} ({language})");
                let report = validate_properties(diagram_type.as_str(), &blank.to_value());
                assert!(report.is_valid, "{diagram_type}: {:?}", report.problems());
            }
        }
    }

    #[test]
    fn test_blank_texts_are_placeholders() {
        let registry = OperationRegistry::with_all_plugins();
        for diagram_type in DiagramType::ALL {
            for language in [Language::En, Language::Zh] {
                let blank = blank_template(diagram_type, language);
                let index = registry.get(diagram_type).unwrap().node_index(&blank);
                for node in crate::core::RenderedDocument::text_nodes(&index) {
                    let text = node.text();
                    if text.is_empty() {
                        continue;
                    }
                    assert!(is_placeholder(&text), "{diagram_type}: '{text}' not recognised");
                }
            }
        }
    }

    #[test]
    fn test_localised_bubble_map() {
        let zh = blank_template(DiagramType::BubbleMap, Language::Zh);
        assert_eq!(zh.body.root_field("topic"), Some("主题"));
        assert_eq!(zh.body.list("attributes").unwrap().text_at(4), Some("属性5"));

        let en = BuiltinTemplates.blank(DiagramType::BubbleMap, Language::En);
        assert_eq!(en.body.root_field("topic"), Some("Main Topic"));
        assert_eq!(en.body.list("attributes").unwrap().text_at(0), Some("Attribute 1"));
    }
}
