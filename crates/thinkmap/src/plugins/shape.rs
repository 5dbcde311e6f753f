//! Field layout of the table-driven diagram types

use crate::core::{DiagramType, Language};

/// A scalar root field that cannot be deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootSlot {
    /// `data-node-type` values the renderer uses for this root
    pub node_types: &'static [&'static str],
    /// Spec field holding the text
    pub field: &'static str,
    /// Key under `_node_dimensions`
    pub key: &'static str,
    /// Array that `add_node` targets when this root is selected
    pub adds_to: Option<&'static str>,
}

/// An editable text array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListSlot {
    pub node_type: &'static str,
    pub field: &'static str,
    pub placeholder_zh: &'static str,
    pub placeholder_en: &'static str,
}

impl ListSlot {
    pub fn placeholder(&self, language: Language) -> &'static str {
        language.pick(self.placeholder_zh, self.placeholder_en)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub diagram_type: DiagramType,
    pub roots: &'static [RootSlot],
    /// First entry is the default target of `add_node`
    pub lists: &'static [ListSlot],
}

impl Shape {
    pub fn root_for(&self, node_type: &str) -> Option<&'static RootSlot> {
        self.roots
            .iter()
            .find(|r| r.node_types.iter().any(|t| *t == node_type))
    }

    pub fn list_for(&self, node_type: &str) -> Option<&'static ListSlot> {
        self.lists.iter().find(|l| l.node_type == node_type)
    }

    pub fn list_by_field(&self, field: &str) -> Option<&'static ListSlot> {
        self.lists.iter().find(|l| l.field == field)
    }

    pub fn default_list(&self) -> Option<&'static ListSlot> {
        self.lists.first()
    }

    /// Array targeted by `add_node` given the selected node's type
    pub fn target_list(&self, selected_type: Option<&str>) -> Option<&'static ListSlot> {
        let Some(selected) = selected_type else {
            return self.default_list();
        };
        if let Some(list) = self.list_for(selected) {
            return Some(list);
        }
        self.root_for(selected)
            .and_then(|root| root.adds_to)
            .and_then(|field| self.list_by_field(field))
            .or_else(|| self.default_list())
    }
}

const TOPIC_ROOT: RootSlot = RootSlot {
    node_types: &["topic"],
    field: "topic",
    key: "topic",
    adds_to: None,
};

static SHAPES: [Shape; 8] = [
    Shape {
        diagram_type: DiagramType::BubbleMap,
        roots: &[TOPIC_ROOT],
        lists: &[ListSlot {
            node_type: "attribute",
            field: "attributes",
            placeholder_zh: "新属性",
            placeholder_en: "New Attribute",
        }],
    },
    Shape {
        diagram_type: DiagramType::CircleMap,
        roots: &[RootSlot {
            node_types: &["topic", "center"],
            field: "topic",
            key: "topic",
            adds_to: None,
        }],
        lists: &[ListSlot {
            node_type: "context",
            field: "context",
            placeholder_zh: "新联想",
            placeholder_en: "New Context",
        }],
    },
    Shape {
        diagram_type: DiagramType::MindMap,
        roots: &[TOPIC_ROOT],
        lists: &[ListSlot {
            node_type: "branch",
            field: "children",
            placeholder_zh: "新分支",
            placeholder_en: "New Branch",
        }],
    },
    Shape {
        diagram_type: DiagramType::TreeMap,
        roots: &[TOPIC_ROOT],
        lists: &[ListSlot {
            node_type: "category",
            field: "children",
            placeholder_zh: "新类别",
            placeholder_en: "New Category",
        }],
    },
    Shape {
        diagram_type: DiagramType::BraceMap,
        roots: &[RootSlot {
            node_types: &["whole", "topic"],
            field: "whole",
            key: "topic",
            adds_to: None,
        }],
        lists: &[ListSlot {
            node_type: "part",
            field: "parts",
            placeholder_zh: "新部分",
            placeholder_en: "New Part",
        }],
    },
    Shape {
        diagram_type: DiagramType::DoubleBubbleMap,
        roots: &[
            RootSlot {
                node_types: &["left"],
                field: "left",
                key: "left",
                adds_to: Some("left_differences"),
            },
            RootSlot {
                node_types: &["right"],
                field: "right",
                key: "right",
                adds_to: Some("right_differences"),
            },
        ],
        lists: &[
            ListSlot {
                node_type: "similarity",
                field: "similarities",
                placeholder_zh: "新相似点",
                placeholder_en: "New Similarity",
            },
            ListSlot {
                node_type: "left_difference",
                field: "left_differences",
                placeholder_zh: "新差异点",
                placeholder_en: "New Difference",
            },
            ListSlot {
                node_type: "right_difference",
                field: "right_differences",
                placeholder_zh: "新差异点",
                placeholder_en: "New Difference",
            },
        ],
    },
    Shape {
        diagram_type: DiagramType::FlowMap,
        roots: &[RootSlot {
            node_types: &["title", "topic"],
            field: "title",
            key: "topic",
            adds_to: None,
        }],
        lists: &[ListSlot {
            node_type: "step",
            field: "steps",
            placeholder_zh: "新步骤",
            placeholder_en: "New Step",
        }],
    },
    Shape {
        diagram_type: DiagramType::MultiFlowMap,
        roots: &[RootSlot {
            node_types: &["event", "topic"],
            field: "event",
            key: "topic",
            adds_to: None,
        }],
        lists: &[
            ListSlot {
                node_type: "cause",
                field: "causes",
                placeholder_zh: "新原因",
                placeholder_en: "New Cause",
            },
            ListSlot {
                node_type: "effect",
                field: "effects",
                placeholder_zh: "新结果",
                placeholder_en: "New Effect",
            },
        ],
    },
];

/// Layout for a table-driven type; `None` for bridge and concept maps
pub fn shape_for(diagram_type: DiagramType) -> Option<&'static Shape> {
    SHAPES.iter().find(|s| s.diagram_type == diagram_type)
}

/// Every table-driven layout
pub fn shapes() -> &'static [Shape] {
    &SHAPES
}
