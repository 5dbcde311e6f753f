//! Template placeholder catalogue
//!
//! Text that the blank templates and `add_node` seed into a diagram. A node
//! still showing one of these has not been filled in by the learner.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::core::Language;

/// One catalogue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderPattern {
    pub language: Language,
    /// Node family the pattern was written for (`branch`, `step`, ...)
    pub kind: &'static str,
    pub pattern: &'static str,
}

const fn zh(kind: &'static str, pattern: &'static str) -> PlaceholderPattern {
    PlaceholderPattern {
        language: Language::Zh,
        kind,
        pattern,
    }
}

const fn en(kind: &'static str, pattern: &'static str) -> PlaceholderPattern {
    PlaceholderPattern {
        language: Language::En,
        kind,
        pattern,
    }
}

static CATALOGUE: &[PlaceholderPattern] = &[
    zh("topic", r"^(中心)?主题\s*[AB]?$"),
    zh("title", r"^(事件)?流程$"),
    zh("event", r"^(主要)?事件$"),
    zh("branch", r"^(新)?分支\s*\d*$"),
    zh("child", r"^子(项|节点)\s*\d+(\.\d+)?$"),
    zh("attribute", r"^(新)?属性\s*\d*$"),
    zh("context", r"^(新)?联想\s*\d*$"),
    zh("category", r"^(新)?类别\s*\d*$"),
    zh("part", r"^(新)?部分\s*\d*$"),
    zh("step", r"^(新)?步骤\s*\d*$"),
    zh("cause", r"^(新)?原因\s*\d*$"),
    zh("effect", r"^(新)?结果\s*\d*$"),
    zh("similarity", r"^(新)?相似点\s*\d*$"),
    zh("difference", r"^(新)?差异点\s*\d*$"),
    zh("analogy", r"^新事物\s*[AB]?$"),
    zh("concept", r"^(新)?概念\s*\d*$"),
    en("topic", r"(?i)^(central |main )?topic\s*[ab]?$"),
    en("title", r"(?i)^process$"),
    en("event", r"(?i)^(main )?event$"),
    en("branch", r"(?i)^(new )?branch\s*\d*$"),
    en("child", r"(?i)^(sub-?item|child)\s*\d+(\.\d+)?$"),
    en("attribute", r"(?i)^(new )?attribute\s*\d*$"),
    en("context", r"(?i)^(new )?context\s*\d*$"),
    en("category", r"(?i)^(new )?category\s*\d*$"),
    en("part", r"(?i)^(new )?part\s*\d*$"),
    en("step", r"(?i)^(new )?step\s*\d*$"),
    en("cause", r"(?i)^(new )?cause\s*\d*$"),
    en("effect", r"(?i)^(new )?effect\s*\d*$"),
    en("similarity", r"(?i)^(new )?similarity\s*\d*$"),
    en("difference", r"(?i)^(new )?difference\s*\d*$"),
    en("analogy", r"(?i)^new item\s*[ab]?$"),
    en("concept", r"(?i)^(new )?concept\s*\d*$"),
];

static COMPILED: Lazy<Vec<(&'static PlaceholderPattern, Regex)>> = Lazy::new(|| {
    CATALOGUE
        .iter()
        .filter_map(|entry| match Regex::new(entry.pattern) {
            Ok(regex) => Some((entry, regex)),
            Err(e) => {
                warn!(pattern = entry.pattern, error = %e, "Skipping invalid placeholder pattern");
                None
            }
        })
        .collect()
});

/// The raw catalogue
pub fn catalogue() -> &'static [PlaceholderPattern] {
    CATALOGUE
}

/// First catalogue entry matching `text` (trimmed)
pub fn matching_pattern(text: &str) -> Option<&'static PlaceholderPattern> {
    let text = text.trim();
    COMPILED
        .iter()
        .find(|(_, regex)| regex.is_match(text))
        .map(|(entry, _)| *entry)
}

pub fn is_placeholder(text: &str) -> bool {
    matching_pattern(text).is_some()
}
