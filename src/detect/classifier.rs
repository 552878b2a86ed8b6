use crate::config::Config;
use crate::dom::{DomTree, ElementNode, NodeRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Class-name fragments that suggest an error container
pub const ERROR_CLASS_WORDS: &[&str] = &["error", "alert", "warning", "failed", "failure", "danger"];

/// A class match only counts if the text also carries one of these
pub const SECONDARY_KEYWORDS: &[&str] = &["error", "failed", "failure", "try again", "went wrong"];

/// Literal "error red" computed colors
pub const ERROR_COLORS: &[&str] = &[
    "rgb(220, 53, 69)",
    "rgb(244, 67, 54)",
    "rgb(211, 47, 47)",
    "rgb(217, 48, 37)",
    "rgb(197, 34, 31)",
    "rgb(255, 0, 0)",
];

/// The style heuristic ignores nodes with this much text or less
pub const STYLE_MIN_TEXT_LEN: usize = 10;

const MESSAGE_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    GenerationFailure,
}

/// Which heuristic produced a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionMethod {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "css-class")]
    CssClass,
    #[serde(rename = "style-heuristic")]
    StyleHeuristic,
}

impl DetectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::Text => "text",
            DetectionMethod::CssClass => "css-class",
            DetectionMethod::StyleHeuristic => "style-heuristic",
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node judged to be a generation-failure banner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub timestamp_ms: u64,
    pub error_type: ErrorType,
    pub message: String,
    /// Position of the node when it was classified
    pub source: NodeRef,
    pub processed: bool,
    pub method: DetectionMethod,
}

/// Decides whether a node represents a failed generation
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    patterns: Vec<String>,
}

impl ErrorClassifier {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.error_patterns.clone())
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Case-sensitive substring match against the configured patterns
    pub fn matches_pattern(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| text.contains(p.as_str()))
    }

    /// Classify one node; strategies run text, css-class, style and the first hit wins
    pub fn classify(&self, node: &ElementNode, timestamp_ms: u64) -> Option<DetectionResult> {
        let text = node.text();
        let method = self.detect_method(node, &text)?;

        Some(DetectionResult {
            timestamp_ms,
            error_type: ErrorType::GenerationFailure,
            message: summarize(&text),
            source: node.node_ref.clone(),
            processed: false,
            method,
        })
    }

    fn detect_method(&self, node: &ElementNode, text: &str) -> Option<DetectionMethod> {
        if self.matches_pattern(text) {
            return Some(DetectionMethod::Text);
        }
        if has_error_class(node, text) {
            return Some(DetectionMethod::CssClass);
        }
        if has_error_style(node, text) {
            return Some(DetectionMethod::StyleHeuristic);
        }
        None
    }

    /// Classify the node at `node_ref`, then its descendants; first hit wins
    pub fn classify_subtree(&self, tree: &DomTree, node_ref: &NodeRef, timestamp_ms: u64) -> Option<DetectionResult> {
        let start = tree.resolve(node_ref)?;
        crate::dom::PreOrder::new(start).find_map(|node| self.classify(node, timestamp_ms))
    }

    /// Innermost positively classified nodes of a snapshot, in document order
    pub fn scan(&self, tree: &DomTree, timestamp_ms: u64) -> Vec<DetectionResult> {
        let mut found = Vec::new();
        self.scan_node(&tree.root, timestamp_ms, &mut found);
        found
    }

    fn scan_node(&self, node: &ElementNode, timestamp_ms: u64, found: &mut Vec<DetectionResult>) -> bool {
        let mut child_matched = false;
        for child in &node.children {
            child_matched |= self.scan_node(child, timestamp_ms, found);
        }
        if child_matched {
            return true;
        }
        match self.classify(node, timestamp_ms) {
            Some(detection) => {
                found.push(detection);
                true
            }
            None => false,
        }
    }

    /// First visible node carrying a configured pattern.
    ///
    /// Only the innermost text matches are considered, so a visible ancestor
    /// never stands in for a hidden banner.
    pub fn find_visible_error<'a>(&self, tree: &'a DomTree) -> Option<&'a ElementNode> {
        let mut matches = Vec::new();
        self.innermost_text_matches(&tree.root, &mut matches);
        matches.into_iter().find(|node| node.is_visible && !node.is_hidden_by_style())
    }

    fn innermost_text_matches<'a>(&self, node: &'a ElementNode, out: &mut Vec<&'a ElementNode>) -> bool {
        let mut child_matched = false;
        for child in &node.children {
            child_matched |= self.innermost_text_matches(child, out);
        }
        if child_matched {
            return true;
        }
        if self.matches_pattern(&node.text()) {
            out.push(node);
            return true;
        }
        false
    }
}

fn has_error_class(node: &ElementNode, text: &str) -> bool {
    if !ERROR_CLASS_WORDS.iter().any(|word| node.class_contains(word)) {
        return false;
    }
    let lowered = text.to_lowercase();
    SECONDARY_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

fn has_error_style(node: &ElementNode, text: &str) -> bool {
    let Some(style) = &node.style else {
        return false;
    };
    if text.trim().chars().count() <= STYLE_MIN_TEXT_LEN {
        return false;
    }
    [&style.color, &style.background_color, &style.border_color]
        .iter()
        .any(|value| is_error_color(value))
}

fn is_error_color(value: &str) -> bool {
    let normalized = normalize_color(value);
    ERROR_COLORS.iter().any(|c| normalize_color(c) == normalized)
}

fn normalize_color(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase()
}

/// Collapse whitespace and cap the length of a detection message
fn summarize(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MESSAGE_MAX_CHARS {
        let truncated: String = collapsed.chars().take(MESSAGE_MAX_CHARS - 3).collect();
        format!("{}...", truncated)
    } else {
        collapsed
    }
}
