use crate::config::Config;
use crate::detect::classifier::ErrorClassifier;
use crate::dom::{BoundingBox, DomTree, ElementNode, NodeRef, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Keywords strategy 2 looks for in `aria-label` / `title`
pub const LABEL_KEYWORDS: &[&str] = &["rerun", "retry", "try again"];

/// Visible text strategy 2 accepts as a rerun control
pub const RERUN_TEXT: &str = "Rerun";
pub const RERUN_GLYPH: char = '\u{2605}';

/// Containers hovered to reveal controls that only render on hover
pub const MESSAGE_AREA_SELECTORS: &str = r#"[role="main"], .message-container, .chat-message"#;

/// Icon box size (px) strategy 1 treats as a toolbar icon
pub const ICON_MIN_PX: f64 = 16.0;
pub const ICON_MAX_PX: f64 = 32.0;

/// How far strategy 3 walks up from an error container
pub const PROXIMITY_LEVELS: usize = 3;

/// Discovery strategy, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocateStrategy {
    Selector,
    AriaLabel,
    SpatialProximity,
}

impl LocateStrategy {
    /// Static priority weight of the strategy
    pub fn confidence(&self) -> f64 {
        match self {
            LocateStrategy::Selector => 0.9,
            LocateStrategy::AriaLabel => 0.7,
            LocateStrategy::SpatialProximity => 0.6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LocateStrategy::Selector => "selector",
            LocateStrategy::AriaLabel => "aria-label",
            LocateStrategy::SpatialProximity => "spatial-proximity",
        }
    }
}

impl fmt::Display for LocateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A control believed to be the rerun button
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonCandidate {
    pub node: NodeRef,
    pub strategy: LocateStrategy,
    pub confidence: f64,
    /// Box at discovery time
    pub bounding_box: Option<BoundingBox>,
}

impl ButtonCandidate {
    fn new(node: &ElementNode, strategy: LocateStrategy) -> Self {
        Self {
            node: node.node_ref.clone(),
            strategy,
            confidence: strategy.confidence(),
            bounding_box: node.bounding_box,
        }
    }
}

/// Element exists, is enabled, has a box and is not hidden by style
pub fn is_actionable(node: &ElementNode) -> bool {
    if node.is_effectively_disabled() || node.is_hidden_by_style() {
        return false;
    }
    node.bounding_box.is_some_and(|b| b.is_visible())
}

/// Searches a snapshot for the rerun control
#[derive(Debug, Clone)]
pub struct ButtonLocator {
    selectors: Vec<Selector>,
    message_areas: Vec<Selector>,
}

impl ButtonLocator {
    /// Parse selector strings, each of which may be a comma separated list.
    ///
    /// An invalid entry is skipped without affecting the rest.
    pub fn new<S: AsRef<str>>(selectors: &[S]) -> Self {
        let selectors = selectors
            .iter()
            .filter_map(|source| match Selector::parse_list(source.as_ref()) {
                Ok(list) => Some(list),
                Err(e) => {
                    log::warn!("Skipping button selector: {}", e);
                    None
                }
            })
            .flatten()
            .collect();
        let message_areas = Selector::parse_list(MESSAGE_AREA_SELECTORS).unwrap_or_default();
        Self { selectors, message_areas }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.button_selectors)
    }

    pub fn selector_count(&self) -> usize {
        self.selectors.len()
    }

    /// Try each strategy in order and return the first actionable hit
    pub fn locate(&self, tree: &DomTree, classifier: &ErrorClassifier) -> Option<ButtonCandidate> {
        let candidate = self
            .by_selector(tree)
            .or_else(|| self.by_label(tree))
            .or_else(|| self.by_proximity(tree, classifier));

        match &candidate {
            Some(c) => log::debug!("Rerun control at {} via {} ({:.1})", c.node, c.strategy, c.confidence),
            None => log::debug!("No rerun control in snapshot of {} elements", tree.count_elements()),
        }
        candidate
    }

    /// Strategy 1: explicit selectors over buttons, then buttons holding a toolbar-sized icon
    pub fn by_selector(&self, tree: &DomTree) -> Option<ButtonCandidate> {
        let buttons: Vec<&ElementNode> = tree.interactive.buttons().filter_map(|n| tree.resolve(n)).collect();

        for selector in &self.selectors {
            if let Some(node) = buttons.iter().find(|b| selector.matches(b) && is_actionable(b)) {
                log::debug!("Selector '{}' matched {}", selector.as_str(), node.to_simple_string());
                return Some(ButtonCandidate::new(node, LocateStrategy::Selector));
            }
        }

        buttons
            .iter()
            .find(|b| b.has_icon_sized(ICON_MIN_PX, ICON_MAX_PX) && is_actionable(b))
            .map(|node| ButtonCandidate::new(node, LocateStrategy::Selector))
    }

    /// Strategy 2: any element labelled rerun/retry/try again, lifted to its interactive ancestor.
    ///
    /// Elements whose text reads "Rerun" or that carry the star glyph count as
    /// labelled too; without an interactive ancestor they fall back to the first
    /// button among their siblings' subtrees.
    pub fn by_label(&self, tree: &DomTree) -> Option<ButtonCandidate> {
        let by_attribute = tree.iter().filter(|node| has_rerun_label(node)).find_map(|labelled| {
            let target = tree.interactive.nearest_enclosing(&labelled.node_ref)?;
            let node = tree.resolve(target)?;
            is_actionable(node).then(|| ButtonCandidate::new(node, LocateStrategy::AriaLabel))
        });
        by_attribute.or_else(|| {
            tree.iter()
                .filter(|node| has_rerun_text(node))
                .find_map(|labelled| text_label_target(tree, labelled))
                .map(|node| ButtonCandidate::new(node, LocateStrategy::AriaLabel))
        })
    }

    /// Strategy 3: interactive icon controls around the current error containers
    pub fn by_proximity(&self, tree: &DomTree, classifier: &ErrorClassifier) -> Option<ButtonCandidate> {
        for detection in classifier.scan(tree, 0) {
            let mut scopes = vec![detection.source.clone()];
            scopes.extend(detection.source.ancestors(PROXIMITY_LEVELS));

            for scope in &scopes {
                let hit = tree
                    .interactive
                    .descendants_of(scope)
                    .filter_map(|n| tree.resolve(n))
                    .find(|node| is_actionable(node) && node.has_icon());
                if let Some(node) = hit {
                    return Some(ButtonCandidate::new(node, LocateStrategy::SpatialProximity));
                }
            }
        }
        None
    }

    /// Message containers worth hovering before searching again
    pub fn message_areas(&self, tree: &DomTree) -> Vec<NodeRef> {
        tree.iter()
            .filter(|node| self.message_areas.iter().any(|s| s.matches(node)))
            .map(|node| node.node_ref.clone())
            .collect()
    }
}

fn has_rerun_text(node: &ElementNode) -> bool {
    node.text().trim() == RERUN_TEXT || node.text_content.as_ref().is_some_and(|t| t.contains(RERUN_GLYPH))
}

fn text_label_target<'a>(tree: &'a DomTree, labelled: &ElementNode) -> Option<&'a ElementNode> {
    if let Some(target) = tree.interactive.nearest_enclosing(&labelled.node_ref) {
        return tree.resolve(target).filter(|node| is_actionable(node));
    }
    let parent = labelled.node_ref.parent()?;
    tree.interactive
        .descendants_of(&parent)
        .filter_map(|n| tree.resolve(n))
        .find(|node| node.is_button())
        .filter(|node| is_actionable(node))
}

fn has_rerun_label(node: &ElementNode) -> bool {
    ["aria-label", "title"].iter().any(|attr| {
        node.get_attribute(attr).is_some_and(|value| {
            let lowered = value.to_lowercase();
            LABEL_KEYWORDS.iter().any(|k| lowered.contains(k))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ComputedStyle;

    fn locator() -> ButtonLocator {
        ButtonLocator::from_config(&Config::default())
    }

    fn classifier() -> ErrorClassifier {
        ErrorClassifier::from_config(&Config::default())
    }

    fn shown(node: ElementNode) -> ElementNode {
        node.with_visibility(true).with_bounding_box(0.0, 0.0, 32.0, 32.0)
    }

    fn icon(size: f64) -> ElementNode {
        ElementNode::new("svg").with_visibility(true).with_bounding_box(0.0, 0.0, size, size)
    }

    fn tree(children: Vec<ElementNode>) -> DomTree {
        DomTree::new(ElementNode::new("body").with_children(children))
    }

    #[test]
    fn test_selector_strategy() {
        let tree = tree(vec![
            shown(ElementNode::new("button").with_attribute("aria-label", "Copy")),
            shown(ElementNode::new("button").with_attribute("aria-label", "Rerun this turn")),
        ]);

        let candidate = locator().locate(&tree, &classifier()).unwrap();
        assert_eq!(candidate.node, NodeRef::from_path(vec![1]));
        assert_eq!(candidate.strategy, LocateStrategy::Selector);
        assert_eq!(candidate.confidence, 0.9);
        assert!(candidate.bounding_box.is_some());
    }

    #[test]
    fn test_selector_strategy_icon_size() {
        let tree = tree(vec![
            shown(ElementNode::new("button").with_children(vec![icon(48.0)])),
            shown(ElementNode::new("button").with_children(vec![icon(20.0)])),
        ]);

        let candidate = locator().by_selector(&tree).unwrap();
        assert_eq!(candidate.node, NodeRef::from_path(vec![1]));
    }

    #[test]
    fn test_label_strategy_walks_to_interactive_ancestor() {
        let tree = tree(vec![shown(ElementNode::new("div").with_attribute("role", "menuitem").with_children(vec![
            ElementNode::new("span").with_attribute("title", "Try again"),
        ]))]);

        let candidate = locator().locate(&tree, &classifier()).unwrap();
        assert_eq!(candidate.node, NodeRef::from_path(vec![0]));
        assert_eq!(candidate.strategy, LocateStrategy::AriaLabel);
        assert_eq!(candidate.confidence, 0.7);
    }

    #[test]
    fn test_label_without_interactive_ancestor() {
        let tree = tree(vec![shown(ElementNode::new("span").with_attribute("aria-label", "Retry"))]);
        assert!(locator().by_label(&tree).is_none());
    }

    #[test]
    fn test_proximity_strategy() {
        let tree = tree(vec![
            shown(ElementNode::new("a").with_attribute("href", "/help")),
            ElementNode::new("div").with_attribute("class", "turn").with_children(vec![
                ElementNode::new("div").with_text("Something went wrong"),
                ElementNode::new("div").with_attribute("class", "actions").with_children(vec![
                    shown(ElementNode::new("a").with_attribute("href", "#")),
                    shown(ElementNode::new("a").with_attribute("href", "#").with_children(vec![icon(24.0)])),
                ]),
            ]),
        ]);

        let candidate = locator().locate(&tree, &classifier()).unwrap();
        assert_eq!(candidate.node, NodeRef::from_path(vec![1, 1, 1]));
        assert_eq!(candidate.strategy, LocateStrategy::SpatialProximity);
        assert_eq!(candidate.confidence, 0.6);
    }

    #[test]
    fn test_never_returns_unactionable() {
        let disabled = shown(ElementNode::new("button").with_attribute("aria-label", "Rerun")).with_disabled(true);
        let zero = ElementNode::new("button")
            .with_attribute("aria-label", "Rerun")
            .with_bounding_box(0.0, 0.0, 0.0, 0.0);
        let hidden = shown(ElementNode::new("button").with_attribute("title", "Rerun"))
            .with_style(ComputedStyle { visibility: "hidden".to_string(), ..Default::default() });
        let aria_disabled = shown(ElementNode::new("button").with_attribute("aria-label", "Retry"))
            .with_attribute("aria-disabled", "true");

        let tree = tree(vec![
            ElementNode::new("div").with_text("Failed to generate content"),
            disabled,
            zero,
            hidden,
            aria_disabled,
        ]);

        assert!(locator().locate(&tree, &classifier()).is_none());
    }

    #[test]
    fn test_label_strategy_reads_button_text() {
        let tree = tree(vec![
            ElementNode::new("div").with_text("Failed to generate content"),
            shown(ElementNode::new("button").with_text("Run")),
            shown(ElementNode::new("button").with_children(vec![ElementNode::new("span").with_text(" Rerun ")])),
        ]);

        let candidate = locator().locate(&tree, &classifier()).unwrap();
        assert_eq!(candidate.node, NodeRef::from_path(vec![2]));
        assert_eq!(candidate.strategy, LocateStrategy::AriaLabel);
    }

    #[test]
    fn test_text_label_falls_back_to_sibling_button() {
        let tree = tree(vec![ElementNode::new("div").with_attribute("class", "turn-footer").with_children(vec![
            ElementNode::new("span").with_text("\u{2605} Rerun this turn"),
            ElementNode::new("div").with_children(vec![shown(ElementNode::new("button"))]),
        ])]);

        let candidate = locator().by_label(&tree).unwrap();
        assert_eq!(candidate.node, NodeRef::from_path(vec![0, 1, 0]));
    }

    #[test]
    fn test_text_label_skips_unactionable_target() {
        let tree = tree(vec![
            ElementNode::new("button").with_text("Rerun").with_bounding_box(0.0, 0.0, 0.0, 0.0),
            ElementNode::new("span").with_text("Rerun"),
        ]);
        assert!(locator().by_label(&tree).is_none());
    }

    #[test]
    fn test_message_areas() {
        let tree = tree(vec![ElementNode::new("div").with_attribute("role", "main").with_children(vec![
            ElementNode::new("div").with_attribute("class", "chat-message user"),
            ElementNode::new("div").with_attribute("class", "message-container"),
            ElementNode::new("div").with_attribute("class", "chat-messages"),
        ])]);

        assert_eq!(
            locator().message_areas(&tree),
            vec![NodeRef::from_path(vec![0]), NodeRef::from_path(vec![0, 0]), NodeRef::from_path(vec![0, 1])]
        );
    }

    #[test]
    fn test_selector_list_entry() {
        let locator = ButtonLocator::new(&[r#"button[title*="rerun" i], [role="button"][aria-label*="rerun" i]"#]);
        assert_eq!(locator.selector_count(), 2);

        let tree = tree(vec![shown(ElementNode::new("div").with_attribute("role", "button").with_attribute("aria-label", "Rerun"))]);
        let candidate = locator.by_selector(&tree).unwrap();
        assert_eq!(candidate.node, NodeRef::from_path(vec![0]));
    }

    #[test]
    fn test_invalid_selector_is_skipped() {
        let locator = ButtonLocator::new(&["button >> nonsense", r#"button[title*="rerun" i]"#]);
        assert_eq!(locator.selector_count(), 1);

        let tree = tree(vec![shown(ElementNode::new("button").with_attribute("title", "Rerun"))]);
        assert!(locator.by_selector(&tree).is_some());
    }

    #[test]
    fn test_empty_page() {
        assert!(locator().locate(&tree(vec![]), &classifier()).is_none());
    }
}
