use crate::detect::{ButtonCandidate, ErrorClassifier, is_actionable};
use crate::dom::{DomTree, ElementNode, NodeRef};
use crate::page::{ClickMethod, Page};
use crate::recovery::Clock;
use std::time::Duration;

/// Wait after hovering before the first click
pub const HOVER_SETTLE: Duration = Duration::from_millis(200);

/// Wait after hovering message areas before looking for revealed controls
pub const REVEAL_SETTLE: Duration = Duration::from_millis(100);

/// Wait after a click before checking whether the page reacted
pub const VERIFY_SETTLE: Duration = Duration::from_millis(1000);

const LOADING_CLASS_WORDS: &[&str] = &["loading", "spinner", "progress"];
const LOADING_TAGS: &[&str] = &["mat-spinner", "mat-progress-spinner", "mat-progress-bar"];

/// Drives the rerun control like a user would
#[derive(Debug, Clone)]
pub struct InteractionSimulator {
    hover_settle: Duration,
    verify_settle: Duration,
    reveal_settle: Duration,
}

impl Default for InteractionSimulator {
    fn default() -> Self {
        Self { hover_settle: HOVER_SETTLE, verify_settle: VERIFY_SETTLE, reveal_settle: REVEAL_SETTLE }
    }
}

impl InteractionSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: override both settle times
    pub fn with_settle(mut self, hover: Duration, verify: Duration) -> Self {
        self.hover_settle = hover;
        self.verify_settle = verify;
        self
    }

    /// Hover each message area so hover-only controls render; false when nothing was hovered
    pub fn reveal(&self, page: &dyn Page, clock: &dyn Clock, areas: &[NodeRef]) -> bool {
        let hovered = areas
            .iter()
            .filter(|area| match page.hover(area) {
                Ok(()) => true,
                Err(e) => {
                    log::debug!("Hover on message area {} failed: {}", area, e);
                    false
                }
            })
            .count();
        if hovered == 0 {
            return false;
        }

        log::debug!("Hovered {} message area(s) to reveal controls", hovered);
        clock.sleep(self.reveal_settle);
        true
    }

    /// Hover then click the candidate, trying each click method until one verifies
    pub fn interact(
        &self,
        page: &dyn Page,
        clock: &dyn Clock,
        candidate: &ButtonCandidate,
        classifier: &ErrorClassifier,
    ) -> bool {
        let tree = match page.snapshot() {
            Ok(tree) => tree,
            Err(e) => {
                log::debug!("Cannot re-validate {}: {}", candidate.node, e);
                return false;
            }
        };
        match tree.resolve(&candidate.node) {
            Some(node) if is_actionable(node) => {}
            _ => {
                log::debug!("Candidate {} is gone or no longer actionable", candidate.node);
                return false;
            }
        }

        if let Err(e) = page.hover(&candidate.node) {
            log::debug!("Hover on {} failed: {}", candidate.node, e);
        }
        clock.sleep(self.hover_settle);

        for method in ClickMethod::ORDER {
            if let Err(e) = page.click(&candidate.node, method) {
                log::debug!("Click via {} failed: {}", method, e);
                continue;
            }
            if self.verify(page, clock, classifier) {
                log::info!("Rerun triggered via {} click on {}", method, candidate.node);
                return true;
            }
            log::debug!("Click via {} did not clear the error", method);
        }

        false
    }

    /// Settle, then check for a loading indicator or the absence of any visible error
    pub fn verify(&self, page: &dyn Page, clock: &dyn Clock, classifier: &ErrorClassifier) -> bool {
        clock.sleep(self.verify_settle);

        let tree = match page.snapshot() {
            Ok(tree) => tree,
            Err(e) => {
                log::debug!("Verification snapshot failed: {}", e);
                return false;
            }
        };

        if has_loading_indicator(&tree) {
            return true;
        }
        classifier.find_visible_error(&tree).is_none()
    }
}

/// Whether a visible spinner or progress element is on the page
pub fn has_loading_indicator(tree: &DomTree) -> bool {
    tree.iter().any(|node| node.is_visible && !node.is_hidden_by_style() && is_loading_indicator(node))
}

fn is_loading_indicator(node: &ElementNode) -> bool {
    LOADING_TAGS.iter().any(|tag| node.is_tag(tag))
        || node.get_attribute("role").is_some_and(|role| role == "progressbar")
        || LOADING_CLASS_WORDS.iter().any(|word| node.class_contains(word))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::detect::LocateStrategy;
    use crate::dom::NodeRef;
    use crate::page::MemoryPage;
    use crate::recovery::ManualClock;

    fn banner() -> ElementNode {
        ElementNode::new("div").with_text("Failed to generate content").with_visibility(true)
    }

    fn button() -> ElementNode {
        ElementNode::new("button")
            .with_attribute("aria-label", "Rerun")
            .with_visibility(true)
            .with_bounding_box(10.0, 10.0, 24.0, 24.0)
    }

    fn page() -> MemoryPage {
        MemoryPage::new(ElementNode::new("body").with_children(vec![banner(), button()]))
    }

    fn candidate() -> ButtonCandidate {
        ButtonCandidate {
            node: NodeRef::from_path(vec![1]),
            strategy: LocateStrategy::Selector,
            confidence: 0.9,
            bounding_box: None,
        }
    }

    fn classifier() -> ErrorClassifier {
        ErrorClassifier::from_config(&Config::default())
    }

    #[test]
    fn test_first_method_verifies() {
        let page = page();
        page.on_click(|root, _| {
            root.children.remove(0);
        });
        let clock = ManualClock::new();

        assert!(InteractionSimulator::new().interact(&page, &clock, &candidate(), &classifier()));
        assert_eq!(page.hovers(), vec![NodeRef::from_path(vec![1])]);
        assert_eq!(page.clicks(), vec![(NodeRef::from_path(vec![1]), ClickMethod::Native)]);
        assert_eq!(clock.sleeps(), vec![HOVER_SETTLE, VERIFY_SETTLE]);
    }

    #[test]
    fn test_falls_back_to_next_method() {
        let page = page();
        page.fail_click_method(ClickMethod::Native);
        page.on_click(|root, _| {
            root.children[0].is_visible = false;
        });
        let clock = ManualClock::new();

        assert!(InteractionSimulator::new().interact(&page, &clock, &candidate(), &classifier()));
        assert_eq!(page.clicks(), vec![(NodeRef::from_path(vec![1]), ClickMethod::MouseEvent)]);
    }

    #[test]
    fn test_all_methods_exhausted() {
        let page = page();
        let clock = ManualClock::new();

        assert!(!InteractionSimulator::new().interact(&page, &clock, &candidate(), &classifier()));
        assert_eq!(page.clicks().len(), 3);
        assert_eq!(clock.sleeps(), vec![HOVER_SETTLE, VERIFY_SETTLE, VERIFY_SETTLE, VERIFY_SETTLE]);
    }

    #[test]
    fn test_loading_indicator_counts_as_success() {
        let page = page();
        page.on_click(|root, _| {
            root.children.push(ElementNode::new("mat-progress-bar").with_visibility(true));
        });
        let clock = ManualClock::new();

        assert!(InteractionSimulator::new().interact(&page, &clock, &candidate(), &classifier()));
        assert_eq!(page.clicks().len(), 1);
    }

    #[test]
    fn test_revalidation_rejects_disabled() {
        let page = MemoryPage::new(ElementNode::new("body").with_children(vec![banner(), button().with_disabled(true)]));
        let clock = ManualClock::new();

        assert!(!InteractionSimulator::new().interact(&page, &clock, &candidate(), &classifier()));
        assert!(page.clicks().is_empty());
        assert!(page.hovers().is_empty());
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_snapshot_failure_fails_fast() {
        let page = page();
        page.fail_snapshots(true);
        let clock = ManualClock::new();

        assert!(!InteractionSimulator::new().interact(&page, &clock, &candidate(), &classifier()));
        assert!(page.clicks().is_empty());
    }

    #[test]
    fn test_reveal_hovers_areas_then_settles() {
        let page = MemoryPage::new(ElementNode::new("body").with_children(vec![
            ElementNode::new("div").with_attribute("class", "chat-message"),
            ElementNode::new("div").with_attribute("class", "chat-message"),
        ]));
        let clock = ManualClock::new();
        let areas = vec![NodeRef::from_path(vec![0]), NodeRef::from_path(vec![5]), NodeRef::from_path(vec![1])];

        assert!(InteractionSimulator::new().reveal(&page, &clock, &areas));
        // The missing area is skipped
        assert_eq!(page.hovers(), vec![NodeRef::from_path(vec![0]), NodeRef::from_path(vec![1])]);
        assert_eq!(clock.sleeps(), vec![REVEAL_SETTLE]);

        let clock = ManualClock::new();
        assert!(!InteractionSimulator::new().reveal(&page, &clock, &[]));
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_hidden_spinner_is_ignored() {
        let tree = DomTree::new(ElementNode::new("body").with_children(vec![
            ElementNode::new("div").with_attribute("class", "loading-spinner"),
            ElementNode::new("div").with_attribute("role", "progressbar").with_visibility(true),
        ]));
        assert!(has_loading_indicator(&tree));

        let hidden = DomTree::new(
            ElementNode::new("body")
                .with_children(vec![ElementNode::new("div").with_attribute("class", "loading-spinner")]),
        );
        assert!(!has_loading_indicator(&hidden));
    }
}
