//! DOM snapshot module
//!
//! This module provides the page-independent view of the DOM the heuristics
//! run on. It includes:
//! - ElementNode: a captured element with attributes, text, box and style
//! - NodeRef: child-index path used to refer back to live elements
//! - DomTree: a snapshot of `<body>` with its interactive elements indexed
//! - Selector: the attribute-selector subset used by the button locator

pub mod element;
pub mod interactive;
pub mod node_ref;
pub mod selector;
pub mod tree;

pub use element::{BoundingBox, ComputedStyle, ElementNode};
pub use interactive::{InteractiveEntry, InteractiveIndex};
pub use node_ref::NodeRef;
pub use selector::Selector;
pub use tree::{DomTree, PreOrder};

use crate::error::Result;
use headless_chrome::Tab;
use std::sync::Arc;

/// Snapshot the DOM of a browser tab
pub fn snapshot(tab: &Arc<Tab>) -> Result<DomTree> {
    DomTree::from_tab(tab)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_node_export() {
        let element = ElementNode::new("div");
        assert_eq!(element.tag_name, "div");
    }

    #[test]
    fn test_interactive_index_export() {
        let index = InteractiveIndex::new();
        assert!(index.is_empty());
    }

    #[test]
    fn test_dom_tree_export() {
        let root = ElementNode::new("body");
        let tree = DomTree::new(root);
        assert_eq!(tree.root.tag_name, "body");
        assert!(tree.root.node_ref.is_root());
    }
}
