use crate::dom::element::ElementNode;
use crate::dom::interactive::{InteractiveEntry, InteractiveIndex};
use crate::dom::node_ref::NodeRef;
use crate::error::{RerunError, Result};
use headless_chrome::Tab;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One element of the serialized snapshot.
///
/// Snapshots are a flat pre-order list where every entry names its parent's
/// index, so parsing depth does not grow with the page's nesting depth.
#[derive(Debug, Serialize, Deserialize)]
struct FlatNode {
    #[serde(default)]
    parent: Option<usize>,

    #[serde(flatten)]
    node: ElementNode,
}

/// Snapshot of a page's `<body>` subtree
#[derive(Debug, Clone)]
pub struct DomTree {
    /// Root element (`<body>`)
    pub root: ElementNode,

    /// Interactive elements in document order
    pub interactive: InteractiveIndex,
}

impl DomTree {
    /// Build a tree, assigning positions and indexing interactive elements
    pub fn new(root: ElementNode) -> Self {
        let mut tree = Self { root, interactive: InteractiveIndex::new() };
        tree.build_index();
        tree
    }

    /// Snapshot the DOM of a browser tab
    pub fn from_tab(tab: &Arc<Tab>) -> Result<Self> {
        let js_code = include_str!("snapshot.js");

        let result = tab
            .evaluate(js_code, false)
            .map_err(|e| RerunError::DomParseFailed(format!("Failed to execute DOM snapshot script: {}", e)))?;

        let json_value = result
            .value
            .ok_or_else(|| RerunError::DomParseFailed("No value returned from DOM snapshot".to_string()))?;

        // The script returns a JSON string, so unwrap the string first
        let json_str: String = serde_json::from_value(json_value)
            .map_err(|e| RerunError::DomParseFailed(format!("Failed to get JSON string: {}", e)))?;

        Self::from_json(&json_str)
    }

    /// Parse a serialized snapshot (as produced by [`DomTree::to_json`])
    pub fn from_json(json: &str) -> Result<Self> {
        let nodes: Vec<FlatNode> = serde_json::from_str(json)
            .map_err(|e| RerunError::DomParseFailed(format!("Failed to parse DOM JSON: {}", e)))?;
        Ok(Self::new(Self::assemble(nodes)?))
    }

    /// Rebuild the nested tree from a flat pre-order list
    fn assemble(nodes: Vec<FlatNode>) -> Result<ElementNode> {
        if nodes.is_empty() {
            return Err(RerunError::DomParseFailed("Snapshot contains no elements".to_string()));
        }

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        for (i, flat) in nodes.iter().enumerate() {
            match (i, flat.parent) {
                (0, None) => {}
                (0, Some(_)) => return Err(RerunError::DomParseFailed("Snapshot root has a parent".to_string())),
                (_, Some(parent)) if parent < i => children[parent].push(i),
                (_, parent) => {
                    return Err(RerunError::DomParseFailed(format!(
                        "Element {} has invalid parent {:?}",
                        i, parent
                    )));
                }
            }
        }

        // Children always follow their parent, so walking backwards finds
        // every child subtree complete
        let mut slots: Vec<Option<ElementNode>> = nodes.into_iter().map(|flat| Some(flat.node)).collect();
        for i in (0..slots.len()).rev() {
            let kids = children[i]
                .iter()
                .map(|&c| slots[c].take())
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| RerunError::DomParseFailed(format!("Element {} lost a child", i)))?;
            if let Some(node) = slots[i].as_mut() {
                node.children = kids;
            }
        }

        slots[0]
            .take()
            .ok_or_else(|| RerunError::DomParseFailed("Snapshot root missing".to_string()))
    }

    fn build_index(&mut self) {
        self.interactive.clear();
        Self::traverse_and_index(&mut self.root, NodeRef::root(), &mut self.interactive);
    }

    fn traverse_and_index(node: &mut ElementNode, position: NodeRef, index: &mut InteractiveIndex) {
        node.compute_interactivity();

        if node.is_interactive {
            let mut entry = InteractiveEntry::new(&node.tag_name);
            if let Some(label) = node.get_attribute("aria-label").or_else(|| node.get_attribute("title")) {
                entry = entry.with_label(label.clone());
            }
            if node.is_button() {
                entry = entry.as_button();
            }
            index.register(position.clone(), entry);
        }

        for (i, child) in node.children.iter_mut().enumerate() {
            Self::traverse_and_index(child, position.child(i), index);
        }

        node.node_ref = position;
    }

    /// Resolve a position against this snapshot
    pub fn resolve(&self, node: &NodeRef) -> Option<&ElementNode> {
        node.path().iter().try_fold(&self.root, |current, &i| current.children.get(i))
    }

    /// All elements in document (pre-)order
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder::new(&self.root)
    }

    /// Convert the snapshot to the flat JSON form the page script emits
    pub fn to_json(&self) -> Result<String> {
        let mut nodes = Vec::new();
        let mut stack: Vec<(&ElementNode, Option<usize>)> = vec![(&self.root, None)];
        while let Some((node, parent)) = stack.pop() {
            let index = nodes.len();
            nodes.push(FlatNode { parent, node: node.shallow_clone() });
            stack.extend(node.children.iter().rev().map(|child| (child, Some(index))));
        }

        serde_json::to_string_pretty(&nodes)
            .map_err(|e| RerunError::DomParseFailed(format!("Failed to serialize DOM to JSON: {}", e)))
    }

    /// Count total elements in the tree
    pub fn count_elements(&self) -> usize {
        self.iter().count()
    }

    /// Count interactive elements
    pub fn count_interactive(&self) -> usize {
        self.interactive.len()
    }
}

/// Pre-order traversal of an element and its descendants
pub struct PreOrder<'a> {
    stack: Vec<&'a ElementNode>,
}

impl<'a> PreOrder<'a> {
    pub fn new(start: &'a ElementNode) -> Self {
        Self { stack: vec![start] }
    }
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a ElementNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_tree() -> ElementNode {
        let mut root = ElementNode::new("body");

        let mut header = ElementNode::new("header");
        header.add_child(ElementNode::new("button").with_attribute("id", "nav-btn").with_text("Menu"));

        let mut main = ElementNode::new("main");
        main.add_child(ElementNode::new("a").with_attribute("href", "/page").with_text("Click here"));
        let mut turn = ElementNode::new("div").with_attribute("class", "chat-turn");
        turn.add_child(ElementNode::new("div").with_attribute("role", "button").with_attribute("title", "Rerun"));
        main.add_child(turn);

        root.add_child(header);
        root.add_child(main);

        root
    }

    #[test]
    fn test_positions_assigned() {
        let tree = DomTree::new(create_test_tree());

        let rerun = NodeRef::from_path(vec![1, 1, 0]);
        let node = tree.resolve(&rerun).unwrap();
        assert_eq!(node.node_ref, rerun);
        assert_eq!(node.get_attribute("title").map(String::as_str), Some("Rerun"));
        assert!(tree.resolve(&NodeRef::from_path(vec![4])).is_none());
    }

    #[test]
    fn test_interactive_index() {
        let tree = DomTree::new(create_test_tree());

        // button, link, role=button
        assert_eq!(tree.count_interactive(), 3);
        let buttons: Vec<_> = tree.interactive.buttons().cloned().collect();
        assert_eq!(buttons, vec![NodeRef::from_path(vec![0, 0]), NodeRef::from_path(vec![1, 1, 0])]);
        let entry = tree.interactive.get(&NodeRef::from_path(vec![1, 1, 0])).unwrap();
        assert_eq!(entry.label.as_deref(), Some("Rerun"));
    }

    #[test]
    fn test_pre_order() {
        let tree = DomTree::new(create_test_tree());
        let tags: Vec<_> = tree.iter().map(|n| n.tag_name.as_str()).collect();
        assert_eq!(tags, vec!["body", "header", "button", "main", "a", "div", "div"]);
        assert_eq!(tree.count_elements(), 7);
    }

    #[test]
    fn test_json_round_trip_keeps_positions() {
        let tree = DomTree::new(create_test_tree());
        let json = tree.to_json().unwrap();
        assert!(json.contains("\"tag_name\": \"main\""));

        let parsed = DomTree::from_json(&json).unwrap();
        assert_eq!(parsed.count_elements(), 7);
        assert_eq!(parsed.count_interactive(), 3);
        assert_eq!(parsed.root, tree.root);
    }

    #[test]
    fn test_from_json_reads_page_script_output() {
        let json = r#"[
            {"parent": null, "tag_name": "body"},
            {"parent": 0, "tag_name": "div", "text_content": "Something went .", "full_text": "Something went wrong."},
            {"parent": 1, "tag_name": "em", "text_content": "wrong", "full_text": "wrong"},
            {"parent": 0, "tag_name": "script"},
            {"parent": 0, "tag_name": "button", "attributes": {"title": "Rerun"}, "is_visible": true}
        ]"#;

        let tree = DomTree::from_json(json).unwrap();
        let tags: Vec<_> = tree.iter().map(|n| n.tag_name.as_str()).collect();
        assert_eq!(tags, vec!["body", "div", "em", "script", "button"]);
        assert_eq!(tree.resolve(&NodeRef::from_path(vec![0])).unwrap().text(), "Something went wrong.");
        assert_eq!(tree.interactive.buttons().cloned().collect::<Vec<_>>(), vec![NodeRef::from_path(vec![2])]);
    }

    #[test]
    fn test_deeply_nested_page_parses() {
        let depth = 400;
        let mut node = ElementNode::new("button").with_attribute("title", "Rerun");
        for _ in 0..depth {
            node = ElementNode::new("div").with_children(vec![node]);
        }
        let tree = DomTree::new(ElementNode::new("body").with_children(vec![node]));

        let parsed = DomTree::from_json(&tree.to_json().unwrap()).unwrap();
        assert_eq!(parsed.count_elements(), depth + 2);
        let button = parsed.interactive.buttons().next().unwrap();
        assert_eq!(button.depth(), depth + 1);
        assert_eq!(parsed.resolve(button).unwrap().tag_name, "button");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(DomTree::from_json("[1,2"), Err(RerunError::DomParseFailed(_))));
        assert!(matches!(DomTree::from_json("[]"), Err(RerunError::DomParseFailed(_))));
        // A parent must come before its children
        let forward = r#"[{"parent": null, "tag_name": "body"}, {"parent": 2, "tag_name": "div"}, {"parent": 0, "tag_name": "p"}]"#;
        assert!(matches!(DomTree::from_json(forward), Err(RerunError::DomParseFailed(_))));
    }
}
