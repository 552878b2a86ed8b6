use crate::dom::node_ref::NodeRef;
use indexmap::IndexMap;

/// Summary of an interactive element recorded while indexing a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct InteractiveEntry {
    /// Element's tag name
    pub tag_name: String,

    /// `aria-label`, falling back to `title`
    pub label: Option<String>,

    /// Whether the element is a button or `role="button"`
    pub is_button: bool,
}

impl InteractiveEntry {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self { tag_name: tag_name.into(), label: None, is_button: false }
    }

    /// Builder method: set label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Builder method: mark as button
    pub fn as_button(mut self) -> Self {
        self.is_button = true;
        self
    }
}

/// Interactive elements of a snapshot keyed by position.
/// Uses IndexMap to preserve document order
#[derive(Debug, Clone, Default)]
pub struct InteractiveIndex {
    map: IndexMap<NodeRef, InteractiveEntry>,
}

impl InteractiveIndex {
    pub fn new() -> Self {
        Self { map: IndexMap::new() }
    }

    /// Register an element; re-registering a position replaces its entry in place
    pub fn register(&mut self, node: NodeRef, entry: InteractiveEntry) {
        self.map.insert(node, entry);
    }

    pub fn get(&self, node: &NodeRef) -> Option<&InteractiveEntry> {
        self.map.get(node)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Positions of buttons and `role="button"` elements, in document order
    pub fn buttons(&self) -> impl Iterator<Item = &NodeRef> {
        self.map.iter().filter(|(_, e)| e.is_button).map(|(n, _)| n)
    }

    /// Interactive elements strictly inside `ancestor`, in document order
    pub fn descendants_of<'a>(&'a self, ancestor: &'a NodeRef) -> impl Iterator<Item = &'a NodeRef> + 'a {
        self.map.keys().filter(move |n| n.is_descendant_of(ancestor))
    }

    /// Nearest interactive element at or above `node`
    pub fn nearest_enclosing(&self, node: &NodeRef) -> Option<&NodeRef> {
        if let Some((key, _)) = self.map.get_key_value(node) {
            return Some(key);
        }
        let mut current = node.parent();
        while let Some(candidate) = current {
            if let Some((key, _)) = self.map.get_key_value(&candidate) {
                return Some(key);
            }
            current = candidate.parent();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> InteractiveIndex {
        let mut index = InteractiveIndex::new();
        index.register(NodeRef::from_path(vec![0, 1]), InteractiveEntry::new("a"));
        index.register(NodeRef::from_path(vec![1]), InteractiveEntry::new("button").as_button().with_label("Rerun"));
        index.register(NodeRef::from_path(vec![1, 0, 2]), InteractiveEntry::new("input"));
        index
    }

    #[test]
    fn test_register_preserves_order() {
        let index = index();
        let root = NodeRef::root();
        let order: Vec<_> = index.descendants_of(&root).map(|n| n.to_string()).collect();
        assert_eq!(order, vec!["body>0>1", "body>1", "body>1>0>2"]);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_buttons() {
        let index = index();
        let buttons: Vec<_> = index.buttons().cloned().collect();
        assert_eq!(buttons, vec![NodeRef::from_path(vec![1])]);
        assert_eq!(index.get(&buttons[0]).unwrap().label.as_deref(), Some("Rerun"));
    }

    #[test]
    fn test_descendants_of() {
        let index = index();
        let ancestor = NodeRef::from_path(vec![1]);
        let inside: Vec<_> = index.descendants_of(&ancestor).cloned().collect();
        assert_eq!(inside, vec![NodeRef::from_path(vec![1, 0, 2])]);
    }

    #[test]
    fn test_nearest_enclosing() {
        let index = index();
        let deep = NodeRef::from_path(vec![1, 3, 0]);
        assert_eq!(index.nearest_enclosing(&deep), Some(&NodeRef::from_path(vec![1])));
        assert_eq!(index.nearest_enclosing(&NodeRef::from_path(vec![1, 0, 2])), Some(&NodeRef::from_path(vec![1, 0, 2])));
        assert_eq!(index.nearest_enclosing(&NodeRef::from_path(vec![5])), None);
    }

    #[test]
    fn test_register_replaces_in_place() {
        let mut index = index();
        index.register(NodeRef::from_path(vec![0, 1]), InteractiveEntry::new("a").with_label("Help"));
        assert_eq!(index.len(), 3);
        assert_eq!(index.get(&NodeRef::from_path(vec![0, 1])).unwrap().label.as_deref(), Some("Help"));

        index.clear();
        assert!(index.is_empty());
    }
}
