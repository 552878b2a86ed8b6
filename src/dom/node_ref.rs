use serde::{Deserialize, Serialize};
use std::fmt;

/// Path of element-child indices from `<body>` to an element.
///
/// A `NodeRef` never owns anything in the page. It is resolved against each
/// fresh snapshot (or by the injected scripts against the live document), so a
/// reference that went stale simply stops resolving or resolves to whatever
/// element now occupies that position; callers re-validate before acting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeRef(Vec<usize>);

impl NodeRef {
    /// Reference to `<body>` itself
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_path(path: Vec<usize>) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Reference to the `index`-th element child
    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Walk up at most `levels` ancestors, nearest first
    pub fn ancestors(&self, levels: usize) -> Vec<Self> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(node) = current {
            if out.len() == levels {
                break;
            }
            current = node.parent();
            out.push(node);
        }
        out
    }

    /// True if `self` lies strictly inside `ancestor`
    pub fn is_descendant_of(&self, ancestor: &NodeRef) -> bool {
        self.0.len() > ancestor.0.len() && self.0.starts_with(&ancestor.0)
    }

    /// JSON array form consumed by the injected scripts
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body")?;
        for index in &self.0 {
            write!(f, ">{}", index)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_and_parent() {
        let node = NodeRef::root().child(2).child(0);
        assert_eq!(node.path(), &[2, 0]);
        assert_eq!(node.parent(), Some(NodeRef::from_path(vec![2])));
        assert_eq!(NodeRef::root().parent(), None);
    }

    #[test]
    fn test_ancestors_are_bounded() {
        let node = NodeRef::from_path(vec![1, 2, 3, 4, 5]);
        let ancestors = node.ancestors(3);
        assert_eq!(ancestors.len(), 3);
        assert_eq!(ancestors[0].path(), &[1, 2, 3, 4]);
        assert_eq!(ancestors[2].path(), &[1, 2]);

        let shallow = NodeRef::from_path(vec![7]);
        assert_eq!(shallow.ancestors(3), vec![NodeRef::root()]);
    }

    #[test]
    fn test_is_descendant_of() {
        let parent = NodeRef::from_path(vec![0, 1]);
        assert!(NodeRef::from_path(vec![0, 1, 4]).is_descendant_of(&parent));
        assert!(!parent.is_descendant_of(&parent));
        assert!(!NodeRef::from_path(vec![0, 2, 1]).is_descendant_of(&parent));
    }

    #[test]
    fn test_display_and_json() {
        let node = NodeRef::from_path(vec![3, 1]);
        assert_eq!(node.to_string(), "body>3>1");
        assert_eq!(node.to_json(), "[3,1]");
    }
}
