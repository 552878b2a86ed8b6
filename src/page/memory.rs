use crate::dom::{DomTree, ElementNode, NodeRef};
use crate::error::{RerunError, Result};
use crate::page::{ClickMethod, MutationRecord, ObserverHandle, Page, RecoveryStatus};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};

type PageHandler = Box<dyn FnMut(&mut ElementNode, &NodeRef)>;

struct MemoryState {
    url: String,
    root: ElementNode,
    observers: BTreeMap<ObserverHandle, Vec<MutationRecord>>,
    next_handle: u64,
    clicks: Vec<(NodeRef, ClickMethod)>,
    hovers: Vec<NodeRef>,
    failing_methods: HashSet<ClickMethod>,
    fail_snapshots: bool,
    status: Option<RecoveryStatus>,
    on_click: Option<PageHandler>,
    on_hover: Option<PageHandler>,
}

/// An in-memory page.
///
/// Holds a `<body>` tree that can be edited between polls. Edits made through
/// [`MemoryPage::insert`] are reported to installed observers the way the
/// injected observer reports them, clicks and hovers are recorded, and click
/// or hover handlers can mutate the tree to emulate the application reacting.
pub struct MemoryPage {
    state: RefCell<MemoryState>,
}

impl MemoryPage {
    pub fn new(root: ElementNode) -> Self {
        Self {
            state: RefCell::new(MemoryState {
                url: "about:blank".to_string(),
                root,
                observers: BTreeMap::new(),
                next_handle: 1,
                clicks: Vec::new(),
                hovers: Vec::new(),
                failing_methods: HashSet::new(),
                fail_snapshots: false,
                status: None,
                on_click: None,
                on_hover: None,
            }),
        }
    }

    /// Builder method: set the document URL
    pub fn with_url(self, url: impl Into<String>) -> Self {
        self.state.borrow_mut().url = url.into();
        self
    }

    /// Replace the document URL; like a real navigation this drops observers
    pub fn navigate(&self, url: impl Into<String>) {
        let mut state = self.state.borrow_mut();
        state.url = url.into();
        state.observers.clear();
    }

    /// Append `node` under `parent`, reporting a child-list change
    pub fn insert(&self, parent: &NodeRef, node: ElementNode) -> Option<NodeRef> {
        let mut state = self.state.borrow_mut();
        let parent_node = resolve_mut(&mut state.root, parent)?;
        parent_node.children.push(node);
        let added = parent.child(parent_node.children.len() - 1);

        let record = MutationRecord::child_list(parent.clone(), vec![added.clone()]);
        for queue in state.observers.values_mut() {
            queue.push(record.clone());
        }
        Some(added)
    }

    /// Remove the element at `node`
    pub fn remove(&self, node: &NodeRef) -> Option<ElementNode> {
        let mut state = self.state.borrow_mut();
        remove_node(&mut state.root, node)
    }

    /// Run `handler` on the tree after every successful click
    pub fn on_click<F>(&self, handler: F)
    where
        F: FnMut(&mut ElementNode, &NodeRef) + 'static,
    {
        self.state.borrow_mut().on_click = Some(Box::new(handler));
    }

    /// Run `handler` on the tree after every successful hover
    pub fn on_hover<F>(&self, handler: F)
    where
        F: FnMut(&mut ElementNode, &NodeRef) + 'static,
    {
        self.state.borrow_mut().on_hover = Some(Box::new(handler));
    }

    /// Make a click method fail as if the page rejected it
    pub fn fail_click_method(&self, method: ClickMethod) {
        self.state.borrow_mut().failing_methods.insert(method);
    }

    pub fn fail_snapshots(&self, fail: bool) {
        self.state.borrow_mut().fail_snapshots = fail;
    }

    /// Successful clicks, in order
    pub fn clicks(&self) -> Vec<(NodeRef, ClickMethod)> {
        self.state.borrow().clicks.clone()
    }

    pub fn hovers(&self) -> Vec<NodeRef> {
        self.state.borrow().hovers.clone()
    }

    pub fn status(&self) -> Option<RecoveryStatus> {
        self.state.borrow().status
    }

    pub fn observer_count(&self) -> usize {
        self.state.borrow().observers.len()
    }

    /// Copy of the current tree
    pub fn root(&self) -> ElementNode {
        self.state.borrow().root.clone()
    }
}

fn resolve_mut<'a>(root: &'a mut ElementNode, node: &NodeRef) -> Option<&'a mut ElementNode> {
    node.path().iter().try_fold(root, |current, &i| current.children.get_mut(i))
}

fn remove_node(root: &mut ElementNode, node: &NodeRef) -> Option<ElementNode> {
    let parent = node.parent()?;
    let index = *node.path().last()?;
    let parent_node = resolve_mut(root, &parent)?;
    if index < parent_node.children.len() {
        Some(parent_node.children.remove(index))
    } else {
        None
    }
}

impl Page for MemoryPage {
    fn url(&self) -> Result<String> {
        Ok(self.state.borrow().url.clone())
    }

    fn snapshot(&self) -> Result<DomTree> {
        let state = self.state.borrow();
        if state.fail_snapshots {
            return Err(RerunError::EvaluationFailed("Snapshot disabled for this page".to_string()));
        }
        Ok(DomTree::new(state.root.clone()))
    }

    fn install_observer(&self) -> Result<ObserverHandle> {
        let mut state = self.state.borrow_mut();
        let handle = ObserverHandle(state.next_handle);
        state.next_handle += 1;
        state.observers.insert(handle, Vec::new());
        Ok(handle)
    }

    fn drain_mutations(&self, handle: ObserverHandle) -> Result<Option<Vec<MutationRecord>>> {
        let mut state = self.state.borrow_mut();
        Ok(state.observers.get_mut(&handle).map(std::mem::take))
    }

    fn disconnect_observer(&self, handle: ObserverHandle) -> Result<()> {
        self.state.borrow_mut().observers.remove(&handle);
        Ok(())
    }

    fn hover(&self, node: &NodeRef) -> Result<()> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;

        if resolve_mut(&mut state.root, node).is_none() {
            return Err(RerunError::ElementNotFound(format!("No element at {}", node)));
        }
        state.hovers.push(node.clone());
        if let Some(handler) = state.on_hover.as_mut() {
            handler(&mut state.root, node);
        }
        Ok(())
    }

    fn click(&self, node: &NodeRef, method: ClickMethod) -> Result<()> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;

        if resolve_mut(&mut state.root, node).is_none() {
            return Err(RerunError::ElementNotFound(format!("No element at {}", node)));
        }
        if state.failing_methods.contains(&method) {
            return Err(RerunError::InteractionFailed {
                method: method.to_string(),
                reason: "rejected by page".to_string(),
            });
        }

        state.clicks.push((node.clone(), method));
        if let Some(handler) = state.on_click.as_mut() {
            handler(&mut state.root, node);
        }
        Ok(())
    }

    fn show_status(&self, status: RecoveryStatus) -> Result<()> {
        self.state.borrow_mut().status = Some(status);
        Ok(())
    }

    fn clear_status(&self) -> Result<()> {
        self.state.borrow_mut().status = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> MemoryPage {
        let root = ElementNode::new("body").with_children(vec![ElementNode::new("main")]);
        MemoryPage::new(root).with_url("https://aistudio.google.com/prompts/new_chat")
    }

    #[test]
    fn test_insert_reports_to_observers() {
        let page = page();
        let handle = page.install_observer().unwrap();

        let added = page.insert(&NodeRef::from_path(vec![0]), ElementNode::new("div")).unwrap();
        assert_eq!(added, NodeRef::from_path(vec![0, 0]));

        let records = page.drain_mutations(handle).unwrap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].inspect_targets(), vec![added]);
        assert!(page.drain_mutations(handle).unwrap().unwrap().is_empty());
    }

    #[test]
    fn test_navigation_drops_observers() {
        let page = page();
        let handle = page.install_observer().unwrap();
        page.navigate("https://aistudio.google.com/library");

        assert_eq!(page.drain_mutations(handle).unwrap(), None);
        assert_eq!(page.observer_count(), 0);
    }

    #[test]
    fn test_click_runs_handler() {
        let page = page();
        page.on_click(|root, _| {
            root.children.clear();
        });

        page.click(&NodeRef::from_path(vec![0]), ClickMethod::Native).unwrap();
        assert_eq!(page.clicks().len(), 1);
        assert!(page.root().children.is_empty());
    }

    #[test]
    fn test_hover_runs_handler() {
        let page = page();
        page.on_hover(|root, node| {
            if let Some(target) = node.path().first().and_then(|&i| root.children.get_mut(i)) {
                target.add_child(ElementNode::new("button"));
            }
        });

        page.hover(&NodeRef::from_path(vec![0])).unwrap();
        assert_eq!(page.hovers(), vec![NodeRef::from_path(vec![0])]);
        assert_eq!(page.root().children[0].children.len(), 1);
        assert!(page.clicks().is_empty());
    }

    #[test]
    fn test_failing_method_is_not_recorded() {
        let page = page();
        page.fail_click_method(ClickMethod::Native);

        let err = page.click(&NodeRef::from_path(vec![0]), ClickMethod::Native).unwrap_err();
        assert!(matches!(err, RerunError::InteractionFailed { .. }));
        assert!(page.clicks().is_empty());
        assert!(page.click(&NodeRef::from_path(vec![0]), ClickMethod::MouseEvent).is_ok());
    }

    #[test]
    fn test_missing_element() {
        let page = page();
        assert!(matches!(page.click(&NodeRef::from_path(vec![9]), ClickMethod::Native), Err(RerunError::ElementNotFound(_))));
        assert!(page.hover(&NodeRef::from_path(vec![9])).is_err());
    }

    #[test]
    fn test_remove() {
        let page = page();
        let removed = page.remove(&NodeRef::from_path(vec![0])).unwrap();
        assert!(removed.is_tag("main"));
        assert!(page.remove(&NodeRef::root()).is_none());
    }
}
