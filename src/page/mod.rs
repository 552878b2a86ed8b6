//! The DOM boundary
//!
//! Everything the watcher reads from or writes to a page goes through the
//! [`Page`] trait. [`ChromePage`] drives a real tab over CDP through injected
//! scripts; [`MemoryPage`] holds a snapshot in memory for offline scans and
//! tests.

pub mod chrome;
pub mod memory;

pub use chrome::ChromePage;
pub use memory::MemoryPage;

use crate::dom::{DomTree, NodeRef};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a mutation observer installed in the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObserverHandle(pub u64);

impl fmt::Display for ObserverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// Kind of DOM change reported by the observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    ChildList,
    Attributes,
    CharacterData,
}

/// One queued DOM change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationRecord {
    pub kind: MutationKind,

    /// Changed element; for character data, the text node's parent element
    #[serde(default)]
    pub target: Option<NodeRef>,

    /// Element nodes added by a child-list change
    #[serde(default)]
    pub added: Vec<NodeRef>,

    /// Attribute name for attribute changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl MutationRecord {
    pub fn child_list(target: NodeRef, added: Vec<NodeRef>) -> Self {
        Self { kind: MutationKind::ChildList, target: Some(target), added, attribute: None }
    }

    pub fn attributes(target: NodeRef, attribute: impl Into<String>) -> Self {
        Self { kind: MutationKind::Attributes, target: Some(target), added: Vec::new(), attribute: Some(attribute.into()) }
    }

    pub fn character_data(parent: NodeRef) -> Self {
        Self { kind: MutationKind::CharacterData, target: Some(parent), added: Vec::new(), attribute: None }
    }

    /// Elements whose subtrees should be classified for this change
    pub fn inspect_targets(&self) -> Vec<NodeRef> {
        match self.kind {
            MutationKind::ChildList => self.added.clone(),
            MutationKind::Attributes | MutationKind::CharacterData => self.target.iter().cloned().collect(),
        }
    }
}

/// Ways of delivering a click, tried in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickMethod {
    /// `HTMLElement.click()`
    Native,
    /// `dispatchEvent(new MouseEvent('click'))`
    MouseEvent,
    /// `dispatchEvent(new Event('click'))`
    GenericEvent,
}

impl ClickMethod {
    pub const ORDER: [ClickMethod; 3] = [ClickMethod::Native, ClickMethod::MouseEvent, ClickMethod::GenericEvent];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClickMethod::Native => "native",
            ClickMethod::MouseEvent => "mouse_event",
            ClickMethod::GenericEvent => "generic_event",
        }
    }
}

impl fmt::Display for ClickMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State shown by the in-page status indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStatus {
    Idle,
    Recovering,
    Recovered,
    Failed,
}

impl RecoveryStatus {
    pub fn color(&self) -> &'static str {
        match self {
            RecoveryStatus::Idle => "#9e9e9e",
            RecoveryStatus::Recovering => "#ffb300",
            RecoveryStatus::Recovered => "#43a047",
            RecoveryStatus::Failed => "#e53935",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            RecoveryStatus::Idle => "Auto-rerun: watching for failed generations",
            RecoveryStatus::Recovering => "Auto-rerun: recovering a failed generation",
            RecoveryStatus::Recovered => "Auto-rerun: last recovery succeeded",
            RecoveryStatus::Failed => "Auto-rerun: last recovery failed",
        }
    }
}

/// A page the watcher can observe and act on
pub trait Page {
    /// Current document URL
    fn url(&self) -> Result<String>;

    /// Fresh snapshot of `<body>`
    fn snapshot(&self) -> Result<DomTree>;

    /// Start observing `<body>` for child-list, attribute and text changes
    fn install_observer(&self) -> Result<ObserverHandle>;

    /// Take the changes queued since the last drain; `None` once the
    /// observer no longer exists (the document was replaced)
    fn drain_mutations(&self, handle: ObserverHandle) -> Result<Option<Vec<MutationRecord>>>;

    fn disconnect_observer(&self, handle: ObserverHandle) -> Result<()>;

    /// Dispatch pointer-enter style events at the element and its parent
    fn hover(&self, node: &NodeRef) -> Result<()>;

    fn click(&self, node: &NodeRef, method: ClickMethod) -> Result<()>;

    /// Draw or update the status indicator
    fn show_status(&self, status: RecoveryStatus) -> Result<()>;

    /// Remove the status indicator
    fn clear_status(&self) -> Result<()>;
}
