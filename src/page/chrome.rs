use crate::browser::BrowserSession;
use crate::dom::{self, DomTree, NodeRef};
use crate::error::{RerunError, Result};
use crate::page::{ClickMethod, MutationRecord, ObserverHandle, Page, RecoveryStatus};
use headless_chrome::Tab;
use serde_json::Value;
use std::sync::Arc;

const OBSERVE_JS: &str = include_str!("js/observe.js");
const DRAIN_JS: &str = include_str!("js/drain.js");
const DISCONNECT_JS: &str = include_str!("js/disconnect.js");
const INTERACT_JS: &str = include_str!("js/interact.js");
const STATUS_JS: &str = include_str!("js/status.js");
const CLEAR_STATUS_JS: &str = r#"
    (function() {
        const dot = document.getElementById('auto-rerun-indicator');
        if (dot) { dot.remove(); }
        return true;
    })()
"#;

/// A Chrome tab driven over CDP
pub struct ChromePage {
    tab: Arc<Tab>,
}

impl ChromePage {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }

    /// Attach to the session's active tab
    pub fn from_session(session: &BrowserSession) -> Result<Self> {
        Ok(Self::new(session.tab()?))
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    fn evaluate(&self, js: &str) -> Result<Option<Value>> {
        let result = self.tab.evaluate(js, false).map_err(|e| RerunError::EvaluationFailed(e.to_string()))?;
        Ok(result.value.filter(|v| !v.is_null()))
    }

    fn dispatch(&self, node: &NodeRef, action: &str) -> Result<()> {
        let action_literal = serde_json::to_string(action)?;
        let js = INTERACT_JS.replace("__PATH__", &node.to_json()).replace("__ACTION__", &action_literal);

        let outcome = self.evaluate(&js)?;
        match outcome.as_ref().and_then(Value::as_str) {
            Some("ok") => Ok(()),
            Some("missing") => Err(RerunError::ElementNotFound(format!("No element at {}", node))),
            Some(reason) => Err(RerunError::InteractionFailed { method: action.to_string(), reason: reason.to_string() }),
            None => Err(RerunError::InteractionFailed {
                method: action.to_string(),
                reason: "No value returned from interaction script".to_string(),
            }),
        }
    }
}

impl Page for ChromePage {
    fn url(&self) -> Result<String> {
        Ok(self.tab.get_url())
    }

    fn snapshot(&self) -> Result<DomTree> {
        dom::snapshot(&self.tab)
    }

    fn install_observer(&self) -> Result<ObserverHandle> {
        let value = self.evaluate(OBSERVE_JS)?;
        match value.as_ref().and_then(Value::as_u64) {
            Some(id) if id > 0 => Ok(ObserverHandle(id)),
            _ => Err(RerunError::EvaluationFailed("Document has no body to observe".to_string())),
        }
    }

    fn drain_mutations(&self, handle: ObserverHandle) -> Result<Option<Vec<MutationRecord>>> {
        let js = DRAIN_JS.replace("__HANDLE__", &handle.0.to_string());
        let Some(value) = self.evaluate(&js)? else {
            return Ok(None);
        };

        let json_str = value
            .as_str()
            .ok_or_else(|| RerunError::DomParseFailed("Mutation queue was not returned as a string".to_string()))?;
        let records: Vec<MutationRecord> = serde_json::from_str(json_str)
            .map_err(|e| RerunError::DomParseFailed(format!("Failed to parse mutation records: {}", e)))?;
        Ok(Some(records))
    }

    fn disconnect_observer(&self, handle: ObserverHandle) -> Result<()> {
        let js = DISCONNECT_JS.replace("__HANDLE__", &handle.0.to_string());
        self.evaluate(&js)?;
        Ok(())
    }

    fn hover(&self, node: &NodeRef) -> Result<()> {
        self.dispatch(node, "hover")
    }

    fn click(&self, node: &NodeRef, method: ClickMethod) -> Result<()> {
        self.dispatch(node, method.as_str())
    }

    fn show_status(&self, status: RecoveryStatus) -> Result<()> {
        let js = STATUS_JS
            .replace("__COLOR__", &serde_json::to_string(status.color())?)
            .replace("__TITLE__", &serde_json::to_string(status.title())?);
        self.evaluate(&js)?;
        Ok(())
    }

    fn clear_status(&self) -> Result<()> {
        self.evaluate(CLEAR_STATUS_JS)?;
        Ok(())
    }
}
