use crate::dom::node_ref::NodeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Represents a DOM element node captured in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementNode {
    /// HTML tag name, lowercased (e.g., "div", "button", "svg")
    pub tag_name: String,

    /// Element attributes (e.g., id, class, aria-label, etc.)
    #[serde(default)]
    pub attributes: HashMap<String, String>,

    /// Text of the element's own text-node children
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,

    /// Text of all descendant text nodes in document order, as the page
    /// reports it; script-like elements contribute nothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,

    /// Child elements, in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementNode>,

    /// Whether the element is rendered (non-zero box, not hidden by style)
    #[serde(default)]
    pub is_visible: bool,

    /// Whether the element reports itself disabled
    #[serde(default)]
    pub is_disabled: bool,

    /// Whether the element is interactive (clickable, input, etc.)
    #[serde(default)]
    pub is_interactive: bool,

    /// Bounding box information (x, y, width, height)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,

    /// Computed style; absent when style access threw in the page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ComputedStyle>,

    /// Position of this element in the snapshot, assigned by `DomTree`
    #[serde(skip)]
    pub node_ref: NodeRef,
}

/// Bounding box coordinates for an element
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The computed-style properties the heuristics read
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ComputedStyle {
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub visibility: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub background_color: String,
    #[serde(default)]
    pub border_color: String,
}

impl ElementNode {
    /// Create a new ElementNode
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            attributes: HashMap::new(),
            text_content: None,
            full_text: None,
            children: Vec::new(),
            is_visible: false,
            is_disabled: false,
            is_interactive: false,
            bounding_box: None,
            style: None,
            node_ref: NodeRef::root(),
        }
    }

    /// Builder method: set attributes
    pub fn with_attributes(mut self, attributes: HashMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Builder method: add one attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_attribute(key, value);
        self
    }

    /// Builder method: set text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    /// Builder method: set the document-order text of the whole subtree
    pub fn with_full_text(mut self, text: impl Into<String>) -> Self {
        self.full_text = Some(text.into());
        self
    }

    /// Builder method: set children
    pub fn with_children(mut self, children: Vec<ElementNode>) -> Self {
        self.children = children;
        self
    }

    /// Builder method: set visibility
    pub fn with_visibility(mut self, visible: bool) -> Self {
        self.is_visible = visible;
        self
    }

    /// Builder method: set disabled state
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.is_disabled = disabled;
        self
    }

    /// Builder method: set bounding box
    pub fn with_bounding_box(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.bounding_box = Some(BoundingBox { x, y, width, height });
        self
    }

    /// Builder method: set computed style
    pub fn with_style(mut self, style: ComputedStyle) -> Self {
        self.style = Some(style);
        self
    }

    /// Add a single attribute
    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Add a child element
    pub fn add_child(&mut self, child: ElementNode) {
        self.children.push(child);
    }

    /// Get attribute value by key
    pub fn get_attribute(&self, key: &str) -> Option<&String> {
        self.attributes.get(key)
    }

    /// Case-insensitive substring test against the raw class attribute
    pub fn class_contains(&self, needle: &str) -> bool {
        self.attributes
            .get("class")
            .is_some_and(|classes| classes.to_lowercase().contains(&needle.to_lowercase()))
    }

    /// Get element ID
    pub fn id(&self) -> Option<&String> {
        self.attributes.get("id")
    }

    /// Check if element is a specific tag
    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }

    /// Determine if this element should be considered interactive
    pub fn compute_interactivity(&mut self) {
        let interactive_tags = ["button", "a", "input", "select", "textarea", "label"];

        let tag_is_interactive = interactive_tags.iter().any(|&tag| self.is_tag(tag));

        // Inline handlers count as interactive
        let has_event_handler = self.attributes.keys().any(|k| k.starts_with("on"));

        let has_clickable_role = self
            .get_attribute("role")
            .is_some_and(|r| ["button", "link", "tab", "menuitem"].contains(&r.as_str()));

        self.is_interactive = tag_is_interactive || has_event_handler || has_clickable_role;
    }

    /// A `<button>` or an element with `role="button"`
    pub fn is_button(&self) -> bool {
        self.is_tag("button") || self.get_attribute("role").is_some_and(|r| r == "button")
    }

    /// Disabled through the DOM property or `aria-disabled`
    pub fn is_effectively_disabled(&self) -> bool {
        self.is_disabled || self.get_attribute("aria-disabled").is_some_and(|v| v == "true")
    }

    /// Hidden via `display: none` or `visibility: hidden`
    pub fn is_hidden_by_style(&self) -> bool {
        self.style
            .as_ref()
            .is_some_and(|s| s.display == "none" || s.visibility == "hidden")
    }

    /// Text of this element and its descendants.
    ///
    /// Page snapshots carry `full_text`, which keeps text and inline elements
    /// interleaved in document order. Trees built without it fall back to the
    /// element's own text followed by each child's text.
    pub fn text(&self) -> String {
        if let Some(full) = &self.full_text {
            return full.clone();
        }
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(full) = &self.full_text {
            out.push_str(full);
            return;
        }
        if let Some(text) = &self.text_content {
            out.push_str(text);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Copy of this element without its children
    pub(crate) fn shallow_clone(&self) -> ElementNode {
        ElementNode {
            tag_name: self.tag_name.clone(),
            attributes: self.attributes.clone(),
            text_content: self.text_content.clone(),
            full_text: self.full_text.clone(),
            children: Vec::new(),
            is_visible: self.is_visible,
            is_disabled: self.is_disabled,
            is_interactive: self.is_interactive,
            bounding_box: self.bounding_box,
            style: self.style.clone(),
            node_ref: self.node_ref.clone(),
        }
    }

    /// Whether this element is itself an icon graphic
    pub fn is_icon(&self) -> bool {
        if matches!(self.tag_name.as_str(), "svg" | "img" | "mat-icon") {
            return true;
        }
        (self.is_tag("i") || self.is_tag("span"))
            && (self.class_contains("icon") || self.class_contains("material-symbols"))
    }

    /// Whether any descendant (or the element itself) is an icon graphic
    pub fn has_icon(&self) -> bool {
        self.is_icon() || self.children.iter().any(|c| c.has_icon())
    }

    /// Whether an icon with both sides in `min..=max` pixels lies inside
    pub fn has_icon_sized(&self, min: f64, max: f64) -> bool {
        let sized = self.is_icon()
            && self.bounding_box.is_some_and(|b| {
                (min..=max).contains(&b.width) && (min..=max).contains(&b.height)
            });
        sized || self.children.iter().any(|c| c.has_icon_sized(min, max))
    }

    /// Convert to a simplified string representation
    pub fn to_simple_string(&self) -> String {
        let mut parts = vec![format!("<{}", self.tag_name)];

        if let Some(id) = self.id() {
            parts.push(format!(" id=\"{}\"", id));
        }

        if let Some(class) = self.attributes.get("class") {
            parts.push(format!(" class=\"{}\"", class));
        }

        if let Some(label) = self.attributes.get("aria-label") {
            parts.push(format!(" aria-label=\"{}\"", label));
        }

        parts.push(">".to_string());

        let text = self.text();
        let text = text.trim();
        if !text.is_empty() {
            let truncated: String = text.chars().take(60).collect();
            parts.push(truncated);
        }

        parts.join("")
    }
}

impl BoundingBox {
    /// Create a new BoundingBox
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Check if the bounding box is visible (has non-zero dimensions)
    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}
