//! A small subset of CSS selector syntax evaluated against snapshot nodes.
//!
//! Supported: a compound selector made of an optional tag (or `*`) followed by
//! any number of attribute conditions, `.class` or `#id` shorthands, e.g.
//! `button[aria-label*="rerun" i]`, `[role="button"][title]` or
//! `div.chat-message`. Selector lists (`a, b`) are split by
//! [`Selector::parse_list`]. Combinators and pseudo-classes are rejected.

use crate::dom::element::ElementNode;
use crate::error::{RerunError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Contains,
    Prefix,
    Suffix,
    Word,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrCondition {
    name: String,
    op: AttrOp,
    value: String,
    case_insensitive: bool,
}

impl AttrCondition {
    fn matches(&self, node: &ElementNode) -> bool {
        let Some(actual) = node.get_attribute(&self.name) else {
            return false;
        };
        if self.op == AttrOp::Exists {
            return true;
        }
        let (actual, expected) = if self.case_insensitive {
            (actual.to_lowercase(), self.value.to_lowercase())
        } else {
            (actual.clone(), self.value.clone())
        };
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == expected,
            AttrOp::Contains => !expected.is_empty() && actual.contains(&expected),
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(&expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(&expected),
            AttrOp::Word => actual.split_whitespace().any(|w| w == expected),
        }
    }
}

/// A parsed compound selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    tag: Option<String>,
    conditions: Vec<AttrCondition>,
}

impl Selector {
    /// Parse a single compound selector
    pub fn parse(input: &str) -> Result<Self> {
        let source = input.trim();
        let invalid = |reason: &str| RerunError::InvalidSelector {
            selector: source.to_string(),
            reason: reason.to_string(),
        };

        if source.is_empty() {
            return Err(invalid("empty selector"));
        }

        let chars: Vec<char> = source.chars().collect();
        let mut pos = 0;

        let tag = if chars[0] == '*' {
            pos = 1;
            None
        } else {
            let start = pos;
            while pos < chars.len() && is_ident_char(chars[pos]) {
                pos += 1;
            }
            if pos == start {
                None
            } else {
                Some(chars[start..pos].iter().collect::<String>().to_lowercase())
            }
        };

        let mut conditions = Vec::new();
        while pos < chars.len() {
            match chars[pos] {
                '[' => {
                    let (condition, next) = parse_condition(&chars, pos + 1).map_err(|reason| invalid(&reason))?;
                    conditions.push(condition);
                    pos = next;
                }
                shorthand @ ('.' | '#') => {
                    pos += 1;
                    let start = pos;
                    while pos < chars.len() && is_ident_char(chars[pos]) {
                        pos += 1;
                    }
                    if pos == start {
                        return Err(invalid(&format!("expected a name after '{}'", shorthand)));
                    }
                    let value: String = chars[start..pos].iter().collect();
                    let (name, op) = if shorthand == '.' { ("class", AttrOp::Word) } else { ("id", AttrOp::Equals) };
                    conditions.push(AttrCondition { name: name.to_string(), op, value, case_insensitive: false });
                }
                c => return Err(invalid(&format!("unexpected '{}' at offset {}", c, pos))),
            }
        }

        if tag.is_none() && conditions.is_empty() && chars[0] != '*' {
            return Err(invalid("no tag or attribute condition"));
        }

        Ok(Self { source: source.to_string(), tag, conditions })
    }

    /// Parse a comma separated selector list
    pub fn parse_list(input: &str) -> Result<Vec<Self>> {
        split_list(input).iter().map(|part| Self::parse(part)).collect()
    }

    /// Original selector text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `node` satisfies the tag and every attribute condition
    pub fn matches(&self, node: &ElementNode) -> bool {
        if let Some(tag) = &self.tag {
            if !node.is_tag(tag) {
                return false;
            }
        }
        self.conditions.iter().all(|c| c.matches(node))
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Split on commas that sit outside brackets and quotes
fn split_list(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    parts.push(current);
    parts
}

fn skip_ws(chars: &[char], mut pos: usize) -> usize {
    while pos < chars.len() && chars[pos].is_whitespace() {
        pos += 1;
    }
    pos
}

/// Parse the inside of `[...]` starting right after the `[`; returns the
/// condition and the offset after the closing `]`
fn parse_condition(chars: &[char], mut pos: usize) -> std::result::Result<(AttrCondition, usize), String> {
    pos = skip_ws(chars, pos);
    let start = pos;
    while pos < chars.len() && is_ident_char(chars[pos]) {
        pos += 1;
    }
    if pos == start {
        return Err("missing attribute name".to_string());
    }
    let name: String = chars[start..pos].iter().collect::<String>().to_lowercase();
    pos = skip_ws(chars, pos);

    if pos >= chars.len() {
        return Err("unterminated attribute condition".to_string());
    }

    if chars[pos] == ']' {
        let condition = AttrCondition { name, op: AttrOp::Exists, value: String::new(), case_insensitive: false };
        return Ok((condition, pos + 1));
    }

    let op = match chars[pos] {
        '=' => {
            pos += 1;
            AttrOp::Equals
        }
        c @ ('*' | '^' | '$' | '~') => {
            if chars.get(pos + 1) != Some(&'=') {
                return Err(format!("expected '=' after '{}'", c));
            }
            pos += 2;
            match c {
                '*' => AttrOp::Contains,
                '^' => AttrOp::Prefix,
                '$' => AttrOp::Suffix,
                _ => AttrOp::Word,
            }
        }
        c => return Err(format!("unsupported operator '{}'", c)),
    };

    pos = skip_ws(chars, pos);
    let value = match chars.get(pos) {
        Some(&q @ ('"' | '\'')) => {
            pos += 1;
            let start = pos;
            while pos < chars.len() && chars[pos] != q {
                pos += 1;
            }
            if pos >= chars.len() {
                return Err("unterminated string".to_string());
            }
            let value: String = chars[start..pos].iter().collect();
            pos += 1;
            value
        }
        Some(_) => {
            let start = pos;
            while pos < chars.len() && is_ident_char(chars[pos]) {
                pos += 1;
            }
            if pos == start {
                return Err("missing attribute value".to_string());
            }
            chars[start..pos].iter().collect()
        }
        None => return Err("missing attribute value".to_string()),
    };

    pos = skip_ws(chars, pos);
    let mut case_insensitive = false;
    if matches!(chars.get(pos), Some('i') | Some('I')) {
        case_insensitive = true;
        pos = skip_ws(chars, pos + 1);
    }

    if chars.get(pos) != Some(&']') {
        return Err("expected ']'".to_string());
    }

    Ok((AttrCondition { name, op, value, case_insensitive }, pos + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rerun_button() -> ElementNode {
        ElementNode::new("button")
            .with_attribute("aria-label", "Rerun generation")
            .with_attribute("class", "mat-icon-button run-btn")
    }

    #[test]
    fn test_contains_case_insensitive() {
        let selector = Selector::parse(r#"button[aria-label*="rerun" i]"#).unwrap();
        assert!(selector.matches(&rerun_button()));

        let strict = Selector::parse(r#"button[aria-label*="rerun"]"#).unwrap();
        assert!(!strict.matches(&rerun_button()));
    }

    #[test]
    fn test_tag_must_match() {
        let selector = Selector::parse(r#"a[aria-label*="Rerun"]"#).unwrap();
        assert!(!selector.matches(&rerun_button()));
    }

    #[test]
    fn test_compound_conditions() {
        let node = ElementNode::new("div").with_attribute("role", "button").with_attribute("title", "Retry");
        let selector = Selector::parse(r#"[role="button"][title^='re' i]"#).unwrap();
        assert!(selector.matches(&node));

        let exists = Selector::parse("div[title]").unwrap();
        assert!(exists.matches(&node));
        assert!(!Selector::parse("div[aria-label]").unwrap().matches(&node));
    }

    #[test]
    fn test_word_and_suffix() {
        let node = rerun_button();
        assert!(Selector::parse("button[class~=run-btn]").unwrap().matches(&node));
        assert!(!Selector::parse("button[class~=run]").unwrap().matches(&node));
        assert!(Selector::parse(r#"[aria-label$="generation"]"#).unwrap().matches(&node));
    }

    #[test]
    fn test_class_and_id_shorthand() {
        let node = ElementNode::new("div").with_attribute("class", "chat-message model").with_attribute("id", "turn-3");
        assert!(Selector::parse(".chat-message").unwrap().matches(&node));
        assert!(Selector::parse("div.model#turn-3").unwrap().matches(&node));
        assert!(!Selector::parse(".chat").unwrap().matches(&node));
        assert!(!Selector::parse("#turn").unwrap().matches(&node));
        assert!(Selector::parse("div.").is_err());
    }

    #[test]
    fn test_universal() {
        let selector = Selector::parse("*").unwrap();
        assert!(selector.matches(&ElementNode::new("span")));
    }

    #[test]
    fn test_invalid_selectors() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse("button > svg").is_err());
        assert!(Selector::parse("button[aria-label").is_err());
        assert!(Selector::parse(r#"button[aria-label*="rerun]"#).is_err());
        assert!(Selector::parse("button:hover").is_err());
        assert!(Selector::parse("button[aria-label|=x]").is_err());
    }

    #[test]
    fn test_parse_list() {
        let list = Selector::parse_list(r#"button[title*="a,b"], [role="button"]"#).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].as_str(), r#"button[title*="a,b"]"#);
        assert_eq!(list[1].as_str(), r#"[role="button"]"#);

        assert!(Selector::parse_list(r#"[role="main"], button > svg"#).is_err());
    }
}
