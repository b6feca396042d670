//! Flat element model and a compound-CSS matcher for the simulated pages.
//!
//! Supported: tag or `*`, `.class`, `#id`, `[attr]`, `[attr="v"]`,
//! `[attr*="v"]`, `[attr^="v"]`, `[attr$="v"]`. Combinators, pseudo-classes
//! and XPath never match, which is what exercises the fallback chains.

use std::collections::BTreeMap;

use crate::driver::ElementHandle;
use crate::locator::Selector;

/// One rendered element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    /// Handle identifier given to the driver's callers
    pub key: String,
    /// Lowercase tag name
    pub tag: String,
    /// Class list
    pub classes: Vec<String>,
    /// Attributes, including `id`
    pub attrs: BTreeMap<String, String>,
    /// Text content
    pub text: String,
    /// Rendered and not hidden
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
    /// Form control value
    pub value: Option<String>,
}

impl MockElement {
    /// Create a visible, enabled element
    #[must_use]
    pub fn new(key: impl Into<String>, tag: &str) -> Self {
        Self {
            key: key.into(),
            tag: tag.to_ascii_lowercase(),
            classes: Vec::new(),
            attrs: BTreeMap::new(),
            text: String::new(),
            visible: true,
            enabled: true,
            value: None,
        }
    }

    /// Add whitespace-separated classes
    #[must_use]
    pub fn class(mut self, classes: &str) -> Self {
        self.classes
            .extend(classes.split_whitespace().map(str::to_string));
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    /// Set the text content
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the form value
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set enabled state
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Summary handed to driver callers
    #[must_use]
    pub fn handle(&self) -> ElementHandle {
        ElementHandle {
            id: self.key.clone(),
            tag_name: self.tag.clone(),
            text: self.text.clone(),
            visible: self.visible,
            enabled: self.enabled,
            value: self.value.clone(),
        }
    }

    /// Whether the element matches a selector
    #[must_use]
    pub fn matches(&self, selector: &Selector) -> bool {
        match selector {
            Selector::Css(css) => matches_css(css, self),
            Selector::TestId(id) => self.attrs.get("data-testid") == Some(id),
            Selector::Text(text) => self.text.contains(text.as_str()),
            Selector::CssWithText { css, text } => {
                matches_css(css, self) && self.text.contains(text.as_str())
            }
            Selector::XPath(_) => false,
        }
    }
}

/// Elements matching a selector, in document order
#[must_use]
pub fn select<'a>(elements: &'a [MockElement], selector: &Selector) -> Vec<&'a MockElement> {
    elements.iter().filter(|e| e.matches(selector)).collect()
}

#[derive(Debug, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Contains(String),
    Prefix(String),
    Suffix(String),
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<(String, AttrOp)>,
}

fn is_ident(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn read_ident(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !is_ident(c)).unwrap_or(s.len());
    s.split_at(end)
}

fn unquote(v: &str) -> &str {
    let v = v.trim();
    for q in ['"', '\''] {
        if let Some(inner) = v.strip_prefix(q).and_then(|r| r.strip_suffix(q)) {
            return inner;
        }
    }
    v
}

fn parse_attr(inner: &str) -> Option<(String, AttrOp)> {
    let (name, rest) = read_ident(inner.trim());
    if name.is_empty() {
        return None;
    }
    let rest = rest.trim();
    let op = if rest.is_empty() {
        AttrOp::Exists
    } else if let Some(v) = rest.strip_prefix("*=") {
        AttrOp::Contains(unquote(v).to_string())
    } else if let Some(v) = rest.strip_prefix("^=") {
        AttrOp::Prefix(unquote(v).to_string())
    } else if let Some(v) = rest.strip_prefix("$=") {
        AttrOp::Suffix(unquote(v).to_string())
    } else if let Some(v) = rest.strip_prefix('=') {
        AttrOp::Equals(unquote(v).to_string())
    } else {
        return None;
    };
    Some((name.to_string(), op))
}

fn closing_bracket(s: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, ']') => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_compound(selector: &str) -> Option<Compound> {
    let mut compound = Compound::default();
    let mut rest = selector.trim();
    if rest.is_empty() {
        return None;
    }

    if let Some(r) = rest.strip_prefix('*') {
        rest = r;
    } else {
        let (tag, r) = read_ident(rest);
        if !tag.is_empty() {
            compound.tag = Some(tag.to_ascii_lowercase());
            rest = r;
        }
    }

    while let Some(c) = rest.chars().next() {
        match c {
            '.' | '#' => {
                let (ident, r) = read_ident(&rest[1..]);
                if ident.is_empty() {
                    return None;
                }
                if c == '.' {
                    compound.classes.push(ident.to_string());
                } else {
                    compound.ids.push(ident.to_string());
                }
                rest = r;
            }
            '[' => {
                let end = closing_bracket(&rest[1..])? + 1;
                compound.attrs.push(parse_attr(&rest[1..end])?);
                rest = &rest[end + 1..];
            }
            _ => return None,
        }
    }
    Some(compound)
}

fn matches_css(selector: &str, element: &MockElement) -> bool {
    let Some(compound) = parse_compound(selector) else {
        return false;
    };
    if compound.tag.as_ref().is_some_and(|t| *t != element.tag) {
        return false;
    }
    if !compound
        .ids
        .iter()
        .all(|id| element.attrs.get("id") == Some(id))
    {
        return false;
    }
    if !compound
        .classes
        .iter()
        .all(|c| element.classes.iter().any(|have| have == c))
    {
        return false;
    }
    compound.attrs.iter().all(|(name, op)| {
        let Some(actual) = element.attrs.get(name) else {
            return false;
        };
        match op {
            AttrOp::Exists => true,
            AttrOp::Equals(v) => actual == v,
            AttrOp::Contains(v) => actual.contains(v.as_str()),
            AttrOp::Prefix(v) => actual.starts_with(v.as_str()),
            AttrOp::Suffix(v) => actual.ends_with(v.as_str()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email_input() -> MockElement {
        MockElement::new("email", "input")
            .attr("id", "email")
            .attr("name", "email")
            .attr("placeholder", "Email address")
            .class("MuiFilledInput-input MuiInputBase-input")
    }

    #[test]
    fn test_compound_matching() {
        let el = email_input();
        assert!(el.matches(&Selector::css("input")));
        assert!(el.matches(&Selector::css("*")));
        assert!(el.matches(&Selector::css("#email")));
        assert!(el.matches(&Selector::css(r#"input[name="email"]"#)));
        assert!(el.matches(&Selector::css(r#"input[placeholder*="Email"]"#)));
        assert!(el.matches(&Selector::css("input[placeholder^='Email']")));
        assert!(el.matches(&Selector::css(".MuiFilledInput-input.MuiInputBase-input")));
        assert!(!el.matches(&Selector::css(r#"input[autocomplete="username"]"#)));
        assert!(!el.matches(&Selector::css("button")));
    }

    #[test]
    fn test_combinators_and_pseudo_never_match() {
        let el = email_input();
        assert!(!el.matches(&Selector::css("form input")));
        assert!(!el.matches(&Selector::css("form > input")));
        assert!(!el.matches(&Selector::css("input:focus")));
        assert!(!el.matches(&Selector::xpath("//input")));
    }

    #[test]
    fn test_text_selectors() {
        let el = MockElement::new("err", "p")
            .class("MuiFormHelperText-root Mui-error")
            .text("Invalid Email");
        assert!(el.matches(&Selector::css_with_text("p", "Invalid Email")));
        assert!(el.matches(&Selector::css_with_text("*", "Invalid")));
        assert!(!el.matches(&Selector::css_with_text("span", "Invalid Email")));
        assert!(el.matches(&Selector::text("Email")));
        let tagged = MockElement::new("b", "button").attr("data-testid", "signin-button");
        assert!(tagged.matches(&Selector::test_id("signin-button")));
    }

    #[test]
    fn test_select_keeps_document_order() {
        let elements = vec![
            MockElement::new("a1", "a").attr("href", "/dashboard/wisescore"),
            MockElement::new("x", "span"),
            MockElement::new("a2", "a").attr("href", "/dashboard/wisescore"),
        ];
        let hits = select(&elements, &Selector::css(r#"a[href="/dashboard/wisescore"]"#));
        let keys: Vec<&str> = hits.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a1", "a2"]);
    }
}
