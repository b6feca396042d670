//! Locator registry: semantic element names mapped to selector fallback chains.
//!
//! Pages refer to elements by name (`sign_in.identifier_input`), never by raw
//! selector. Each name owns an ordered list of strategies; the wait engine
//! tries them in order on every poll and uses the first that matches, so a
//! markup change that breaks the preferred selector degrades to a fallback
//! instead of failing the suite.
//!
//! Selector strings may be written in the jQuery style used by most sign-in
//! suites: comma-separated alternatives and `:contains("text")` filters.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::result::{ProbeError, ProbeResult};

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Selector {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
    /// Innermost elements whose text contains the string
    Text(String),
    /// CSS selector filtered by contained text
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match
        text: String,
    },
    /// XPath selector
    XPath(String),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a CSS selector with a text filter
    #[must_use]
    pub fn css_with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self::CssWithText {
            css: css.into(),
            text: text.into(),
        }
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// JavaScript expression evaluating to an array of all matching elements
    #[must_use]
    pub fn to_query_all(&self) -> String {
        match self {
            Self::Css(s) => format!("Array.from(document.querySelectorAll({}))", js_string(s)),
            Self::TestId(id) => {
                let css = format!("[data-testid=\"{id}\"]");
                format!("Array.from(document.querySelectorAll({}))", js_string(&css))
            }
            Self::Text(t) => {
                let t = js_string(t);
                format!(
                    "Array.from(document.querySelectorAll('body *')).filter(el => el.textContent.includes({t}) && !Array.from(el.children).some(c => c.textContent.includes({t})))"
                )
            }
            Self::CssWithText { css, text } => format!(
                "Array.from(document.querySelectorAll({})).filter(el => el.textContent.includes({}))",
                js_string(css),
                js_string(text)
            ),
            Self::XPath(x) => format!(
                "(() => {{ const r = document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); return out; }})()",
                js_string(x)
            ),
        }
    }

    /// Parse a single selector string.
    ///
    /// Accepts `testid=`, `text=` and `xpath=` prefixes; anything else is CSS,
    /// with an optional `:contains("...")` filter.
    pub fn parse(input: &str) -> ProbeResult<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ProbeError::config("empty selector"));
        }
        if let Some(rest) = input.strip_prefix("testid=") {
            return Ok(Self::test_id(rest));
        }
        if let Some(rest) = input.strip_prefix("text=") {
            return Ok(Self::text(rest));
        }
        if let Some(rest) = input.strip_prefix("xpath=") {
            return Ok(Self::xpath(rest));
        }

        if let Some(caps) = contains_regex().captures(input) {
            let whole = caps
                .get(0)
                .ok_or_else(|| ProbeError::config(format!("invalid selector: {input}")))?;
            let text = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            let mut css = String::with_capacity(input.len());
            css.push_str(&input[..whole.start()]);
            css.push_str(&input[whole.end()..]);
            let css = css.trim();
            let css = if css.is_empty() { "*" } else { css };
            return Ok(Self::css_with_text(css, text));
        }

        Ok(Self::css(input))
    }

    /// Parse a comma-separated list of alternatives into a fallback chain.
    ///
    /// Commas inside quotes, brackets or parentheses do not split.
    pub fn parse_chain(input: &str) -> ProbeResult<Vec<Self>> {
        let chain = split_top_level(input)
            .into_iter()
            .map(Self::parse)
            .collect::<ProbeResult<Vec<_>>>()?;
        if chain.is_empty() {
            return Err(ProbeError::config("empty selector chain"));
        }
        Ok(chain)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "{s}"),
            Self::TestId(id) => write!(f, "testid={id}"),
            Self::Text(t) => write!(f, "text={t}"),
            Self::CssWithText { css, text } => write!(f, "{css}:contains(\"{text}\")"),
            Self::XPath(x) => write!(f, "xpath={x}"),
        }
    }
}

impl FromStr for Selector {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Selector {
    type Error = ProbeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        selector.to_string()
    }
}

#[allow(clippy::unwrap_used)]
fn contains_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#":contains\(\s*(?:"([^"]*)"|'([^']*)')\s*\)"#).unwrap()
    })
}

fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_owned()).to_string()
}

fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(input[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(input[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// How many elements a locator is expected to resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    /// Exactly one element; interaction targets
    #[default]
    ExactlyOne,
    /// One or more elements; lists, repeated labels
    AtLeastOne,
}

/// A named element with its ordered selector strategies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    /// Semantic name (e.g. `sign_in.identifier_input`)
    pub name: String,
    /// Strategies tried in order; the first with matches wins
    pub strategies: Vec<Selector>,
    /// Expected match count
    pub arity: Arity,
}

impl Locator {
    /// Create a locator from explicit strategies
    #[must_use]
    pub fn new(name: impl Into<String>, strategies: Vec<Selector>) -> Self {
        Self {
            name: name.into(),
            strategies,
            arity: Arity::ExactlyOne,
        }
    }

    /// Create a locator from a comma-separated selector chain
    pub fn from_chain(name: impl Into<String>, chain: &str) -> ProbeResult<Self> {
        Ok(Self::new(name, Selector::parse_chain(chain)?))
    }

    /// Relax the arity to one-or-more
    #[must_use]
    pub fn at_least_one(mut self) -> Self {
        self.arity = Arity::AtLeastOne;
        self
    }

    /// Set the arity
    #[must_use]
    pub const fn with_arity(mut self, arity: Arity) -> Self {
        self.arity = arity;
        self
    }

    /// Chain rendered the way it would be written in a selector file
    #[must_use]
    pub fn chain(&self) -> String {
        self.strategies
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Registry of semantic locators, loaded once per run and shared read-only
#[derive(Debug, Clone, Default)]
pub struct LocatorRegistry {
    locators: HashMap<String, Locator>,
}

impl LocatorRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a locator; a later registration of the same name replaces
    /// the earlier one, which is returned.
    pub fn register(&mut self, locator: Locator) -> Option<Locator> {
        self.locators.insert(locator.name.clone(), locator)
    }

    /// Register a locator from a selector chain string
    pub fn register_chain(&mut self, name: &str, chain: &str) -> ProbeResult<()> {
        let arity = self
            .locators
            .get(name)
            .map_or(Arity::ExactlyOne, |l| l.arity);
        self.register(Locator::from_chain(name, chain)?.with_arity(arity));
        Ok(())
    }

    /// Builder-style registration
    #[must_use]
    pub fn with(mut self, locator: Locator) -> Self {
        self.register(locator);
        self
    }

    /// Look up a locator by name
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&Locator> {
        self.locators.get(name)
    }

    /// Strategies for a name; unknown names have none and therefore never match
    #[must_use]
    pub fn strategies_for(&self, name: &str) -> &[Selector] {
        self.locators
            .get(name)
            .map_or(&[], |l| l.strategies.as_slice())
    }

    /// Registered names in sorted order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.locators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered locators
    #[must_use]
    pub fn len(&self) -> usize {
        self.locators.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }

    /// Overlay another registry on top of this one
    pub fn merge(&mut self, other: Self) {
        self.locators.extend(other.locators);
    }

    /// Replace chains from a name → selector-string map (configuration overrides)
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, String>) -> ProbeResult<()> {
        for (name, chain) in overrides {
            self.register_chain(name, chain)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod selector_tests {
        use super::*;

        #[test]
        fn test_parse_plain_css() {
            let s = Selector::parse(r#"input[name="email"]"#).unwrap();
            assert_eq!(s, Selector::css(r#"input[name="email"]"#));
        }

        #[test]
        fn test_parse_contains() {
            let s = Selector::parse(r#"button[type="submit"]:contains("Log in")"#).unwrap();
            assert_eq!(s, Selector::css_with_text(r#"button[type="submit"]"#, "Log in"));
        }

        #[test]
        fn test_parse_contains_single_quotes() {
            let s = Selector::parse("p:contains('Invalid Email')").unwrap();
            assert_eq!(s, Selector::css_with_text("p", "Invalid Email"));
        }

        #[test]
        fn test_parse_bare_contains_matches_any_element() {
            let s = Selector::parse(r#":contains("Welcome")"#).unwrap();
            assert_eq!(s, Selector::css_with_text("*", "Welcome"));
        }

        #[test]
        fn test_parse_prefixes() {
            assert_eq!(
                Selector::parse("testid=submit").unwrap(),
                Selector::test_id("submit")
            );
            assert_eq!(
                Selector::parse("text=Welcome back").unwrap(),
                Selector::text("Welcome back")
            );
            assert_eq!(
                Selector::parse("xpath=//button").unwrap(),
                Selector::xpath("//button")
            );
        }

        #[test]
        fn test_parse_empty_is_error() {
            assert!(Selector::parse("   ").is_err());
            assert!(Selector::parse_chain(" , ").is_err());
        }

        #[test]
        fn test_parse_chain_order() {
            let chain = Selector::parse_chain(
                r#"input[autocomplete="username"], input[name="email"], input[placeholder*="Email"]"#,
            )
            .unwrap();
            assert_eq!(chain.len(), 3);
            assert_eq!(chain[0], Selector::css(r#"input[autocomplete="username"]"#));
            assert_eq!(chain[2], Selector::css(r#"input[placeholder*="Email"]"#));
        }

        #[test]
        fn test_chain_ignores_commas_in_quotes() {
            let chain = Selector::parse_chain(r#"span:contains("Hello, world"), [title="a,b"]"#)
                .unwrap();
            assert_eq!(chain.len(), 2);
            assert_eq!(chain[0], Selector::css_with_text("span", "Hello, world"));
            assert_eq!(chain[1], Selector::css(r#"[title="a,b"]"#));
        }

        #[test]
        fn test_query_all_css() {
            let q = Selector::css("button.primary").to_query_all();
            assert!(q.contains("querySelectorAll"));
            assert!(q.contains("\"button.primary\""));
        }

        #[test]
        fn test_query_all_escapes_quotes() {
            let q = Selector::css(r#"input[name="email"]"#).to_query_all();
            assert!(q.contains(r#"input[name=\"email\"]"#));
        }

        #[test]
        fn test_query_all_text_filters() {
            let q = Selector::css_with_text("p", "Invalid Email").to_query_all();
            assert!(q.contains("textContent.includes(\"Invalid Email\")"));
            let q = Selector::test_id("score").to_query_all();
            assert!(q.contains("data-testid"));
            let q = Selector::xpath("//p").to_query_all();
            assert!(q.contains("snapshotItem"));
        }

        #[test]
        fn test_serde_as_string() {
            let s: Selector = serde_json::from_str(r#""p:contains(\"Oops\")""#).unwrap();
            assert_eq!(s, Selector::css_with_text("p", "Oops"));
            let json = serde_json::to_string(&Selector::test_id("x")).unwrap();
            assert_eq!(json, "\"testid=x\"");
        }
    }

    mod registry_tests {
        use super::*;

        #[test]
        fn test_resolve_registered() {
            let registry =
                LocatorRegistry::new().with(Locator::from_chain("a.b", "#x, .y").unwrap());
            let locator = registry.resolve("a.b").unwrap();
            assert_eq!(locator.strategies.len(), 2);
            assert_eq!(locator.arity, Arity::ExactlyOne);
        }

        #[test]
        fn test_unknown_name_has_no_strategies() {
            let registry = LocatorRegistry::new();
            assert!(registry.resolve("missing").is_none());
            assert!(registry.strategies_for("missing").is_empty());
        }

        #[test]
        fn test_later_registration_replaces() {
            let mut registry = LocatorRegistry::new();
            assert!(registry
                .register(Locator::from_chain("n", "#old").unwrap())
                .is_none());
            let old = registry.register(Locator::from_chain("n", "#new").unwrap());
            assert_eq!(old.unwrap().strategies[0], Selector::css("#old"));
            assert_eq!(registry.strategies_for("n")[0], Selector::css("#new"));
            assert_eq!(registry.len(), 1);
        }

        #[test]
        fn test_overrides_keep_arity() {
            let mut registry = LocatorRegistry::new()
                .with(Locator::from_chain("links", "a").unwrap().at_least_one());
            let overrides = BTreeMap::from([("links".to_string(), "nav a, a".to_string())]);
            registry.apply_overrides(&overrides).unwrap();
            let locator = registry.resolve("links").unwrap();
            assert_eq!(locator.arity, Arity::AtLeastOne);
            assert_eq!(locator.chain(), "nav a, a");
        }

        #[test]
        fn test_merge_and_names() {
            let mut a = LocatorRegistry::new().with(Locator::from_chain("b", "#b").unwrap());
            let b = LocatorRegistry::new()
                .with(Locator::from_chain("a", "#a").unwrap())
                .with(Locator::from_chain("b", "#b2").unwrap());
            a.merge(b);
            assert_eq!(a.names(), vec!["a", "b"]);
            assert_eq!(a.strategies_for("b")[0], Selector::css("#b2"));
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn chain_preserves_alternatives_in_order(
                parts in prop::collection::vec("[a-z][a-z0-9_-]{0,8}", 1..6)
            ) {
                let input = parts.join(", ");
                let chain = Selector::parse_chain(&input).unwrap();
                prop_assert_eq!(chain.len(), parts.len());
                for (selector, part) in chain.iter().zip(&parts) {
                    prop_assert_eq!(selector, &Selector::css(part.as_str()));
                }
            }

            #[test]
            fn contains_text_survives_display(
                tag in "[a-z]{1,6}",
                text in "[A-Za-z ]{1,20}"
            ) {
                let selector = Selector::css_with_text(tag, text.clone());
                let reparsed = Selector::parse(&selector.to_string()).unwrap();
                prop_assert_eq!(reparsed, selector);
            }
        }
    }
}
