//! Page Object Model support.
//!
//! A page object owns a surface (a URL pattern) and the semantic locators that
//! must be visible before the surface counts as loaded. Callers see
//! intent-level operations only.

/// Trait for page objects representing one surface of the application
pub trait PageObject {
    /// URL pattern that matches this page (e.g., "applynow", "/users/:id")
    fn url_pattern(&self) -> &str;

    /// Locator names that must be visible once the page has loaded
    fn required_locators(&self) -> &'static [&'static str];

    /// Get the page name for logging
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
            .rsplit("::")
            .next()
            .unwrap_or("page")
    }
}

/// URL pattern matcher for surfaces
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    pattern: String,
    segments: Vec<UrlSegment>,
}

#[derive(Debug, Clone)]
enum UrlSegment {
    Literal(String),
    Wildcard,
    Parameter(String),
}

impl UrlMatcher {
    /// Create a new URL matcher from a pattern
    ///
    /// Patterns support:
    /// - Literal segments: `/login`
    /// - Wildcards: `/users/*`
    /// - Named parameters: `/users/:id`
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let segments = split_segments(pattern)
            .map(|s| {
                if s == "*" {
                    UrlSegment::Wildcard
                } else if let Some(name) = s.strip_prefix(':') {
                    UrlSegment::Parameter(name.to_string())
                } else {
                    UrlSegment::Literal(s.to_string())
                }
            })
            .collect();

        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    /// Check if a URL's path matches the pattern exactly
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        let url_segments: Vec<&str> = split_segments(url_path(url)).collect();
        url_segments.len() == self.segments.len() && self.leading_match(&url_segments)
    }

    /// Check if the pattern matches the leading segments of a URL's path
    /// (`/dashboard` matches `/dashboard/profile`)
    #[must_use]
    pub fn matches_prefix(&self, url: &str) -> bool {
        let url_segments: Vec<&str> = split_segments(url_path(url)).collect();
        url_segments.len() >= self.segments.len() && self.leading_match(&url_segments)
    }

    fn leading_match(&self, url_segments: &[&str]) -> bool {
        self.segments
            .iter()
            .zip(url_segments)
            .all(|(segment, actual)| match segment {
                UrlSegment::Literal(lit) => lit == actual,
                UrlSegment::Wildcard | UrlSegment::Parameter(_) => true,
            })
    }

    /// Get the pattern string
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Path component of a URL; relative inputs are returned as-is minus query
/// and fragment
#[must_use]
pub fn url_path(url: &str) -> &str {
    let without_scheme = url.find("://").map_or(url, |i| &url[i + 3..]);
    let path = if without_scheme.len() == url.len() {
        url
    } else {
        without_scheme
            .find('/')
            .map_or("", |i| &without_scheme[i..])
    };
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    mod url_matcher_tests {
        use super::*;

        #[test]
        fn test_literal_match() {
            let matcher = UrlMatcher::new("applynow");
            assert!(matcher.matches("https://app.test/applynow"));
            assert!(matcher.matches("https://app.test/applynow?next=/dashboard"));
            assert!(!matcher.matches("https://app.test/dashboard"));
            assert_eq!(matcher.pattern(), "applynow");
        }

        #[test]
        fn test_prefix_match() {
            let matcher = UrlMatcher::new("/dashboard");
            assert!(matcher.matches_prefix("https://app.test/dashboard"));
            assert!(matcher.matches_prefix("https://app.test/dashboard/profile"));
            assert!(!matcher.matches("https://app.test/dashboard/profile"));
            assert!(!matcher.matches_prefix("https://app.test/applynow"));
        }

        #[test]
        fn test_params_and_wildcards() {
            let matcher = UrlMatcher::new("/users/:id/*");
            assert!(matcher.matches("/users/42/edit"));
            assert!(!matcher.matches("/users/42"));
        }
    }

    mod url_path_tests {
        use super::*;

        #[test]
        fn test_url_path() {
            assert_eq!(url_path("https://app.test/applynow"), "/applynow");
            assert_eq!(url_path("https://app.test"), "");
            assert_eq!(url_path("https://app.test/a/b#frag"), "/a/b");
            assert_eq!(url_path("/dashboard?tab=1"), "/dashboard");
        }
    }

    mod page_object_tests {
        use super::*;

        struct Probe;

        impl PageObject for Probe {
            fn url_pattern(&self) -> &str {
                "/probe"
            }

            fn required_locators(&self) -> &'static [&'static str] {
                &["probe.title"]
            }
        }

        #[test]
        fn test_page_name_is_type_name() {
            assert_eq!(Probe.page_name(), "Probe");
            assert_eq!(Probe.required_locators(), &["probe.title"]);
        }
    }
}
