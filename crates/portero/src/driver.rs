//! Browser automation seam.
//!
//! Everything above this module talks to a `BrowserDriver`: the CDP driver in
//! `browser` (feature `browser`) and the scripted `mock::MockBrowser` are the
//! two implementations. The trait is narrow: queries return
//! element summaries, interactions address elements by the id a query handed
//! out, and every call may fail with `ProbeError::DriverError`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::locator::Selector;
use crate::result::ProbeResult;

/// Snapshot of a matched element at query time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-assigned identifier, valid until the next navigation
    pub id: String,
    /// Lowercase tag name
    pub tag_name: String,
    /// Text content
    pub text: String,
    /// Rendered and not hidden
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
    /// Current value for form controls
    pub value: Option<String>,
}

impl ElementHandle {
    /// Create a visible, enabled element handle with no text
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
            text: String::new(),
            visible: true,
            enabled: true,
            value: None,
        }
    }

    /// Set the text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set visibility
    #[must_use]
    pub const fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Set enabled state
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Browser launch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Timeout for a single navigation, in milliseconds
    pub navigation_timeout_ms: u64,
    /// Executable path override
    pub executable_path: Option<String>,
    /// Run the browser with its sandbox enabled
    pub sandbox: bool,
    /// User agent override
    pub user_agent: Option<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            navigation_timeout_ms: 30_000,
            executable_path: None,
            sandbox: true,
            user_agent: None,
        }
    }
}

impl DriverConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set headless mode
    #[must_use]
    pub const fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set the browser executable
    #[must_use]
    pub fn executable(mut self, path: impl Into<String>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    /// Disable the browser sandbox (containers, CI)
    #[must_use]
    pub const fn no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Abstract browser automation primitive
#[async_trait]
pub trait BrowserDriver: Send {
    /// Navigate to an absolute URL
    async fn navigate(&mut self, url: &str) -> ProbeResult<()>;

    /// All elements currently matching a selector, in document order
    async fn query(&mut self, selector: &Selector) -> ProbeResult<Vec<ElementHandle>>;

    /// Type text into an element, appending to its current value
    async fn type_text(&mut self, element_id: &str, text: &str) -> ProbeResult<()>;

    /// Clear a form control's value
    async fn clear(&mut self, element_id: &str) -> ProbeResult<()>;

    /// Click an element
    async fn click(&mut self, element_id: &str) -> ProbeResult<()>;

    /// Remove all cookies
    async fn clear_cookies(&mut self) -> ProbeResult<()>;

    /// Clear local storage
    async fn clear_local_storage(&mut self) -> ProbeResult<()>;

    /// Clear session storage
    async fn clear_session_storage(&mut self) -> ProbeResult<()>;

    /// Current page URL
    async fn current_url(&mut self) -> ProbeResult<String>;

    /// Close the page and release the browser context
    async fn close(&mut self) -> ProbeResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    mod element_handle_tests {
        use super::*;

        #[test]
        fn test_element_handle_creation() {
            let elem = ElementHandle::new("el-1", "button")
                .with_text("Log in")
                .with_enabled(false);
            assert_eq!(elem.id, "el-1");
            assert_eq!(elem.tag_name, "button");
            assert_eq!(elem.text, "Log in");
            assert!(elem.visible);
            assert!(!elem.enabled);
            assert!(elem.value.is_none());
        }
    }

    mod driver_config_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = DriverConfig::default();
            assert!(config.headless);
            assert_eq!(config.viewport_width, 1920);
            assert_eq!(config.viewport_height, 1080);
            assert!(config.sandbox);
        }

        #[test]
        fn test_builder() {
            let config = DriverConfig::new()
                .headless(false)
                .viewport(1280, 720)
                .executable("/usr/bin/chromium")
                .no_sandbox();
            assert!(!config.headless);
            assert_eq!(config.viewport_width, 1280);
            assert_eq!(config.executable_path.as_deref(), Some("/usr/bin/chromium"));
            assert!(!config.sandbox);
        }

        #[test]
        #[allow(clippy::unwrap_used)]
        fn test_partial_yaml_keeps_defaults() {
            let config: DriverConfig = serde_yaml_ng::from_str("headless: false\n").unwrap();
            assert!(!config.headless);
            assert_eq!(config.viewport_width, 1920);
        }
    }
}
