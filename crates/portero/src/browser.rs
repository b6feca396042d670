//! Chromium driver over the DevTools protocol.
//!
//! One browser process per run; every session gets its own incognito browser
//! context so cookies and storage never leak between scenarios running in
//! parallel. Elements are tagged with a `data-portero-id` attribute when a
//! query first sees them; interactions look them up by that attribute.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::network::ClearBrowserCookiesParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::driver::{BrowserDriver, DriverConfig, ElementHandle};
use crate::locator::Selector;
use crate::result::{ProbeError, ProbeResult};
use crate::runner::SessionFactory;
use crate::session::{Session, SuiteContext};

/// Attribute carrying driver-assigned element ids
pub const ID_ATTRIBUTE: &str = "data-portero-id";

fn cdp<E: std::fmt::Display>(action: &'static str) -> impl FnOnce(E) -> ProbeError {
    move |e| ProbeError::driver(format!("{action}: {e}"))
}

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

fn element_css(id: &str) -> String {
    format!("[{ID_ATTRIBUTE}=\"{id}\"]")
}

/// Script that tags and summarizes every element a selector matches
#[must_use]
pub fn query_script(selector: &Selector) -> String {
    format!(
        r"(() => {{
  const attr = {attr};
  return {query}.map(el => {{
    if (!el.hasAttribute(attr)) {{
      window.__porteroSeq = (window.__porteroSeq || 0) + 1;
      el.setAttribute(attr, 'p' + window.__porteroSeq);
    }}
    const style = window.getComputedStyle(el);
    const rect = el.getBoundingClientRect();
    return {{
      id: el.getAttribute(attr),
      tag_name: el.tagName.toLowerCase(),
      text: (el.innerText || el.textContent || '').trim(),
      visible: style.display !== 'none' && style.visibility !== 'hidden' && rect.width > 0 && rect.height > 0,
      enabled: !el.disabled && el.getAttribute('aria-disabled') !== 'true',
      value: typeof el.value === 'string' ? el.value : null,
    }};
  }});
}})()",
        attr = js_string(ID_ATTRIBUTE),
        query = selector.to_query_all(),
    )
}

/// Script that empties a React-controlled input and fires its events
fn clear_script(id: &str) -> String {
    format!(
        r"(() => {{
  const el = document.querySelector({css});
  if (!el) return false;
  const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
  Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, '');
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  el.dispatchEvent(new Event('focusout', {{ bubbles: true }}));
  return true;
}})()",
        css = js_string(&element_css(id)),
    )
}

fn storage_script(storage: &str) -> String {
    format!("(() => {{ try {{ window.{storage}.clear(); }} catch (e) {{}} return true; }})()")
}

// =============================================================================
// DRIVER
// =============================================================================

/// A page in its own browser context
#[derive(Debug)]
pub struct ChromiumDriver {
    browser: Arc<Mutex<Browser>>,
    page: Option<Page>,
    context_id: Option<BrowserContextId>,
    navigation_timeout: Duration,
}

impl ChromiumDriver {
    fn page(&self) -> ProbeResult<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| ProbeError::driver("page already closed"))
    }

    async fn element(&self, id: &str) -> ProbeResult<chromiumoxide::Element> {
        self.page()?
            .find_element(element_css(id))
            .await
            .map_err(|e| ProbeError::driver(format!("element {id} is no longer attached: {e}")))
    }

    async fn eval_bool(&self, script: String, action: &'static str) -> ProbeResult<bool> {
        self.page()?
            .evaluate(script)
            .await
            .map_err(cdp(action))?
            .into_value::<bool>()
            .map_err(cdp(action))
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn navigate(&mut self, url: &str) -> ProbeResult<()> {
        let page = self.page()?;
        match tokio::time::timeout(self.navigation_timeout, page.goto(url)).await {
            Ok(result) => {
                result.map_err(|e| ProbeError::driver(format!("navigate to {url}: {e}")))?;
                Ok(())
            }
            Err(_) => Err(ProbeError::driver(format!(
                "navigate to {url}: no response after {}ms",
                self.navigation_timeout.as_millis()
            ))),
        }
    }

    async fn query(&mut self, selector: &Selector) -> ProbeResult<Vec<ElementHandle>> {
        self.page()?
            .evaluate(query_script(selector))
            .await
            .map_err(cdp("query"))?
            .into_value::<Vec<ElementHandle>>()
            .map_err(cdp("query result"))
    }

    async fn type_text(&mut self, element_id: &str, text: &str) -> ProbeResult<()> {
        let element = self.element(element_id).await?;
        element
            .click()
            .await
            .map_err(cdp("focus"))?
            .type_str(text)
            .await
            .map_err(cdp("type"))?;
        Ok(())
    }

    async fn clear(&mut self, element_id: &str) -> ProbeResult<()> {
        if self.eval_bool(clear_script(element_id), "clear").await? {
            Ok(())
        } else {
            Err(ProbeError::driver(format!(
                "element {element_id} is no longer attached"
            )))
        }
    }

    async fn click(&mut self, element_id: &str) -> ProbeResult<()> {
        self.element(element_id)
            .await?
            .click()
            .await
            .map_err(cdp("click"))?;
        Ok(())
    }

    async fn clear_cookies(&mut self) -> ProbeResult<()> {
        self.page()?
            .execute(ClearBrowserCookiesParams::default())
            .await
            .map_err(cdp("clear cookies"))?;
        Ok(())
    }

    async fn clear_local_storage(&mut self) -> ProbeResult<()> {
        self.eval_bool(storage_script("localStorage"), "clear local storage")
            .await
            .map(|_| ())
    }

    async fn clear_session_storage(&mut self) -> ProbeResult<()> {
        self.eval_bool(storage_script("sessionStorage"), "clear session storage")
            .await
            .map(|_| ())
    }

    async fn current_url(&mut self) -> ProbeResult<String> {
        Ok(self
            .page()?
            .url()
            .await
            .map_err(cdp("current url"))?
            .unwrap_or_default())
    }

    async fn close(&mut self) -> ProbeResult<()> {
        if let Some(page) = self.page.take() {
            page.close().await.map_err(cdp("close page"))?;
        }
        if let Some(context_id) = self.context_id.take() {
            let mut browser = self.browser.lock().await;
            browser
                .dispose_browser_context(context_id)
                .await
                .map_err(cdp("dispose browser context"))?;
        }
        Ok(())
    }
}

// =============================================================================
// FACTORY
// =============================================================================

/// Launches Chromium once and opens an isolated page per session
#[derive(Debug)]
pub struct ChromiumSessionFactory {
    config: DriverConfig,
    browser: Arc<Mutex<Browser>>,
    handler: JoinHandle<()>,
}

impl ChromiumSessionFactory {
    /// Launch the browser
    pub async fn launch(config: DriverConfig) -> ProbeResult<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .request_timeout(Duration::from_millis(config.navigation_timeout_ms));

        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &config.executable_path {
            builder = builder.chrome_executable(path);
        }
        if let Some(agent) = &config.user_agent {
            builder = builder.arg(format!("--user-agent={agent}"));
        }

        let cdp_config = builder.build().map_err(cdp("browser config"))?;
        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(cdp("launch browser"))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        debug!(headless = config.headless, "browser launched");

        Ok(Self {
            config,
            browser: Arc::new(Mutex::new(browser)),
            handler,
        })
    }

    /// Launch configuration
    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }
}

#[async_trait]
impl SessionFactory for ChromiumSessionFactory {
    async fn open(&self, context: Arc<SuiteContext>) -> ProbeResult<Session> {
        let (page, context_id) = {
            let mut browser = self.browser.lock().await;
            let context_id = browser
                .create_browser_context(CreateBrowserContextParams::default())
                .await
                .map_err(cdp("create browser context"))?;
            let target = CreateTargetParams::builder()
                .url("about:blank")
                .browser_context_id(context_id.clone())
                .build()
                .map_err(cdp("page target"))?;
            let page = browser.new_page(target).await.map_err(cdp("new page"))?;
            (page, context_id)
        };
        let driver = ChromiumDriver {
            browser: Arc::clone(&self.browser),
            page: Some(page),
            context_id: Some(context_id),
            navigation_timeout: Duration::from_millis(self.config.navigation_timeout_ms),
        };
        Ok(Session::new(Box::new(driver), context))
    }

    async fn shutdown(&self) -> ProbeResult<()> {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!(error = %e, "browser close failed");
        }
        self.handler.abort();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_script_tags_elements() {
        let script = query_script(&Selector::css_with_text("p", "Invalid Email"));
        assert!(script.contains("\"data-portero-id\""));
        assert!(script.contains("Invalid Email"));
        assert!(script.contains("tag_name"));
    }

    #[test]
    fn test_clear_script_targets_element() {
        let script = clear_script("p7");
        assert!(script.contains(r#"[data-portero-id=\"p7\"]"#));
        assert!(script.contains("dispatchEvent"));
    }
}
