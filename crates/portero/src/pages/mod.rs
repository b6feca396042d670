//! Page objects for the sign-in flow's surfaces.

pub mod dashboard;
pub mod sign_in;

pub use dashboard::DashboardPage;
pub use sign_in::SignInPage;

use crate::config::Messages;
use crate::locator::LocatorRegistry;

/// Locators for every page, with message-bearing selectors built from
/// `messages`
#[must_use]
pub fn default_registry(messages: &Messages) -> LocatorRegistry {
    let mut registry = sign_in::registry(messages);
    registry.merge(dashboard::registry(messages));
    registry
}
