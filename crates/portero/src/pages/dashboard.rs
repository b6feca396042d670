//! Dashboard surface reached after a successful sign-in.

use tracing::debug;

use crate::config::Messages;
use crate::locator::{Locator, LocatorRegistry, Selector};
use crate::page_object::PageObject;
use crate::result::ProbeResult;
use crate::session::{Budget, Session};
use crate::wait::{Condition, UrlCondition};

/// Home link
pub const HOME_LINK: &str = "dashboard.link.home";
/// Profile link
pub const PROFILE_LINK: &str = "dashboard.link.profile";
/// Documents link
pub const DOCUMENTS_LINK: &str = "dashboard.link.documents";
/// Applications link
pub const APPLICATIONS_LINK: &str = "dashboard.link.applications";
/// Universities and programs link
pub const UNIVERSITIES_LINK: &str = "dashboard.link.universities";
/// Score link; rendered both in the navigation and in the score card
pub const SCORE_LINK: &str = "dashboard.link.score";
/// Avatar image
pub const USER_AVATAR: &str = "dashboard.user_avatar";
/// Display name
pub const USER_NAME: &str = "dashboard.user_name";
/// Greeting
pub const WELCOME_TEXT: &str = "dashboard.welcome_text";
/// Application steps heading
pub const APPLICATION_STEPS_TITLE: &str = "dashboard.application_steps_title";
/// Score percentage
pub const SCORE_PERCENTAGE: &str = "dashboard.score_percentage";
/// Application summary heading
pub const APPLICATION_SUMMARY_TITLE: &str = "dashboard.application_summary_title";
/// Started applications counter
pub const STARTED_COUNT: &str = "dashboard.started_count";
/// Paid applications counter
pub const PAID_COUNT: &str = "dashboard.paid_count";

/// Every dashboard locator name
pub const ALL: &[&str] = &[
    HOME_LINK,
    PROFILE_LINK,
    DOCUMENTS_LINK,
    APPLICATIONS_LINK,
    UNIVERSITIES_LINK,
    SCORE_LINK,
    USER_AVATAR,
    USER_NAME,
    WELCOME_TEXT,
    APPLICATION_STEPS_TITLE,
    SCORE_PERCENTAGE,
    APPLICATION_SUMMARY_TITLE,
    STARTED_COUNT,
    PAID_COUNT,
];

const NAVIGATION: &[(&str, &str)] = &[
    (HOME_LINK, "/dashboard"),
    (PROFILE_LINK, "/dashboard/profile"),
    (DOCUMENTS_LINK, "/dashboard/documents"),
    (APPLICATIONS_LINK, "/dashboard/applications"),
    (UNIVERSITIES_LINK, "/dashboard/universitiesandprograms"),
    (SCORE_LINK, "/dashboard/wisescore"),
];

/// Default dashboard locators
#[must_use]
pub fn registry(messages: &Messages) -> LocatorRegistry {
    let mut registry = LocatorRegistry::new();
    for (name, href) in NAVIGATION {
        let link = Locator::new(*name, vec![Selector::css(format!("a[href=\"{href}\"]"))]);
        let link = if *name == SCORE_LINK {
            link.at_least_one()
        } else {
            link
        };
        registry.register(link);
    }
    registry
        .with(Locator::new(
            USER_AVATAR,
            vec![Selector::css(r#"img[alt="User Avatar"]"#)],
        ))
        .with(
            Locator::new(USER_NAME, vec![Selector::css(".MuiTypography-body3")]).at_least_one(),
        )
        .with(
            Locator::new(
                WELCOME_TEXT,
                vec![Selector::css_with_text("span", &messages.dashboard_welcome)],
            )
            .at_least_one(),
        )
        .with(
            Locator::new(
                APPLICATION_STEPS_TITLE,
                vec![Selector::css_with_text("h5", &messages.dashboard_title)],
            )
            .at_least_one(),
        )
        .with(
            Locator::new(
                SCORE_PERCENTAGE,
                vec![Selector::css_with_text("span.MuiTypography-body3", "%")],
            )
            .at_least_one(),
        )
        .with(
            Locator::new(
                APPLICATION_SUMMARY_TITLE,
                vec![Selector::css_with_text("span", "Application summary")],
            )
            .at_least_one(),
        )
        .with(Locator::new(
            STARTED_COUNT,
            vec![Selector::css_with_text("span.MuiTypography-h7", "Started")],
        ))
        .with(Locator::new(
            PAID_COUNT,
            vec![Selector::css_with_text("span.MuiTypography-h7", "Paid")],
        ))
}

/// The dashboard surface
#[derive(Debug)]
pub struct DashboardPage<'s> {
    session: &'s mut Session,
}

impl PageObject for DashboardPage<'_> {
    fn url_pattern(&self) -> &str {
        &self.session.context().surfaces.dashboard_path
    }

    fn required_locators(&self) -> &'static [&'static str] {
        &[WELCOME_TEXT, USER_AVATAR]
    }

    fn page_name(&self) -> &str {
        "DashboardPage"
    }
}

impl<'s> DashboardPage<'s> {
    /// Attach to a session without navigating
    #[must_use]
    pub fn attach(session: &'s mut Session) -> Self {
        Self { session }
    }

    /// Release the session borrow
    #[must_use]
    pub fn into_session(self) -> &'s mut Session {
        self.session
    }

    async fn visible(self, name: &str, budget: Budget) -> ProbeResult<Self> {
        self.session.expect(name, Condition::Visible, budget).await?;
        Ok(self)
    }

    /// URL is on the dashboard
    pub async fn verify_loaded(self) -> ProbeResult<Self> {
        let path = self.url_pattern().to_string();
        self.session
            .expect_url(UrlCondition::Contains(path), Budget::Critical)
            .await?;
        Ok(self)
    }

    /// Greeting and avatar are visible
    pub async fn wait_for_load(self) -> ProbeResult<Self> {
        debug!(page = self.page_name(), "waiting for load");
        let mut page = self;
        for name in page.required_locators() {
            page = page.visible(name, Budget::Critical).await?;
        }
        Ok(page)
    }

    /// Avatar is visible
    pub async fn verify_profile_visible(self) -> ProbeResult<Self> {
        self.visible(USER_AVATAR, Budget::Critical).await
    }

    /// The given name, or the configured one, is shown; with neither, the
    /// name slot is visible
    pub async fn verify_user_name(self, name: Option<&str>) -> ProbeResult<Self> {
        let name = name
            .map(str::to_string)
            .or_else(|| self.session.context().messages.user_name.clone());
        match name {
            Some(name) => {
                let locator = Locator::new(USER_NAME, vec![Selector::text(name)]);
                self.session
                    .expect_locator(&locator, Condition::Visible, Budget::Normal)
                    .await?;
                Ok(self)
            }
            None => self.visible(USER_NAME, Budget::Normal).await,
        }
    }

    /// Greeting is visible
    pub async fn verify_welcome_message(self) -> ProbeResult<Self> {
        self.visible(WELCOME_TEXT, Budget::Normal).await
    }

    /// Every navigation link is visible
    pub async fn verify_navigation_links(self) -> ProbeResult<Self> {
        let mut page = self;
        for (name, _) in NAVIGATION {
            page = page.visible(name, Budget::Normal).await?;
        }
        Ok(page)
    }

    /// Application summary heading is visible
    pub async fn verify_application_summary(self) -> ProbeResult<Self> {
        self.visible(APPLICATION_SUMMARY_TITLE, Budget::Normal).await
    }

    /// Score percentage is visible
    pub async fn verify_score_section(self) -> ProbeResult<Self> {
        self.visible(SCORE_PERCENTAGE, Budget::Normal).await
    }

    /// The given title text is visible, or the application steps heading
    pub async fn verify_title(self, title: Option<&str>) -> ProbeResult<Self> {
        match title {
            Some(title) => {
                let locator = Locator::new(APPLICATION_STEPS_TITLE, vec![Selector::text(title)]);
                self.session
                    .expect_locator(&locator, Condition::Visible, Budget::Normal)
                    .await?;
                Ok(self)
            }
            None => self.visible(APPLICATION_STEPS_TITLE, Budget::Normal).await,
        }
    }

    async fn navigate_via(self, link: &str) -> ProbeResult<Self> {
        let href = NAVIGATION
            .iter()
            .find(|(name, _)| *name == link)
            .map_or("/dashboard", |(_, href)| *href);
        self.session.click(link).await?;
        self.session
            .expect_url(UrlCondition::Contains(href.to_string()), Budget::Critical)
            .await?;
        Ok(self)
    }

    /// Follow the home link
    pub async fn open_home(self) -> ProbeResult<Self> {
        self.navigate_via(HOME_LINK).await
    }

    /// Follow the profile link
    pub async fn open_profile(self) -> ProbeResult<Self> {
        self.navigate_via(PROFILE_LINK).await
    }

    /// Follow the documents link
    pub async fn open_documents(self) -> ProbeResult<Self> {
        self.navigate_via(DOCUMENTS_LINK).await
    }

    /// Follow the applications link
    pub async fn open_applications(self) -> ProbeResult<Self> {
        self.navigate_via(APPLICATIONS_LINK).await
    }

    /// Follow the universities link
    pub async fn open_universities(self) -> ProbeResult<Self> {
        self.navigate_via(UNIVERSITIES_LINK).await
    }

    /// Follow the first score link
    pub async fn open_score(self) -> ProbeResult<Self> {
        self.navigate_via(SCORE_LINK).await
    }
}
