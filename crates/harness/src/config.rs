//! Environment-driven configuration
//!
//! Every knob comes from an environment variable with a code default, read
//! once at startup into an [`EnvironmentConfig`] that is passed by reference.
//! CLI flags on the e2e entry point override individual fields afterwards.

use serde::Serialize;
use std::time::Duration;

/// Default target site when `BASE_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "https://tmdb-discover.surge.sh";

/// Public demo key for the TMDB API, used by the direct API checks when
/// `TMDB_API_KEY` is unset.
pub const DEFAULT_TMDB_API_KEY: &str = "add494e96808c55b3ee7f940c9d5e5b6";

/// Browser engine driven through Playwright.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }

    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "firefox" => Browser::Firefox,
            "webkit" => Browser::Webkit,
            _ => Browser::Chromium,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Harness configuration resolved from the environment.
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentConfig {
    /// Base URL of the site under test.
    pub base_url: String,

    /// Default timeout for element waits and assertions.
    pub default_timeout: Duration,

    /// How long to wait when correlating a UI action to its API response.
    pub wait_for_api: Duration,

    /// Hard ceiling for one scenario attempt.
    pub scenario_timeout: Duration,

    /// Re-attempts after a failed scenario.
    pub retries: u32,

    /// Run the browser headless.
    pub headless: bool,

    /// Browser engine to launch.
    pub browser: Browser,

    /// Browser viewport.
    pub viewport: Viewport,

    /// Genre used by the genre-filter scenario.
    pub genre: String,

    /// Keyword used by the title-search scenario.
    pub title_keyword: String,

    /// Highest page the pagination scenarios probe.
    pub max_page: u32,

    /// Key for the direct TMDB API checks.
    pub tmdb_api_key: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_timeout: Duration::from_millis(10_000),
            wait_for_api: Duration::from_millis(20_000),
            scenario_timeout: Duration::from_millis(60_000),
            retries: 1,
            headless: true,
            browser: Browser::Chromium,
            viewport: Viewport { width: 1280, height: 720 },
            genre: "Action".to_string(),
            title_keyword: "Avatar".to_string(),
            max_page: 5,
            tmdb_api_key: DEFAULT_TMDB_API_KEY.to_string(),
        }
    }
}

impl EnvironmentConfig {
    /// Resolve the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let millis = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };

        Self {
            base_url: lookup("BASE_URL").unwrap_or(defaults.base_url),
            default_timeout: millis("DEFAULT_TIMEOUT", defaults.default_timeout),
            wait_for_api: millis("WAIT_FOR_API", defaults.wait_for_api),
            scenario_timeout: millis("SCENARIO_TIMEOUT", defaults.scenario_timeout),
            retries: lookup("RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.retries),
            headless: lookup("HEADLESS")
                .map(|v| v.to_ascii_lowercase() != "false")
                .unwrap_or(defaults.headless),
            browser: lookup("BROWSER")
                .map(|v| Browser::parse(&v))
                .unwrap_or(defaults.browser),
            viewport: defaults.viewport,
            genre: lookup("GENRE").unwrap_or(defaults.genre),
            title_keyword: lookup("TITLE_KEYWORD").unwrap_or(defaults.title_keyword),
            max_page: lookup("MAX_PAGE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_page),
            tmdb_api_key: lookup("TMDB_API_KEY").unwrap_or(defaults.tmdb_api_key),
        }
    }
}
