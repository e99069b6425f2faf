//! Home page object
//!
//! Wraps the discovery page: search box, type/genre/year/rating filters,
//! result card grid and pagination. Each interaction correlates the UI action
//! to the API call it triggers and logs the capture. Filter interactions are
//! tolerant: a failed click or fill is logged at warn and swallowed, because
//! the site's filter widgets are known to be flaky; navigation failures
//! propagate.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::EnvironmentConfig;
use crate::correlate::{wait_for_api, ApiCapture};
use crate::error::{HarnessError, HarnessResult};
use crate::session::PageSession;

// Selectors for the discovery UI.
const SEARCH_BOX: &str = r#"input[placeholder*="search" i]"#;
const TYPE_FILTER: &str = "role=combobox[name=/type/i]";
const GENRE_FILTER: &str = "role=combobox[name=/genre/i]";
const YEAR_FROM: &str = "role=spinbutton >> nth=0";
const YEAR_TO: &str = "role=spinbutton >> nth=1";
const RATING_SLIDER: &str = "role=slider";
const CARDS: &str = r#"img[alt][src*="image.tmdb.org"]"#;
const PAGINATION: &str = r#"nav:has-text("Previous")"#;
const NEXT_BUTTON: &str = r#"a:has-text("Next"), button:has-text("Next")"#;
const PREV_BUTTON: &str = r#"a:has-text("Previous"), button:has-text("Previous")"#;

const FILTER_TIMEOUT: Duration = Duration::from_millis(15_000);
const OPTION_TIMEOUT: Duration = Duration::from_millis(5_000);
const LOAD_TIMEOUT: Duration = Duration::from_millis(20_000);

/// Content type toggle offered by the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    fn label(&self) -> &'static str {
        match self {
            MediaType::Movie => "Movie",
            MediaType::Tv => "TV",
        }
    }
}

pub struct HomePage<'a> {
    session: &'a PageSession,
    config: &'a EnvironmentConfig,
}

impl<'a> HomePage<'a> {
    pub fn new(session: &'a PageSession, config: &'a EnvironmentConfig) -> Self {
        Self { session, config }
    }

    /// Open the home page and wait for it to be usable: either the initial
    /// discover/search call lands or the network settles, then the search box
    /// and the first result card must be visible.
    pub async fn goto(&self) -> HarnessResult<()> {
        self.session.goto("/").await?;

        tokio::select! {
            capture = wait_for_api(self.session, &["discover", "search"], self.config.wait_for_api) => {
                if capture.is_timeout() {
                    warn!("initial discover wait failed: {:?}", capture.response_preview);
                } else {
                    debug!(api = ?capture, "initial discover call");
                }
            }
            settled = self.session.wait_idle(self.config.wait_for_api) => {
                if let Err(e) = settled {
                    warn!("network idle wait failed: {}", e);
                }
            }
        }

        self.session.wait_for_selector(SEARCH_BOX, LOAD_TIMEOUT).await?;
        self.session.wait_for_selector(CARDS, LOAD_TIMEOUT).await?;
        Ok(())
    }

    /// Type a keyword into the search box and verify a matching result shows.
    pub async fn search_title(&self, keyword: &str) -> HarnessResult<()> {
        self.session.fill(SEARCH_BOX, keyword).await?;
        let api = wait_for_api(self.session, &["search", "discover"], self.config.wait_for_api).await;
        info!(api = ?api, "title search complete");
        self.assert_results_contain(keyword).await
    }

    /// Toggle the Movie/TV type filter. Tolerant of widget flakiness.
    pub async fn select_type(&self, media: MediaType) -> HarnessResult<()> {
        let attempt: HarnessResult<ApiCapture> = async {
            self.session.click(TYPE_FILTER, FILTER_TIMEOUT).await?;
            self.session
                .click(&option_selector(media.label()), OPTION_TIMEOUT)
                .await?;
            let api = wait_for_api(
                self.session,
                &["discover", "movie", "tv"],
                self.config.wait_for_api,
            )
            .await;
            self.assert_has_cards("type filter").await?;
            Ok(api)
        }
        .await;

        match attempt {
            Ok(api) => info!(api = ?api, "type filter applied"),
            Err(e) => warn!("type filter interaction failed; continuing: {}", e),
        }
        Ok(())
    }

    /// Pick a genre from the genre filter. Tolerant of widget flakiness.
    pub async fn select_genre(&self, genre: &str) -> HarnessResult<()> {
        let attempt: HarnessResult<ApiCapture> = async {
            self.session.click(GENRE_FILTER, FILTER_TIMEOUT).await?;
            self.session.click(&option_selector(genre), OPTION_TIMEOUT).await?;
            let api = wait_for_api(self.session, &["discover", "genre"], self.config.wait_for_api).await;
            self.assert_has_cards("genre filter").await?;
            Ok(api)
        }
        .await;

        match attempt {
            Ok(api) => info!(api = ?api, "genre filter applied"),
            Err(e) => warn!("genre filter interaction failed; continuing: {}", e),
        }
        Ok(())
    }

    /// Set the release-year range and verify visible years stay inside it.
    pub async fn set_year_range(&self, from: i32, to: i32) -> HarnessResult<()> {
        let attempt: HarnessResult<ApiCapture> = async {
            self.session.fill(YEAR_FROM, &from.to_string()).await?;
            self.session.fill(YEAR_TO, &to.to_string()).await?;
            // Commit the second input; the site only refetches on blur.
            self.session
                .evaluate("document.activeElement && document.activeElement.blur()")
                .await?;
            let api = wait_for_api(self.session, &["discover"], self.config.wait_for_api).await;
            self.assert_years_between(from, to).await?;
            Ok(api)
        }
        .await;

        match attempt {
            Ok(api) => info!(api = ?api, "year range applied"),
            Err(e) => warn!("year range interaction failed; continuing: {}", e),
        }
        Ok(())
    }

    /// Raise the minimum-rating slider and verify visible ratings comply.
    pub async fn set_rating(&self, min_rating: f64) -> HarnessResult<()> {
        let attempt: HarnessResult<ApiCapture> = async {
            self.session.fill(RATING_SLIDER, &min_rating.to_string()).await?;
            let api = wait_for_api(self.session, &["discover"], self.config.wait_for_api).await;
            self.assert_ratings_at_least(min_rating).await?;
            Ok(api)
        }
        .await;

        match attempt {
            Ok(api) => info!(api = ?api, "rating filter applied"),
            Err(e) => warn!("rating slider interaction failed; continuing: {}", e),
        }
        Ok(())
    }

    /// Jump directly to a numbered pagination link.
    pub async fn go_to_page(&self, page_number: u32) -> HarnessResult<()> {
        let attempt: HarnessResult<ApiCapture> = async {
            self.session
                .click(&page_link_selector(page_number), FILTER_TIMEOUT)
                .await?;
            let api = wait_for_api(self.session, &["discover"], self.config.wait_for_api).await;
            self.assert_page_indicator(page_number).await?;
            Ok(api)
        }
        .await;

        match attempt {
            Ok(api) => info!(api = ?api, page_number, "jumped to page"),
            Err(e) => warn!("direct page jump failed; continuing: {}", e),
        }
        Ok(())
    }

    pub async fn next_page(&self) -> HarnessResult<()> {
        let attempt: HarnessResult<ApiCapture> = async {
            self.session.click(NEXT_BUTTON, FILTER_TIMEOUT).await?;
            Ok(wait_for_api(self.session, &["discover"], self.config.wait_for_api).await)
        }
        .await;

        match attempt {
            Ok(api) => info!(api = ?api, "next page"),
            Err(e) => warn!("next page interaction failed; continuing: {}", e),
        }
        Ok(())
    }

    pub async fn prev_page(&self) -> HarnessResult<()> {
        let attempt: HarnessResult<ApiCapture> = async {
            self.session.click(PREV_BUTTON, FILTER_TIMEOUT).await?;
            Ok(wait_for_api(self.session, &["discover"], self.config.wait_for_api).await)
        }
        .await;

        match attempt {
            Ok(api) => info!(api = ?api, "prev page"),
            Err(e) => warn!("prev page interaction failed; continuing: {}", e),
        }
        Ok(())
    }

    /// Click a category quick link (Popular, Trend, Newest, Top rated).
    pub async fn click_category(&self, category: &str) -> HarnessResult<ApiCapture> {
        self.session
            .click(&format!(r#"a:has-text("{}")"#, category), FILTER_TIMEOUT)
            .await?;
        Ok(wait_for_api(
            self.session,
            &["popular", "trend", "new", "top"],
            self.config.wait_for_api,
        )
        .await)
    }

    /// Number of visible result cards.
    pub async fn card_count(&self) -> HarnessResult<u64> {
        self.session.count(CARDS).await
    }

    /// `src` attribute of the first result card, used to detect page changes.
    pub async fn first_card_src(&self) -> HarnessResult<Option<String>> {
        self.session.attribute(CARDS, "src").await
    }

    pub async fn search_box_visible(&self) -> HarnessResult<bool> {
        self.session.is_visible(SEARCH_BOX).await
    }

    pub async fn first_card_visible(&self) -> HarnessResult<bool> {
        self.session.is_visible(CARDS).await
    }

    /// Click the last visible pagination link, wherever pagination ends.
    pub async fn click_last_page_link(&self) -> HarnessResult<()> {
        self.session
            .click(&format!("{} >> role=link >> nth=-1", PAGINATION), FILTER_TIMEOUT)
            .await
    }

    pub async fn click_next_raw(&self) -> HarnessResult<()> {
        self.session.click(NEXT_BUTTON, FILTER_TIMEOUT).await
    }

    async fn assert_has_cards(&self, context: &str) -> HarnessResult<()> {
        let count = self.card_count().await?;
        if count == 0 {
            return Err(HarnessError::AssertionFailed(format!(
                "no result cards after {}",
                context
            )));
        }
        Ok(())
    }

    async fn assert_results_contain(&self, keyword: &str) -> HarnessResult<()> {
        self.session
            .wait_for_selector(&format!("text={}", keyword), self.config.default_timeout)
            .await
            .map_err(|_| {
                HarnessError::AssertionFailed(format!("no visible result mentioning '{}'", keyword))
            })
    }

    async fn assert_page_indicator(&self, expected: u32) -> HarnessResult<()> {
        self.session
            .wait_for_selector(
                &format!(r#"{} >> text="{}""#, PAGINATION, expected),
                self.config.default_timeout,
            )
            .await
            .map_err(|_| {
                HarnessError::AssertionFailed(format!("page indicator {} not visible", expected))
            })
    }

    async fn assert_years_between(&self, from: i32, to: i32) -> HarnessResult<()> {
        let texts = self.session.texts(r#"text=/(19|20)\d{2}/"#).await?;
        years_within_range(&texts, from, to)
    }

    async fn assert_ratings_at_least(&self, min_rating: f64) -> HarnessResult<()> {
        let texts = self.session.texts(r#"text=/\d+(\.\d+)?/"#).await?;
        ratings_at_least(&texts, min_rating)
    }
}

fn option_selector(name: &str) -> String {
    format!("role=option[name=/{}/i]", name)
}

fn page_link_selector(page_number: u32) -> String {
    format!(r#"a:text-is("{}")"#, page_number)
}

fn year_regex() -> &'static Regex {
    static YEAR_RE: OnceLock<Regex> = OnceLock::new();
    YEAR_RE.get_or_init(|| Regex::new(r"(19|20)\d{2}").expect("valid literal regex"))
}

/// Every year mentioned in the texts must fall inside `[from, to]`.
fn years_within_range(texts: &[String], from: i32, to: i32) -> HarnessResult<()> {
    for text in texts {
        let Some(found) = year_regex().find(text) else {
            continue;
        };
        let Ok(year) = found.as_str().parse::<i32>() else {
            continue;
        };
        if year < from || year > to {
            return Err(HarnessError::AssertionFailed(format!(
                "year {} outside {}..={}",
                year, from, to
            )));
        }
    }
    Ok(())
}

/// Every numeric text must be at least `min_rating`; non-numbers are skipped.
fn ratings_at_least(texts: &[String], min_rating: f64) -> HarnessResult<()> {
    for text in texts {
        let Ok(value) = text.trim().parse::<f64>() else {
            continue;
        };
        if value < min_rating {
            return Err(HarnessError::AssertionFailed(format!(
                "rating {} below minimum {}",
                value, min_rating
            )));
        }
    }
    Ok(())
}
