//! Filter scenarios: type, genre, year range, rating, title search,
//! category quick links.

use futures::future::BoxFuture;
use tracing::info;

use crate::config::EnvironmentConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::pages::{HomePage, MediaType};
use crate::runner::{Scenario, Suite};
use crate::session::PageSession;

const FILE: &str = "crates/harness/src/scenarios/filters.rs";

const CATEGORIES: [&str; 4] = ["Popular", "Trend", "Newest", "Top rated"];

fn type_filter_toggles<'a>(
    session: &'a PageSession,
    config: &'a EnvironmentConfig,
) -> BoxFuture<'a, HarnessResult<()>> {
    Box::pin(async move {
        let home = HomePage::new(session, config);
        home.goto().await?;
        home.select_type(MediaType::Movie).await?;
        home.select_type(MediaType::Tv).await?;
        Ok(())
    })
}

fn genre_filter_limits_results<'a>(
    session: &'a PageSession,
    config: &'a EnvironmentConfig,
) -> BoxFuture<'a, HarnessResult<()>> {
    Box::pin(async move {
        let home = HomePage::new(session, config);
        home.goto().await?;
        home.select_genre(&config.genre).await
    })
}

fn year_range_narrows_results<'a>(
    session: &'a PageSession,
    config: &'a EnvironmentConfig,
) -> BoxFuture<'a, HarnessResult<()>> {
    Box::pin(async move {
        let home = HomePage::new(session, config);
        home.goto().await?;
        home.set_year_range(2020, 2025).await
    })
}

fn rating_threshold_enforced<'a>(
    session: &'a PageSession,
    config: &'a EnvironmentConfig,
) -> BoxFuture<'a, HarnessResult<()>> {
    Box::pin(async move {
        let home = HomePage::new(session, config);
        home.goto().await?;
        home.set_rating(7.0).await
    })
}

fn title_search_matches<'a>(
    session: &'a PageSession,
    config: &'a EnvironmentConfig,
) -> BoxFuture<'a, HarnessResult<()>> {
    Box::pin(async move {
        let home = HomePage::new(session, config);
        home.goto().await?;
        home.search_title(&config.title_keyword).await
    })
}

fn category_quick_links<'a>(
    session: &'a PageSession,
    config: &'a EnvironmentConfig,
) -> BoxFuture<'a, HarnessResult<()>> {
    Box::pin(async move {
        let home = HomePage::new(session, config);
        home.goto().await?;
        for category in CATEGORIES {
            info!(category, "applying category filter");
            let api = home.click_category(category).await?;
            if api.status != 200 {
                return Err(HarnessError::AssertionFailed(format!(
                    "category '{}' API returned {}",
                    category, api.status
                )));
            }
            if home.card_count().await? == 0 {
                return Err(HarnessError::AssertionFailed(format!(
                    "no result cards after category '{}'",
                    category
                )));
            }
        }
        Ok(())
    })
}

pub fn suite() -> Suite {
    Suite {
        title: "Filters",
        scenarios: vec![
            Scenario {
                name: "Type filter toggles between Movie and TV",
                file: FILE,
                tags: &["e2e", "filters"],
                skip: None,
                run: type_filter_toggles,
            },
            Scenario {
                name: "Genre filter limits results",
                file: FILE,
                tags: &["e2e", "filters"],
                skip: None,
                run: genre_filter_limits_results,
            },
            Scenario {
                name: "Year range narrows results",
                file: FILE,
                tags: &["e2e", "filters"],
                skip: None,
                run: year_range_narrows_results,
            },
            Scenario {
                name: "Rating threshold enforces minimum rating",
                file: FILE,
                tags: &["e2e", "filters"],
                skip: None,
                run: rating_threshold_enforced,
            },
            Scenario {
                name: "Title search returns matching items",
                file: FILE,
                tags: &["e2e", "filters", "smoke"],
                skip: None,
                run: title_search_matches,
            },
            Scenario {
                name: "Category quick links trigger correct API",
                file: FILE,
                tags: &["e2e", "filters"],
                skip: None,
                run: category_quick_links,
            },
        ],
    }
}
