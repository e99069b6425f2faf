//! Pagination scenarios: next/previous, direct jump, boundary probing.

use futures::future::BoxFuture;
use tracing::{info, warn};

use crate::config::EnvironmentConfig;
use crate::correlate::wait_for_api;
use crate::error::{HarnessError, HarnessResult};
use crate::pages::HomePage;
use crate::runner::{Scenario, Suite};
use crate::session::PageSession;

const FILE: &str = "crates/harness/src/scenarios/pagination.rs";

fn next_prev_changes_page<'a>(
    session: &'a PageSession,
    config: &'a EnvironmentConfig,
) -> BoxFuture<'a, HarnessResult<()>> {
    Box::pin(async move {
        let home = HomePage::new(session, config);
        home.goto().await?;

        let first_src = home.first_card_src().await?;
        info!(?first_src, "captured first page image");

        home.next_page().await?;
        let api_next = wait_for_api(session, &["discover"], config.wait_for_api).await;
        if api_next.status != 200 {
            return Err(HarnessError::AssertionFailed(format!(
                "next page API returned {}",
                api_next.status
            )));
        }

        let second_src = home.first_card_src().await?;
        info!(?second_src, "captured second page image");
        if first_src == second_src {
            warn!("pagination did not change content - may be application issue");
        } else {
            info!("pagination successfully changed content");
        }

        home.prev_page().await?;
        let api_prev = wait_for_api(session, &["discover"], config.wait_for_api).await;
        if api_prev.status != 200 {
            return Err(HarnessError::AssertionFailed(format!(
                "prev page API returned {}",
                api_prev.status
            )));
        }
        Ok(())
    })
}

fn direct_page_jump<'a>(
    session: &'a PageSession,
    config: &'a EnvironmentConfig,
) -> BoxFuture<'a, HarnessResult<()>> {
    Box::pin(async move {
        let home = HomePage::new(session, config);
        home.goto().await?;
        home.go_to_page(3).await
    })
}

fn boundary_near_last_pages<'a>(
    session: &'a PageSession,
    config: &'a EnvironmentConfig,
) -> BoxFuture<'a, HarnessResult<()>> {
    Box::pin(async move {
        let home = HomePage::new(session, config);
        home.goto().await?;
        home.go_to_page(config.max_page).await?;
        info!("attempting to go beyond known stable range");
        home.next_page().await
    })
}

pub fn suite() -> Suite {
    Suite {
        title: "Pagination",
        scenarios: vec![
            Scenario {
                name: "Next/Previous changes page and content",
                file: FILE,
                tags: &["e2e", "pagination"],
                skip: Some("API response wait times out on prev-page navigation"),
                run: next_prev_changes_page,
            },
            Scenario {
                name: "Direct page jump works for numbered pagination",
                file: FILE,
                tags: &["e2e", "pagination"],
                skip: None,
                run: direct_page_jump,
            },
            Scenario {
                name: "Boundary handling near last pages (known risk)",
                file: FILE,
                tags: &["e2e", "pagination"],
                skip: None,
                run: boundary_near_last_pages,
            },
        ],
    }
}
