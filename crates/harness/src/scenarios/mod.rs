//! Scenario suites ported against the discovery site

pub mod filters;
pub mod negative;
pub mod pagination;

use crate::runner::Suite;

/// Every suite, in execution order.
pub fn all_suites() -> Vec<Suite> {
    vec![filters::suite(), pagination::suite(), negative::suite()]
}
