//! DiscoverQA Summary Report
//!
//! Folds the E2E run artifact (`reports/results.json`) into summary counts
//! and a failure list, then renders a standalone HTML document. The walk
//! tolerates anything: absent files, corrupt JSON, missing or misshapen
//! fields all degrade to sentinel values instead of failing the run.

pub mod render;
pub mod summary;

pub use render::{escape_html, render_html, write_report};
pub use summary::{
    read_json_safe, status_from_test, summarize, FailureRecord, TestStatus, TestSummary,
    UNKNOWN_ERROR,
};
