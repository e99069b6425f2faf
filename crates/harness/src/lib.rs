//! DiscoverQA E2E Harness
//!
//! This crate drives a real browser against the TMDB Discover site and
//! records what the network did while the UI was exercised:
//! - Spawns a Playwright driver as a Node.js subprocess and speaks a
//!   JSON-line command/event protocol with it
//! - Correlates each UI action to the API response it triggers
//! - Runs scenario suites with retries and writes a JSON run artifact
//!   for the report generator
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Scenario Runner (Rust)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner                                             │
//! │    ├── PageSession::open() -> DriverHandle (node subprocess)│
//! │    ├── HomePage::{goto, search_title, select_type, ...}     │
//! │    │       └── wait_for_api(tokens) -> ApiCapture           │
//! │    └── write_results() -> reports/results.json              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Driver protocol (JSON lines over stdio)                    │
//! │    ├── {"id": n, "cmd": "click", "selector": ...}           │
//! │    ├── {"id": n, "ok": true, "result": ...}                 │
//! │    └── {"event": "response", "seq": n, "url": ...}          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod correlate;
pub mod driver;
pub mod error;
pub mod logging;
pub mod pages;
pub mod runner;
pub mod scenarios;
pub mod session;

pub use config::{Browser, EnvironmentConfig};
pub use correlate::{
    wait_for_api, ApiCapture, RESPONSE_PREVIEW_LIMIT, TIMEOUT_SENTINEL_STATUS, TIMEOUT_SENTINEL_URL,
};
pub use driver::ResponseEvent;
pub use error::{HarnessError, HarnessResult};
pub use pages::{HomePage, MediaType};
pub use runner::{Scenario, ScenarioRunner, Suite};
pub use session::{check_site_reachable, PageSession, ResponseSource};
