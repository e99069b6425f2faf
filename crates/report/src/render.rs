//! Rendering the summary into a standalone HTML document
//!
//! The document is self-contained: inline styles, no scripts, no external
//! assets. Every interpolated string — titles, file paths, error text — goes
//! through [`escape_html`] so a hostile error message cannot inject markup.

use std::path::Path;

use crate::summary::{TestSummary, UNKNOWN_ERROR};

/// Where the detailed (externally produced) report lives, relative to the
/// summary document.
const DETAILED_REPORT_HREF: &str = "html/index.html";

const DOC_HEAD: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>DiscoverQA Test Summary Report</title>
  <style>
    :root { --bg:#0f172a; --panel:#111827; --text:#e5e7eb; --muted:#9ca3af; --ok:#10b981; --fail:#ef4444; --skip:#f59e0b; --accent:#60a5fa; }
    body { margin:0; font-family: system-ui, -apple-system, Segoe UI, Roboto, Ubuntu, Cantarell, 'Noto Sans', 'Helvetica Neue', Arial; background: var(--bg); color: var(--text); }
    header { padding: 24px; border-bottom: 1px solid #1f2937; background: #0b1220; }
    h1 { margin: 0 0 6px; font-size: 22px; }
    .subtitle { color: var(--muted); font-size: 13px; }
    main { padding: 24px; }
    .grid { display: grid; grid-template-columns: repeat(4, minmax(160px, 1fr)); gap: 16px; margin: 20px 0; }
    .card { background: var(--panel); border: 1px solid #1f2937; border-radius: 12px; padding: 16px; }
    .card h2 { margin: 0 0 6px; font-size: 12px; color: var(--muted); font-weight: 600; letter-spacing: .4px; }
    .big { font-size: 28px; font-weight: 700; }
    .ok { color: var(--ok); }
    .fail { color: var(--fail); }
    .skip { color: var(--skip); }
    .table { width: 100%; border-collapse: collapse; border: 1px solid #1f2937; border-radius: 12px; overflow: hidden; }
    .table th, .table td { padding: 10px 12px; border-bottom: 1px solid #1f2937; font-size: 13px; }
    .table th { text-align: left; background: #0b1220; color: var(--muted); font-weight: 600; }
    .tag { display:inline-block; padding: 2px 8px; border-radius: 999px; font-size: 12px; font-weight: 600; }
    .tag.ok { background: #052e26; color: var(--ok); }
    .tag.fail { background: #3a0b0b; color: var(--fail); }
    .tag.skip { background: #3a2b06; color: var(--skip); }
    .footer { margin-top: 24px; color: var(--muted); font-size: 12px; }
    a { color: var(--accent); text-decoration: none; }
    a:hover { text-decoration: underline; }
    .code { font-family: ui-monospace, Menlo, Consolas, 'SF Mono', monospace; font-size: 12px; background: #0b1220; padding: 2px 6px; border-radius: 6px; }
  </style>
</head>
<body>
"#;

const DOC_FOOT: &str = r#"    <section class="footer">
      This summary reflects the latest execution. Re-run the e2e suite to update.
    </section>
  </main>
</body>
</html>
"#;

/// Entity-escape `& < > " '` for safe interpolation into markup.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the summary as a complete HTML document. `generated` is the
/// human-readable generation timestamp shown in the header.
pub fn render_html(summary: &TestSummary, generated: &str) -> String {
    let mut out = String::with_capacity(8 * 1024);
    out.push_str(DOC_HEAD);

    out.push_str(&format!(
        "  <header>\n    <h1>DiscoverQA Test Summary Report</h1>\n    <div class=\"subtitle\">Generated: {} · Project: TMDB Discover QA · Runner: discoverqa-harness</div>\n  </header>\n  <main>\n",
        escape_html(generated)
    ));

    // Summary cards.
    out.push_str(&format!(
        concat!(
            "    <section class=\"grid\">\n",
            "      <div class=\"card\"><h2>Total Cases</h2><div class=\"big\">{total}</div></div>\n",
            "      <div class=\"card\"><h2 class=\"ok\">Passed</h2><div class=\"big ok\">{passed}</div></div>\n",
            "      <div class=\"card\"><h2 class=\"fail\">Failed</h2><div class=\"big fail\">{failed}</div></div>\n",
            "      <div class=\"card\"><h2 class=\"skip\">Skipped</h2><div class=\"big skip\">{skipped}</div></div>\n",
            "    </section>\n\n",
        ),
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        skipped = summary.skipped,
    ));

    // Execution details.
    out.push_str(&format!(
        concat!(
            "    <section class=\"card\">\n",
            "      <h2>Execution Details</h2>\n",
            "      <table class=\"table\">\n",
            "        <thead>\n",
            "          <tr>\n",
            "            <th>Category</th>\n",
            "            <th>Value</th>\n",
            "            <th>Status</th>\n",
            "          </tr>\n",
            "        </thead>\n",
            "        <tbody>\n",
            "          <tr><td>All Tests</td><td>{total}</td><td><span class=\"tag ok\">{passed} Passed</span> · <span class=\"tag fail\">{failed} Failed</span> · <span class=\"tag skip\">{skipped} Skipped</span></td></tr>\n",
            "          <tr><td>HTML Report</td><td>reports/html/index.html</td><td><a href=\"{href}\">Open Detailed Report</a></td></tr>\n",
            "          <tr><td>JSON Report</td><td>reports/results.json</td><td><span class=\"tag\">Artifacts</span></td></tr>\n",
            "        </tbody>\n",
            "      </table>\n",
            "    </section>\n\n",
        ),
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        skipped = summary.skipped,
        href = DETAILED_REPORT_HREF,
    ));

    // Failures table.
    out.push_str(concat!(
        "    <section class=\"card\">\n",
        "      <h2>Failed Tests and Reasons</h2>\n",
        "      <table class=\"table\">\n",
        "        <thead>\n",
        "          <tr>\n",
        "            <th>Project</th>\n",
        "            <th>Test</th>\n",
        "            <th>Reason</th>\n",
        "            <th>File</th>\n",
        "          </tr>\n",
        "        </thead>\n",
        "        <tbody>\n",
    ));
    out.push_str(&failure_rows(summary));
    out.push_str(concat!(
        "        </tbody>\n",
        "      </table>\n",
        "      <p class=\"subtitle\">View traces via <span class=\"code\">npx playwright show-trace &lt;path-to-trace.zip&gt;</span> in the <span class=\"code\">test-results</span> folder.</p>\n",
        "    </section>\n\n",
    ));

    out.push_str(DOC_FOOT);
    out
}

fn failure_rows(summary: &TestSummary) -> String {
    if summary.failures.is_empty() {
        return "          <tr>\n            <td colspan=\"4\" class=\"ok\">No failures 🎉</td>\n          </tr>\n".to_string();
    }

    let mut rows = String::new();
    for failure in &summary.failures {
        let title = if failure.full_title.is_empty() {
            &failure.title
        } else {
            &failure.full_title
        };
        let reason = if failure.error_msg.is_empty() {
            UNKNOWN_ERROR
        } else {
            &failure.error_msg
        };
        rows.push_str(&format!(
            concat!(
                "          <tr>\n",
                "            <td>{project}</td>\n",
                "            <td>{title}</td>\n",
                "            <td><span class=\"code\">{reason}</span></td>\n",
                "            <td>{file}</td>\n",
                "          </tr>\n",
            ),
            project = escape_html(&failure.project_name),
            title = escape_html(title),
            reason = escape_html(reason),
            file = escape_html(&failure.file),
        ));
    }
    rows
}

/// Write the document to `path`, creating missing parent directories.
/// Re-running overwrites in place.
pub fn write_report(path: &Path, html: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::FailureRecord;

    fn failure(error_msg: &str) -> FailureRecord {
        FailureRecord {
            title: "pagination.spec.ts".to_string(),
            full_title: "Next/Previous changes page and content".to_string(),
            project_name: "chromium".to_string(),
            file: "tests/e2e/pagination.spec.ts".to_string(),
            error_msg: error_msg.to_string(),
        }
    }

    #[test]
    fn test_escape_html_covers_all_entities() {
        assert_eq!(
            escape_html(r#"<a href="x">&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_hostile_error_text_is_escaped() {
        let summary = TestSummary {
            total: 1,
            failed: 1,
            failures: vec![failure("<script>alert(1)</script>")],
            ..TestSummary::default()
        };
        let html = render_html(&summary, "2025-06-01 10:00:00");
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_empty_summary_renders_placeholder_row() {
        let html = render_html(&TestSummary::default(), "2025-06-01 10:00:00");
        assert!(html.contains("No failures"));
        assert!(html.contains("<div class=\"big\">0</div>"));
    }

    #[test]
    fn test_failure_rows_prefer_full_title() {
        let summary = TestSummary {
            total: 1,
            failed: 1,
            failures: vec![failure("Timeout 30000ms exceeded")],
            ..TestSummary::default()
        };
        let html = render_html(&summary, "now");
        assert!(html.contains("Next/Previous changes page and content"));
        assert!(html.contains("Timeout 30000ms exceeded"));
        assert!(html.contains("tests/e2e/pagination.spec.ts"));
        assert!(!html.contains("No failures"));
    }

    #[test]
    fn test_blank_error_text_falls_back() {
        let summary = TestSummary {
            total: 1,
            failed: 1,
            failures: vec![failure("")],
            ..TestSummary::default()
        };
        let html = render_html(&summary, "now");
        assert!(html.contains(UNKNOWN_ERROR));
    }

    #[test]
    fn test_generated_timestamp_in_header() {
        let html = render_html(&TestSummary::default(), "2025-06-01 10:00:00");
        assert!(html.contains("Generated: 2025-06-01 10:00:00"));
    }

    #[test]
    fn test_document_is_self_contained() {
        let html = render_html(&TestSummary::default(), "now");
        assert!(html.contains("<style>"));
        assert!(!html.contains("src="));
        assert!(!html.contains("link rel"));
    }

    #[test]
    fn test_write_report_creates_parents_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("report.html");

        write_report(&path, "<p>one</p>").unwrap();
        write_report(&path, "<p>two</p>").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<p>two</p>");
    }
}
