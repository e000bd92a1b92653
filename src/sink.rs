use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Error, Result};
use crate::report::Report;

/// Persists finished reports under the report directory, one markdown plus
/// one JSON file per invocation. Reports are append-only artifacts; existing
/// files are never overwritten.
pub struct ReportSink {
    report_dir: PathBuf,
}

impl ReportSink {
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
        }
    }

    /// Default report directory relative to a repo root.
    pub fn default_dir(repo_root: &Path) -> PathBuf {
        repo_root.join(".gander").join("reports")
    }

    /// Write the rendered markdown and the structured report. Returns the
    /// markdown path.
    pub fn write(&self, report: &Report, markdown: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.report_dir)
            .map_err(|e| Error::Sink(format!("failed to create report dir: {e}")))?;

        let stem = self.unique_stem(&format!(
            "review-{}-{}",
            report.meta.scope,
            sanitize(&report.meta.completed_at)
        ));

        let md_path = self.report_dir.join(format!("{stem}.md"));
        let json_path = self.report_dir.join(format!("{stem}.json"));

        let json = serde_json::to_string_pretty(report)
            .map_err(|e| Error::Sink(format!("failed to serialize report: {e}")))?;

        std::fs::write(&md_path, markdown)
            .map_err(|e| Error::Sink(format!("failed to write {}: {e}", md_path.display())))?;
        std::fs::write(&json_path, json)
            .map_err(|e| Error::Sink(format!("failed to write {}: {e}", json_path.display())))?;

        info!(path = %md_path.display(), "report written");
        Ok(md_path)
    }

    /// Append a numeric suffix when two runs complete within the same second.
    fn unique_stem(&self, base: &str) -> String {
        if !self.report_dir.join(format!("{base}.md")).exists() {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}-{n}");
            if !self.report_dir.join(format!("{candidate}.md")).exists() {
                return candidate;
            }
            n += 1;
        }
    }
}

fn sanitize(timestamp: &str) -> String {
    timestamp
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}
