use crate::expectation::failure::MatchReport;
use crate::poller::PollOutcome;
use crate::verdict::SubmissionId;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const GLOBAL_TIMEOUT_STATUS: &str = "timeout expire max waiting time";

#[derive(Debug, Serialize)]
pub struct ReportEntry {
    #[serde(flatten)]
    pub outcome: PollOutcome,
    /// Empty when the judge's default archive for the language was submitted
    #[serde(skip_serializing_if = "String::is_empty")]
    pub src: String,
    #[serde(flatten)]
    pub matched: Option<MatchReport>,
}

/// Aggregated result of one pressure run, serialized as
/// `{<submission id>: entry, ..., "passTest": bool, "wait_status"?: string}`.
#[derive(Debug, Serialize)]
pub struct RunReport {
    #[serde(flatten)]
    pub entries: BTreeMap<SubmissionId, ReportEntry>,
    #[serde(rename = "passTest")]
    pub pass_test: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_status: Option<String>,
}

impl RunReport {
    pub fn new(entries: BTreeMap<SubmissionId, ReportEntry>, hit_global_timeout: bool) -> Self {
        let pass_test = !hit_global_timeout
            && entries.values().all(|entry| {
                !entry.outcome.is_timed_out()
                    && entry.matched.as_ref().map_or(true, |matched| matched.success)
            });
        Self {
            entries,
            pass_test,
            wait_status: hit_global_timeout.then(|| GLOBAL_TIMEOUT_STATUS.to_string()),
        }
    }
}

pub async fn write_report(path: &Path, report: &impl Serialize) -> Result<()> {
    let contents = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    tokio::fs::write(path, format!("{contents}\n"))
        .await
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}
