use crate::errors::Result;
use crate::judge::client::{Rejudger, StatusClient};
use crate::poller::{PollOutcome, PollSettings, Poller};
use crate::verdict::SubmissionId;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct RejudgeReport {
    #[serde(flatten)]
    pub iterations: BTreeMap<usize, PollOutcome>,
    #[serde(rename = "timeOut")]
    pub time_out: bool,
}

/// Rejudges one submission `count` times in a row, waiting up to `max_wait` for each verdict.
pub async fn rejudge_repeatedly<C>(
    client: &C,
    id: &SubmissionId,
    count: usize,
    settings: PollSettings,
    max_wait: Duration,
) -> Result<RejudgeReport>
where
    C: StatusClient + Rejudger + ?Sized,
{
    let poller = Poller::new(client, settings);
    let mut report = RejudgeReport {
        iterations: BTreeMap::new(),
        time_out: false,
    };

    for iteration in 0..count {
        client.rejudge(id).await?;
        let mut result = poller
            .poll(std::slice::from_ref(id), &HashMap::new(), max_wait)
            .await?;
        if let Some(outcome) = result.outcomes.remove(id) {
            report.time_out |= outcome.is_timed_out();
            info!(iteration, timed_out = outcome.is_timed_out(), "Rejudge finished");
            report.iterations.insert(iteration, outcome);
        }
    }
    Ok(report)
}
