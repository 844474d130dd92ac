use crate::errors::Result;
use crate::expectation::failure::MatchReport;
use crate::expectation::matcher::match_top;
use crate::expectation::rule::ExpectationDocument;
use crate::judge::client::{StatusClient, Submitter};
use crate::plan::PlanEntry;
use crate::poller::{PollOutcome, PollSettings, Poller};
use crate::report::{ReportEntry, RunReport};
use crate::verdict::SubmissionId;
use futures_util::future::try_join_all;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct RunConfig {
    pub poll: PollSettings,
    pub global_timeout: Duration,
}

pub struct Orchestrator<'a, S: ?Sized, C: ?Sized> {
    submitter: &'a S,
    client: &'a C,
    config: RunConfig,
}

impl<'a, S, C> Orchestrator<'a, S, C>
where
    S: Submitter + ?Sized,
    C: StatusClient + ?Sized,
{
    pub fn new(submitter: &'a S, client: &'a C, config: RunConfig) -> Self {
        Self {
            submitter,
            client,
            config,
        }
    }

    /// Submits the whole plan at once, waits for the verdicts and checks them against
    /// `expectations`. Transport failures end the run; timeouts and unmet expectations only fail
    /// the report.
    pub async fn run(
        &self,
        plan: &[PlanEntry],
        expectations: Option<&ExpectationDocument>,
    ) -> Result<RunReport> {
        info!(submissions = plan.len(), "Dispatching submissions");
        // try_join_all keeps input order, so ids[i] belongs to plan[i]
        let ids = try_join_all(plan.iter().map(|entry| self.submitter.submit(entry))).await?;

        let per_item = per_item_limits(plan, &ids, expectations);
        info!(
            submissions = ids.len(),
            with_own_limit = per_item.len(),
            global_timeout = ?self.config.global_timeout,
            "Waiting for verdicts"
        );
        let mut poll = Poller::new(self.client, self.config.poll.clone())
            .poll(&ids, &per_item, self.config.global_timeout)
            .await?;
        let hit_global_timeout = poll.hit_global_timeout();
        info!(rounds = poll.rounds, hit_global_timeout, "Polling finished");

        let mut entries = BTreeMap::new();
        for (id, entry) in ids.iter().zip(plan) {
            let Some(outcome) = poll.outcomes.remove(id) else {
                warn!(submission_id = %id, "Judge returned the same submission id twice");
                continue;
            };
            let rule = expectations
                .and_then(|document| document.get(&entry.source))
                .map(|expectation| &expectation.rule);
            let matched = match (&outcome, rule) {
                (PollOutcome::Resolved(resolved), Some(rule)) => {
                    let report = MatchReport::new(match_top(&resolved.verdict, rule));
                    for failure in &report.fails {
                        warn!(submission_id = %id, source = %entry.source, "{failure}");
                    }
                    Some(report)
                }
                _ => None,
            };
            entries.insert(
                id.clone(),
                ReportEntry {
                    outcome,
                    src: entry.source.clone(),
                    matched,
                },
            );
        }

        let report = RunReport::new(entries, hit_global_timeout);
        info!(pass = report.pass_test, "Run finished");
        Ok(report)
    }
}

fn per_item_limits(
    plan: &[PlanEntry],
    ids: &[SubmissionId],
    expectations: Option<&ExpectationDocument>,
) -> HashMap<SubmissionId, Duration> {
    let Some(document) = expectations else {
        return HashMap::new();
    };
    ids.iter()
        .zip(plan)
        .filter_map(|(id, entry)| {
            let limit = document.get(&entry.source)?.expire_time?;
            Some((id.clone(), limit))
        })
        .collect()
}
