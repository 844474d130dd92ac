use crate::errors::Result;
use crate::judge::client::StatusClient;
use crate::verdict::{SubmissionId, Verdict};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct PollSettings {
    /// Pause between status rounds
    pub delay: Duration,
    /// Upper bound on concurrent status requests within one round.
    pub max_in_flight: usize,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            max_in_flight: 64,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TimeoutReason {
    #[serde(rename = "per-item timeout")]
    PerItem,
    #[serde(rename = "global timeout")]
    Global,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimeoutMarker {
    #[serde(rename = "wait_status")]
    pub reason: TimeoutReason,
    /// Seconds; only set for per-item timeouts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Resolved {
    #[serde(flatten)]
    pub verdict: Verdict,
    /// Seconds between the judge accepting the submission and the harness observing its verdict
    #[serde(rename = "elapsedTime")]
    pub elapsed: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PollOutcome {
    Resolved(Resolved),
    TimedOut(TimeoutMarker),
}

enum Slot {
    Pending,
    Settled(PollOutcome),
}

#[derive(Debug, Default)]
pub struct PollResult {
    pub outcomes: HashMap<SubmissionId, PollOutcome>,
    pub rounds: usize,
}

impl PollOutcome {
    pub fn is_timed_out(&self) -> bool {
        matches!(self, PollOutcome::TimedOut(_))
    }
}

impl PollResult {
    pub fn hit_global_timeout(&self) -> bool {
        self.outcomes.values().any(|outcome| {
            matches!(
                outcome,
                PollOutcome::TimedOut(TimeoutMarker {
                    reason: TimeoutReason::Global,
                    ..
                })
            )
        })
    }
}

pub struct Poller<'a, C: ?Sized> {
    client: &'a C,
    settings: PollSettings,
}

impl<'a, C: StatusClient + ?Sized> Poller<'a, C> {
    pub fn new(client: &'a C, settings: PollSettings) -> Self {
        Self { client, settings }
    }

    /// Polls every id until it resolves, its own limit in `per_item` passes, or `global` passes.
    ///
    /// Rounds are barrier-joined: the deadline is only checked after every status request of the
    /// round has returned, and verdicts that arrived in that round are kept. A transport failure
    /// aborts the poll once the round's in-flight requests have finished.
    pub async fn poll(
        &self,
        ids: &[SubmissionId],
        per_item: &HashMap<SubmissionId, Duration>,
        global: Duration,
    ) -> Result<PollResult> {
        let mut state: HashMap<SubmissionId, Slot> =
            ids.iter().map(|id| (id.clone(), Slot::Pending)).collect();
        if state.is_empty() {
            return Ok(PollResult::default());
        }

        let start = Instant::now();
        let mut rounds = 0;

        loop {
            rounds += 1;
            let due = self.expire_items(&mut state, per_item, start.elapsed());

            let client = self.client;
            let replies: Vec<(SubmissionId, Result<Verdict>)> = stream::iter(due)
                .map(|id| async move {
                    let reply = client.fetch_status(&id).await;
                    (id, reply)
                })
                .buffer_unordered(self.settings.max_in_flight.max(1))
                .collect()
                .await;

            let mut resolved = 0;
            for (id, reply) in replies {
                let verdict = reply?;
                if !verdict.is_resolved() {
                    continue;
                }
                let elapsed = now_epoch_secs() - verdict.timestamp;
                debug!(submission_id = %id, status = %verdict.status, elapsed, "Submission resolved");
                state.insert(id, Slot::Settled(PollOutcome::Resolved(Resolved { verdict, elapsed })));
                resolved += 1;
            }

            let outstanding = state
                .values()
                .filter(|slot| matches!(slot, Slot::Pending))
                .count();
            debug!(round = rounds, resolved, outstanding, "Poll round finished");

            if start.elapsed() >= global {
                if outstanding > 0 {
                    info!(outstanding, limit = ?global, "Global deadline passed");
                }
                break;
            }
            if outstanding == 0 {
                break;
            }
            tokio::time::sleep(self.settings.delay).await;
        }

        Ok(PollResult {
            outcomes: settle(state),
            rounds,
        })
    }

    /// Marks items whose own limit has passed and returns the ids still worth asking about.
    fn expire_items(
        &self,
        state: &mut HashMap<SubmissionId, Slot>,
        per_item: &HashMap<SubmissionId, Duration>,
        elapsed: Duration,
    ) -> Vec<SubmissionId> {
        let mut due = Vec::new();
        for (id, slot) in state.iter_mut() {
            if !matches!(slot, Slot::Pending) {
                continue;
            }
            match per_item.get(id) {
                Some(limit) if elapsed >= *limit => {
                    warn!(submission_id = %id, limit = ?limit, "Submission exceeded its own time limit");
                    *slot = Slot::Settled(PollOutcome::TimedOut(TimeoutMarker {
                        reason: TimeoutReason::PerItem,
                        limit: Some(limit.as_secs_f64()),
                    }));
                }
                _ => due.push(id.clone()),
            }
        }
        due
    }
}

/// Anything still pending when polling stops was cut off by the global deadline.
fn settle(state: HashMap<SubmissionId, Slot>) -> HashMap<SubmissionId, PollOutcome> {
    state
        .into_iter()
        .map(|(id, slot)| {
            let outcome = match slot {
                Slot::Settled(outcome) => outcome,
                Slot::Pending => PollOutcome::TimedOut(TimeoutMarker {
                    reason: TimeoutReason::Global,
                    limit: None,
                }),
            };
            (id, outcome)
        })
        .collect()
}

fn now_epoch_secs() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
