use crate::errors::Result;
use crate::plan::PlanEntry;
use crate::verdict::{SubmissionId, Verdict};
use async_trait::async_trait;

/// Reads the current grading state of a submission. A still-grading submission is reported as a
/// verdict whose status is pending, not as an error.
#[async_trait]
pub trait StatusClient: Send + Sync {
    async fn fetch_status(&self, id: &SubmissionId) -> Result<Verdict>;
}

/// Creates a judge job and uploads its source.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, entry: &PlanEntry) -> Result<SubmissionId>;
}

/// Asks the judge to grade an existing submission again.
#[async_trait]
pub trait Rejudger: Send + Sync {
    async fn rejudge(&self, id: &SubmissionId) -> Result<()>;
}
