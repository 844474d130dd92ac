use crate::verdict::{SubmissionId, Verdict};
use serde::Deserialize;

/// Every judge API reply wraps its payload in `data`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSubmission {
    pub submission_id: SubmissionId,
}

pub type SubmissionStatus = Envelope<Verdict>;
