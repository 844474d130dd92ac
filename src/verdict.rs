use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Number, Value};
use std::fmt;

pub type SubmissionId = String;

/// Judge status code. The harness only ever interprets `Pending`; everything else is compared
/// verbatim against expectations.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StatusCode {
    Code(i64),
    Name(String),
}

impl StatusCode {
    pub const PENDING: StatusCode = StatusCode::Code(-1);

    pub fn is_pending(&self) -> bool {
        *self == Self::PENDING
    }

    fn to_value(&self) -> Value {
        match self {
            StatusCode::Code(code) => json!(code),
            StatusCode::Name(name) => json!(name),
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Code(code) => write!(f, "{code}"),
            StatusCode::Name(name) => write!(f, "{name}"),
        }
    }
}

/// Resource figures and the score are kept as the judge's own JSON numbers: pending jobs report
/// `-1` sentinels and some judges send fractional run times.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub submission_id: SubmissionId,
    pub score: Number,
    pub status: StatusCode,
    pub timestamp: f64, // seconds since epoch
    pub memory_usage: Number,
    pub run_time: Number,
    pub tasks: Vec<Task>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Task {
    pub cases: Vec<Case>,

    // Per-task summary fields (score, status, ...) are carried into the report untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i64,
    pub exec_time: Number,
    pub memory_usage: Number,
    pub status: StatusCode,
}

/// Named field lookup used by the expectation matcher. Names are the judge's camelCase keys, and
/// each level only exposes the fields expectations may talk about.
pub trait Fields {
    /// Fields compared for equality.
    fn exact(&self, name: &str) -> Option<Value>;
    /// Fields checked against a `Min<Field>`/`Max<Field>` range.
    fn measured(&self, name: &str) -> Option<&Number>;
}

impl Verdict {
    pub fn is_resolved(&self) -> bool {
        !self.status.is_pending()
    }

    pub fn case(&self, task: usize, case: usize) -> Option<&Case> {
        self.tasks.get(task)?.cases.get(case)
    }
}

impl Fields for Verdict {
    fn exact(&self, name: &str) -> Option<Value> {
        match name {
            "score" => Some(Value::Number(self.score.clone())),
            "status" => Some(self.status.to_value()),
            _ => None,
        }
    }

    fn measured(&self, name: &str) -> Option<&Number> {
        match name {
            "memoryUsage" => Some(&self.memory_usage),
            "runTime" => Some(&self.run_time),
            _ => None,
        }
    }
}

impl Fields for Case {
    fn exact(&self, name: &str) -> Option<Value> {
        Some(match name {
            "stdout" => json!(self.stdout),
            "stderr" => json!(self.stderr),
            "exitCode" => json!(self.exit_code),
            "status" => self.status.to_value(),
            _ => return None,
        })
    }

    fn measured(&self, name: &str) -> Option<&Number> {
        match name {
            "execTime" => Some(&self.exec_time),
            "memoryUsage" => Some(&self.memory_usage),
            _ => None,
        }
    }
}
