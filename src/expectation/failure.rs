use serde::Serialize;
use serde_json::{Number, Value};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum FailureDescriptor {
    Missing {
        key: String,
    },
    Mismatch {
        key: String,
        expected: Value,
        actual: Value,
    },
    OutOfRange {
        key: String,
        actual: Value,
        #[serde(rename = "lowerBound")]
        lower_bound: Number,
        #[serde(rename = "upperBound")]
        upper_bound: Number,
    },
    CaseMissing {
        task: usize,
        case: usize,
    },
}

impl FailureDescriptor {
    /// Qualifies the key of a failure found inside `tasks[task].cases[case]`.
    pub fn within_case(self, task: usize, case: usize) -> Self {
        let prefix = |key: String| format!("task {task} case {case} {key}");
        match self {
            Self::Missing { key } => Self::Missing { key: prefix(key) },
            Self::Mismatch {
                key,
                expected,
                actual,
            } => Self::Mismatch {
                key: prefix(key),
                expected,
                actual,
            },
            Self::OutOfRange {
                key,
                actual,
                lower_bound,
                upper_bound,
            } => Self::OutOfRange {
                key: prefix(key),
                actual,
                lower_bound,
                upper_bound,
            },
            failure @ Self::CaseMissing { .. } => failure,
        }
    }
}

impl fmt::Display for FailureDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { key } => write!(f, "{key}: no such field in the verdict"),
            Self::Mismatch {
                key,
                expected,
                actual,
            } => write!(f, "{key}: expected {expected}, got {actual}"),
            Self::OutOfRange {
                key,
                actual,
                lower_bound,
                upper_bound,
            } => write!(
                f,
                "{key}: expected a value in [{lower_bound}, {upper_bound}], got {actual}"
            ),
            Self::CaseMissing { task, case } => {
                write!(f, "task {task} case {case}: the verdict has no such case")
            }
        }
    }
}

/// Outcome of checking one verdict against its rule.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fails: Vec<FailureDescriptor>,
}

impl MatchReport {
    pub fn new(fails: Vec<FailureDescriptor>) -> Self {
        Self {
            success: fails.is_empty(),
            fails,
        }
    }
}
