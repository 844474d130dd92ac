//! Test-only judge double and verdict builders.

use crate::errors::{Result, Transport};
use crate::judge::client::{Rejudger, StatusClient, Submitter};
use crate::plan::PlanEntry;
use crate::verdict::{Case, StatusCode, SubmissionId, Task, Verdict};
use async_trait::async_trait;
use serde_json::Map;
use std::collections::HashMap;
use std::sync::Mutex;

/// A resolved case with deterministic resource figures.
pub fn case(stdout: &str, exit_code: i64) -> Case {
    Case {
        stdout: stdout.to_string(),
        stderr: String::new(),
        exit_code,
        exec_time: 10.into(),
        memory_usage: 256.into(),
        status: StatusCode::Code(0),
    }
}

/// A verdict with one task holding one case, submitted just now.
pub fn verdict(id: &str, status: StatusCode, score: i64) -> Verdict {
    Verdict {
        submission_id: id.to_string(),
        score: score.into(),
        status,
        timestamp: chrono::Utc::now().timestamp() as f64,
        memory_usage: 256.into(),
        run_time: 10.into(),
        tasks: vec![Task {
            cases: vec![case("", 0)],
            extra: Map::new(),
        }],
    }
}

struct Script {
    pending_polls: usize,
    remaining: usize,
    verdict: Verdict,
    fetches: usize,
}

struct Template {
    pending_polls: usize,
    status: StatusCode,
    score: i64,
}

/// Answers status requests from per-submission scripts: pending for a fixed number of polls,
/// then a fixed verdict. Unknown ids and sources fail like an HTTP 404.
#[derive(Default)]
pub struct ScriptedJudge {
    scripts: Mutex<HashMap<SubmissionId, Script>>,
    templates: Mutex<HashMap<String, Template>>,
    submitted: Mutex<Vec<PlanEntry>>,
    rejudges: Mutex<usize>,
}

impl ScriptedJudge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, id: &str, pending_polls: usize, status: StatusCode, score: i64) {
        self.scripts.lock().unwrap().insert(
            id.to_string(),
            Script {
                pending_polls,
                remaining: pending_polls,
                verdict: verdict(id, status, score),
                fetches: 0,
            },
        );
    }

    /// Every submission of `source` gets a script built from these values.
    pub fn on_submit(&self, source: &str, pending_polls: usize, status: StatusCode, score: i64) {
        self.templates.lock().unwrap().insert(
            source.to_string(),
            Template {
                pending_polls,
                status,
                score,
            },
        );
    }

    pub fn fetches(&self, id: &str) -> usize {
        self.scripts.lock().unwrap()[id].fetches
    }

    pub fn submitted(&self) -> Vec<PlanEntry> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn rejudges(&self) -> usize {
        *self.rejudges.lock().unwrap()
    }

    fn not_found(context: String) -> crate::errors::Error {
        Transport {
            context,
            status: Some(404),
            message: "not found".to_string(),
        }
    }
}

#[async_trait]
impl StatusClient for ScriptedJudge {
    async fn fetch_status(&self, id: &SubmissionId) -> Result<Verdict> {
        let mut scripts = self.scripts.lock().unwrap();
        let script = scripts
            .get_mut(id)
            .ok_or_else(|| Self::not_found(format!("GET /submission/{id}")))?;
        script.fetches += 1;
        if script.remaining > 0 {
            script.remaining -= 1;
            let mut pending = script.verdict.clone();
            pending.status = StatusCode::PENDING;
            return Ok(pending);
        }
        Ok(script.verdict.clone())
    }
}

#[async_trait]
impl Submitter for ScriptedJudge {
    async fn submit(&self, entry: &PlanEntry) -> Result<SubmissionId> {
        let (pending_polls, status, score) = {
            let templates = self.templates.lock().unwrap();
            let template = templates
                .get(&entry.source)
                .ok_or_else(|| Self::not_found("POST /submission".to_string()))?;
            (template.pending_polls, template.status.clone(), template.score)
        };

        let id = {
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push(entry.clone());
            format!("sub-{}", submitted.len())
        };
        self.script(&id, pending_polls, status, score);
        Ok(id)
    }
}

#[async_trait]
impl Rejudger for ScriptedJudge {
    async fn rejudge(&self, id: &SubmissionId) -> Result<()> {
        let mut scripts = self.scripts.lock().unwrap();
        let script = scripts
            .get_mut(id)
            .ok_or_else(|| Self::not_found(format!("GET /submission/{id}/rejudge")))?;
        script.remaining = script.pending_polls;
        *self.rejudges.lock().unwrap() += 1;
        Ok(())
    }
}
