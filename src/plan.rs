use crate::errors::{Configuration, Result};
use crate::expectation::rule::ExpectationDocument;
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::Path;

/// One submission to dispatch. `source` doubles as the key that correlates the verdict with its
/// expectation rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanEntry {
    pub language: i64,
    pub problem_id: i64,
    pub source: String,
}

#[derive(Clone, Debug)]
pub struct PlanRequest {
    pub count: usize,
    pub language: i64,
    pub problem_id: i64,
    pub source: String,
    pub randomize: bool,
}

pub fn build_plan(
    request: &PlanRequest,
    expectations: Option<&ExpectationDocument>,
    rng: &mut impl Rng,
) -> Result<Vec<PlanEntry>> {
    let mut plan = match expectations {
        Some(document) => plan_from_expectations(request, document),
        None => plan_from_sources(request)?,
    };
    if request.randomize {
        plan.shuffle(rng);
    }
    Ok(plan)
}

fn plan_from_expectations(request: &PlanRequest, document: &ExpectationDocument) -> Vec<PlanEntry> {
    let mut plan = Vec::new();
    for (source, expectation) in document.iter() {
        let entry = PlanEntry {
            language: expectation.language.unwrap_or(request.language),
            problem_id: expectation.problem_id.unwrap_or(request.problem_id),
            source: source.clone(),
        };
        plan.extend(std::iter::repeat(entry).take(expectation.counts));
    }
    plan
}

fn plan_from_sources(request: &PlanRequest) -> Result<Vec<PlanEntry>> {
    let entry = |source: String| PlanEntry {
        language: request.language,
        problem_id: request.problem_id,
        source,
    };

    let path = Path::new(&request.source);
    if request.source.is_empty() || !path.is_dir() {
        return Ok(vec![entry(request.source.clone()); request.count]);
    }

    let mut sources = Vec::new();
    let listing = std::fs::read_dir(path)
        .map_err(|e| Configuration(format!("Cannot list {}: {e}", path.display())))?;
    for child in listing {
        let child =
            child.map_err(|e| Configuration(format!("Cannot list {}: {e}", path.display())))?;
        if child.path().is_file() {
            sources.push(child.path().to_string_lossy().into_owned());
        }
    }
    sources.sort();

    if sources.len() < request.count {
        return Err(Configuration(format!(
            "{} contains {} sources, but {} submissions were requested",
            path.display(),
            sources.len(),
            request.count
        )));
    }
    if request.count > 0 {
        sources.truncate(request.count);
    }
    Ok(sources.into_iter().map(entry).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectation::rule::parse_document;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn request(count: usize, source: &str) -> PlanRequest {
        PlanRequest {
            count,
            language: 0,
            problem_id: 1,
            source: source.to_string(),
            randomize: false,
        }
    }

    #[test]
    fn single_source_is_repeated() {
        let plan = build_plan(&request(3, "a.zip"), None, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(plan.len(), 3);
        assert!(plan.iter().all(|entry| entry.source == "a.zip"));
    }

    #[test]
    fn directory_sources_are_listed_and_truncated() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.zip", "a.zip", "c.zip"] {
            std::fs::write(dir.path().join(name), b"PK\x03\x04").unwrap();
        }
        let source = dir.path().to_string_lossy().into_owned();

        let plan = build_plan(&request(2, &source), None, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(plan.len(), 2);
        assert!(plan[0].source.ends_with("a.zip"));
        assert!(plan[1].source.ends_with("b.zip"));

        let error = build_plan(&request(4, &source), None, &mut StdRng::seed_from_u64(1));
        assert!(matches!(error, Err(Configuration(_))));
    }

    #[test]
    fn expectations_drive_the_plan() {
        let document = parse_document(&json!({
            "ac.zip": {"counts": 2, "languageType": 2, "score": 100},
            "wa.zip": {"problemId": 7, "score": 0}
        }))
        .unwrap();

        let plan = build_plan(
            &request(0, ""),
            Some(&document),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();
        assert_eq!(
            plan,
            vec![
                PlanEntry { language: 2, problem_id: 1, source: "ac.zip".to_string() },
                PlanEntry { language: 2, problem_id: 1, source: "ac.zip".to_string() },
                PlanEntry { language: 0, problem_id: 7, source: "wa.zip".to_string() },
            ]
        );
    }

    #[test]
    fn shuffle_keeps_every_entry() {
        let document = parse_document(&json!({
            "a": {"counts": 3}, "b": {"counts": 3}
        }))
        .unwrap();
        let mut req = request(0, "");
        req.randomize = true;

        let plan = build_plan(&req, Some(&document), &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(plan.len(), 6);
        assert_eq!(plan.iter().filter(|entry| entry.source == "a").count(), 3);
    }
}
