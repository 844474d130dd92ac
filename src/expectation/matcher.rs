use crate::expectation::failure::FailureDescriptor;
use crate::expectation::rule::{Constraint, ExpectationRule};
use crate::verdict::{Fields, Verdict};
use serde_json::Value;
use tracing::debug;

/// Checks a verdict against a rule. An empty result means the verdict satisfies every top-level
/// and per-case constraint.
pub fn match_top(verdict: &Verdict, rule: &ExpectationRule) -> Vec<FailureDescriptor> {
    let mut fails = match_fields(verdict, &rule.constraints);

    for case_rule in &rule.cases {
        let (task, case) = (case_rule.task, case_rule.case);
        match verdict.case(task, case) {
            Some(target) => fails.extend(
                match_fields(target, &case_rule.rule.constraints)
                    .into_iter()
                    .map(|failure| failure.within_case(task, case)),
            ),
            None => fails.push(FailureDescriptor::CaseMissing { task, case }),
        }
    }

    debug!(
        submission_id = %verdict.submission_id,
        failures = fails.len(),
        "Matched verdict against expectations"
    );
    fails
}

fn match_fields(target: &impl Fields, constraints: &[Constraint]) -> Vec<FailureDescriptor> {
    let mut fails = Vec::new();
    for constraint in constraints {
        match constraint {
            Constraint::Exact { key, expected } => match target.exact(key) {
                None => fails.push(FailureDescriptor::Missing { key: key.clone() }),
                Some(actual) if !same_value(&actual, expected) => {
                    fails.push(FailureDescriptor::Mismatch {
                        key: key.clone(),
                        expected: expected.clone(),
                        actual,
                    })
                }
                Some(_) => {}
            },
            Constraint::Range(range) => match target.measured(&range.field) {
                None => fails.push(FailureDescriptor::Missing {
                    key: range.field.clone(),
                }),
                Some(actual) => {
                    if !actual.as_f64().map_or(false, |value| range.admits(value)) {
                        fails.push(FailureDescriptor::OutOfRange {
                            key: range.field.clone(),
                            actual: Value::Number(actual.clone()),
                            lower_bound: range.lower.clone(),
                            upper_bound: range.upper.clone(),
                        });
                    }
                }
            },
        }
    }
    fails
}

fn same_value(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => actual == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectation::rule::parse_rule;
    use crate::testing::{case, verdict};
    use crate::verdict::StatusCode;
    use serde_json::{json, Number};

    fn rule(value: Value) -> ExpectationRule {
        parse_rule(value.as_object().unwrap(), true).unwrap()
    }

    #[test]
    fn satisfied_rule_yields_no_failures() {
        let mut target = verdict("a", StatusCode::Code(0), 100);
        target.memory_usage = 512.into();
        target.tasks[0].cases[0].exit_code = 0;

        let fails = match_top(
            &target,
            &rule(json!({
                "score": 100,
                "status": 0,
                "MaxMemoryUsage": 1024,
                "MinMemoryUsage": 0,
                "tasks": {"0:0": {"exitCode": 0}}
            })),
        );
        assert_eq!(fails, vec![]);
    }

    #[test]
    fn range_violation_reports_bounds() {
        let mut target = verdict("a", StatusCode::Code(0), 100);
        target.memory_usage = 150.into();

        let fails = match_top(
            &target,
            &rule(json!({"MaxMemoryUsage": 100, "MinMemoryUsage": 50})),
        );
        assert_eq!(
            fails,
            vec![FailureDescriptor::OutOfRange {
                key: "memoryUsage".to_string(),
                actual: json!(150),
                lower_bound: 50.into(),
                upper_bound: 100.into(),
            }]
        );
    }

    #[test]
    fn absolute_mismatch_and_unknown_key() {
        let target = verdict("a", StatusCode::Code(1), 0);
        let fails = match_top(&target, &rule(json!({"score": 100, "status": 1, "verdict": "AC"})));
        assert_eq!(
            fails,
            vec![
                FailureDescriptor::Mismatch {
                    key: "score".to_string(),
                    expected: json!(100),
                    actual: json!(0),
                },
                FailureDescriptor::Missing {
                    key: "verdict".to_string()
                },
            ]
        );
    }

    #[test]
    fn range_on_unknown_field_is_missing() {
        let target = verdict("a", StatusCode::Code(0), 100);
        let fails = match_top(&target, &rule(json!({"MaxCpuTime": 10, "MinCpuTime": 0})));
        assert_eq!(
            fails,
            vec![FailureDescriptor::Missing {
                key: "cpuTime".to_string()
            }]
        );
    }

    #[test]
    fn keys_outside_the_top_level_domain_are_missing() {
        let target = verdict("a", StatusCode::Code(0), 100);
        let fails = match_top(
            &target,
            &rule(json!({
                "submissionId": "zzz",
                "runTime": 999,
                "MaxScore": 100,
                "MinScore": 0
            })),
        );
        assert_eq!(
            fails,
            vec![
                FailureDescriptor::Missing {
                    key: "score".to_string()
                },
                FailureDescriptor::Missing {
                    key: "runTime".to_string()
                },
                FailureDescriptor::Missing {
                    key: "submissionId".to_string()
                },
            ]
        );
    }

    #[test]
    fn keys_outside_the_case_domain_are_missing() {
        let target = verdict("a", StatusCode::Code(0), 100);
        let fails = match_top(
            &target,
            &rule(json!({"tasks": {"0:0": {"execTime": 999, "MaxExitCode": 1, "MinExitCode": 0}}})),
        );
        assert_eq!(
            fails,
            vec![
                FailureDescriptor::Missing {
                    key: "task 0 case 0 exitCode".to_string()
                },
                FailureDescriptor::Missing {
                    key: "task 0 case 0 execTime".to_string()
                },
            ]
        );
    }

    #[test]
    fn fractional_measurements_are_ranged() {
        let mut target = verdict("a", StatusCode::Code(0), 100);
        target.run_time = Number::from_f64(12.5).unwrap();
        let rule = rule(json!({"MaxRunTime": 12.5, "MinRunTime": 12}));
        assert!(match_top(&target, &rule).is_empty());
    }

    #[test]
    fn numbers_compare_by_value() {
        let target = verdict("a", StatusCode::Code(0), 100);
        assert!(match_top(&target, &rule(json!({"score": 100.0}))).is_empty());
    }

    #[test]
    fn missing_case_is_a_single_failure() {
        let mut target = verdict("a", StatusCode::Code(0), 100);
        target.tasks.push(target.tasks[0].clone());

        let fails = match_top(
            &target,
            &rule(json!({"tasks": {"5:0": {"exitCode": 0, "stdout": "x"}}})),
        );
        assert_eq!(fails, vec![FailureDescriptor::CaseMissing { task: 5, case: 0 }]);
    }

    #[test]
    fn case_failures_are_prefixed() {
        let mut target = verdict("a", StatusCode::Code(0), 100);
        target.tasks[0].cases.push(case("2\n", 0));

        let fails = match_top(
            &target,
            &rule(json!({"tasks": {"0:1": {"stdout": "3\n", "MaxExecTime": 5, "MinExecTime": 0}}})),
        );
        assert_eq!(fails.len(), 2);
        assert_eq!(
            fails[0],
            FailureDescriptor::OutOfRange {
                key: "task 0 case 1 execTime".to_string(),
                actual: json!(10),
                lower_bound: 0.into(),
                upper_bound: 5.into(),
            }
        );
        assert_eq!(fails[1].to_string(), "task 0 case 1 stdout: expected \"3\\n\", got \"2\\n\"");
    }

    #[test]
    fn matching_is_repeatable() {
        let target = verdict("a", StatusCode::Code(2), 30);
        let rule = rule(json!({"score": 100, "status": 0, "tasks": {"3:3": {}}}));
        assert_eq!(match_top(&target, &rule), match_top(&target, &rule));
    }
}
