use crate::errors::{Configuration, Error, Result};
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

/// Expectations for every source of a run, keyed by source identifier.
#[derive(Clone, Debug, Default)]
pub struct ExpectationDocument {
    entries: BTreeMap<String, SourceExpectation>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SourceExpectation {
    pub language: Option<i64>,
    pub problem_id: Option<i64>,
    pub counts: usize,
    pub expire_time: Option<Duration>,
    pub rule: ExpectationRule,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpectationRule {
    pub constraints: Vec<Constraint>,
    pub cases: Vec<CaseRule>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Constraint {
    Exact { key: String, expected: Value },
    Range(RangeConstraint),
}

/// `Min<Stem> <= <stem> <= Max<Stem>`, with both bounds checked to exist when the rule is loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct RangeConstraint {
    pub field: String,
    pub lower_key: String,
    pub upper_key: String,
    pub lower: Number,
    pub upper: Number,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CaseRule {
    pub task: usize,
    pub case: usize,
    pub rule: ExpectationRule,
}

impl RangeConstraint {
    pub fn admits(&self, actual: f64) -> bool {
        as_f64(&self.lower) <= actual && actual <= as_f64(&self.upper)
    }
}

impl ExpectationDocument {
    pub fn get(&self, source: &str) -> Option<&SourceExpectation> {
        self.entries.get(source)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SourceExpectation)> {
        self.entries.iter()
    }
}

fn range_key() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(Max|Min)(\w+)$").expect("range key pattern is valid"))
}

fn case_key() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+):(\d+)$").expect("case key pattern is valid"))
}

fn as_f64(number: &Number) -> f64 {
    number.as_f64().unwrap_or(f64::NAN)
}

pub fn parse_document(document: &Value) -> Result<ExpectationDocument> {
    let sources = document
        .as_object()
        .ok_or_else(|| Configuration("Expectation document must be a JSON object".to_string()))?;

    let mut entries = BTreeMap::new();
    for (source, entry) in sources {
        let entry = parse_entry(entry)
            .map_err(|e| in_context(format!("In expectations for {source}"), e))?;
        entries.insert(source.clone(), entry);
    }
    Ok(ExpectationDocument { entries })
}

fn parse_entry(entry: &Value) -> Result<SourceExpectation> {
    let fields = entry
        .as_object()
        .ok_or_else(|| Configuration("the entry must be a JSON object".to_string()))?;

    let mut expectation = SourceExpectation {
        language: None,
        problem_id: None,
        counts: 1,
        expire_time: None,
        rule: ExpectationRule::default(),
    };
    let mut rule_fields = Map::new();

    for (key, value) in fields {
        match key.as_str() {
            "languageType" => expectation.language = Some(integer(key, value)?),
            "problemId" | "problem_id" => expectation.problem_id = Some(integer(key, value)?),
            "counts" => {
                expectation.counts = usize::try_from(integer(key, value)?).map_err(|_| {
                    Configuration(format!("{key} must be non-negative, not {value}"))
                })?;
            }
            "expireTime" => {
                let limit = value
                    .as_f64()
                    .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
                    .ok_or_else(|| {
                        Configuration(format!(
                            "{key} must be a non-negative number of seconds, not {value}"
                        ))
                    })?;
                expectation.expire_time = Some(limit);
            }
            _ => {
                rule_fields.insert(key.clone(), value.clone());
            }
        }
    }

    expectation.rule = parse_rule(&rule_fields, true)?;
    Ok(expectation)
}

fn integer(key: &str, value: &Value) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| Configuration(format!("{key} must be an integer, not {value}")))
}

pub fn parse_rule(fields: &Map<String, Value>, top_level: bool) -> Result<ExpectationRule> {
    let mut rule = ExpectationRule::default();

    for (key, value) in fields {
        if top_level && key == "tasks" {
            rule.cases = parse_cases(value)?;
            continue;
        }

        let Some(captures) = range_key().captures(key) else {
            rule.constraints.push(Constraint::Exact {
                key: key.clone(),
                expected: value.clone(),
            });
            continue;
        };

        let stem = &captures[2];
        let lower_key = format!("Min{stem}");
        let upper_key = format!("Max{stem}");
        if &captures[1] == "Min" {
            if !fields.contains_key(&upper_key) {
                return Err(Configuration(format!("{key} is given without {upper_key}")));
            }
            // Picked up together with its Max counterpart
            continue;
        }

        let lower = fields
            .get(&lower_key)
            .ok_or_else(|| Configuration(format!("{key} is given without {lower_key}")))?;
        let range = RangeConstraint {
            field: lower_first(stem),
            lower: bound(&lower_key, lower)?,
            upper: bound(&upper_key, value)?,
            lower_key,
            upper_key,
        };
        if as_f64(&range.lower) > as_f64(&range.upper) {
            return Err(Configuration(format!(
                "{} ({}) is greater than {} ({})",
                range.lower_key, range.lower, range.upper_key, range.upper
            )));
        }
        rule.constraints.push(Constraint::Range(range));
    }

    Ok(rule)
}

fn parse_cases(value: &Value) -> Result<Vec<CaseRule>> {
    let cases = value
        .as_object()
        .ok_or_else(|| Configuration("tasks must map \"<task>:<case>\" to rules".to_string()))?;

    let mut rules = Vec::with_capacity(cases.len());
    for (key, nested) in cases {
        let captures = case_key().captures(key).ok_or_else(|| {
            Configuration(format!("tasks key {key:?} is not of the form \"<task>:<case>\""))
        })?;
        let index = |i: usize| {
            captures[i]
                .parse::<usize>()
                .map_err(|e| Configuration(format!("tasks key {key:?} is invalid: {e}")))
        };
        let fields = nested.as_object().ok_or_else(|| {
            Configuration(format!("the rule for tasks key {key:?} must be a JSON object"))
        })?;
        rules.push(CaseRule {
            task: index(1)?,
            case: index(2)?,
            rule: parse_rule(fields, false)
                .map_err(|e| in_context(format!("In tasks key {key:?}"), e))?,
        });
    }
    rules.sort_by_key(|rule| (rule.task, rule.case));
    Ok(rules)
}

fn in_context(context: String, error: Error) -> Error {
    match error {
        Configuration(message) => Configuration(format!("{context}: {message}")),
        error => error,
    }
}

fn bound(key: &str, value: &Value) -> Result<Number> {
    match value {
        Value::Number(number) => Ok(number.clone()),
        _ => Err(Configuration(format!("{key} must be a number, not {value}"))),
    }
}

fn lower_first(stem: &str) -> String {
    let mut chars = stem.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
