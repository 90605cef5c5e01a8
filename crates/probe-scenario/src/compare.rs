//! Comparison of two results maps
//!
//! Two methods are supported: [`CompareMethod::Base`] compares status codes
//! and content types, [`CompareMethod::Structure`] compares JSON field paths
//! of response bodies.

use crate::result::{ResultMap, ScenarioResult};
use indexmap::{IndexMap, IndexSet};
use probe_factor::FactorKey;
use serde_json::Value;
use std::fmt::{self, Write};
use std::str::FromStr;
use tracing::{info, warn};

/// Errors raised while comparing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompareError {
    /// Stored keys of a left/right pair disagree
    #[error("keys do not match: {left} != {right}")]
    KeyMismatch { left: FactorKey, right: FactorKey },

    /// Unrecognized method name
    #[error("unknown comparison method: {0}")]
    UnknownMethod(String),
}

/// Comparison method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareMethod {
    Base,
    Structure,
}

impl CompareMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Structure => "structure",
        }
    }

    /// Diffs for one pair; an empty list is a match
    ///
    /// # Errors
    /// Returns [`CompareError::KeyMismatch`] if the results disagree on key
    pub fn compare(self, left: &ScenarioResult, right: Option<&ScenarioResult>) -> Result<Vec<Diff>, CompareError> {
        match self {
            Self::Base => compare_base(left, right),
            Self::Structure => Ok(right.map(|r| compare_structure(left, r)).unwrap_or_default()),
        }
    }
}

impl fmt::Display for CompareMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompareMethod {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base" => Ok(Self::Base),
            "structure" => Ok(Self::Structure),
            other => Err(CompareError::UnknownMethod(other.to_string())),
        }
    }
}

/// One observed difference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    pub text: String,
    pub left: String,
    pub right: String,
    pub message: Option<String>,
}

impl Diff {
    fn new(text: impl Into<String>, left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            left: left.into(),
            right: right.into(),
            message: None,
        }
    }
}

fn is_failure(status: u16) -> bool {
    (400..=500).contains(&status)
}

fn compare_base(left: &ScenarioResult, right: Option<&ScenarioResult>) -> Result<Vec<Diff>, CompareError> {
    let Some(right) = right else {
        return Ok(vec![Diff::new("Right result is null", "", "")]);
    };
    if left.key != right.key {
        return Err(CompareError::KeyMismatch {
            left: left.key,
            right: right.key,
        });
    }
    let Some(l) = &left.response else {
        return Ok(vec![Diff::new("Left result is not executed", "", "")]);
    };
    let Some(r) = &right.response else {
        return Ok(vec![Diff::new("Right result is not executed", "", "")]);
    };

    let mut diffs = Vec::new();
    if l.status != r.status {
        let mut diff = Diff::new("Status code", l.status.to_string(), r.status.to_string());
        let body_text = |body: &Option<Value>| body.as_ref().map_or_else(|| "null".to_string(), Value::to_string);
        if is_failure(l.status) && r.status < 400 {
            diff.message = Some(format!("Left response body: {}", body_text(&l.body)));
        } else if is_failure(r.status) && l.status < 400 {
            diff.message = Some(format!("Right response body: {}", body_text(&r.body)));
        }
        diffs.push(diff);
    }

    let (lct, rct) = (l.content_type(), r.content_type());
    if lct != rct {
        diffs.push(Diff::new("Content-Type", lct.unwrap_or(""), rct.unwrap_or("")));
    }
    Ok(diffs)
}

fn compare_structure(left: &ScenarioResult, right: &ScenarioResult) -> Vec<Diff> {
    // status differences are reported by the base method
    let status = |r: &ScenarioResult| r.response.as_ref().map(|resp| resp.status);
    if status(left) != status(right) {
        return Vec::new();
    }
    let Some(left_body) = left.response.as_ref().and_then(|r| r.body.as_ref()) else {
        return Vec::new();
    };
    let right_body = right.response.as_ref().and_then(|r| r.body.as_ref());

    diff_structures(left_body, right_body)
        .into_iter()
        .map(|d| Diff {
            text: format!("Response body {}", d.text),
            ..d
        })
        .collect()
}

/// Field paths of a JSON value, in document order
///
/// Arrays contribute the paths of their first element under `path[]`.
#[must_use]
pub fn object_paths(value: &Value) -> IndexSet<String> {
    fn walk(value: &Value, path: &str, out: &mut IndexSet<String>) {
        match value {
            Value::Array(items) if !items.is_empty() => walk(&items[0], &format!("{path}[]"), out),
            Value::Object(map) => {
                for (key, child) in map {
                    let next = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{path}.{key}")
                    };
                    out.insert(next.clone());
                    walk(child, &next, out);
                }
            }
            _ => {}
        }
    }

    let mut out = IndexSet::new();
    walk(value, "", &mut out);
    out
}

/// Paths present on only one side; children of reported paths are skipped
#[must_use]
pub fn diff_structures(left: &Value, right: Option<&Value>) -> Vec<Diff> {
    let left_paths = object_paths(left);
    let right_paths = right.map(object_paths).unwrap_or_default();

    let mut reported: Vec<&str> = Vec::new();
    let mut diffs = Vec::new();
    let covered = |reported: &Vec<&str>, path: &str| {
        reported
            .iter()
            .any(|parent| path.strip_prefix(parent).is_some_and(|rest| rest.starts_with('.')))
    };

    for path in left_paths.iter().filter(|p| !right_paths.contains(*p)) {
        if !covered(&reported, path.as_str()) {
            diffs.push(Diff::new(format!("field '{path}' only exists in left"), path.as_str(), ""));
            reported.push(path.as_str());
        }
    }
    for path in right_paths.iter().filter(|p| !left_paths.contains(*p)) {
        if !covered(&reported, path.as_str()) {
            diffs.push(Diff::new(format!("field '{path}' only exists in right"), "", path.as_str()));
            reported.push(path.as_str());
        }
    }
    diffs
}

/// Diffs of one key under one method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub key: FactorKey,
    pub method: CompareMethod,
    pub spec: String,
    pub diffs: Vec<Diff>,
}

/// Aggregated outcome of comparing two results maps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonReport {
    /// Entries in the left map
    pub total: usize,
    /// Keys with no diffs, per method
    pub matches: IndexMap<CompareMethod, usize>,
    /// Diff counts by category, then by `left → right` change
    pub grouped: IndexMap<String, IndexMap<String, usize>>,
    /// Every comparison, in method then key order
    pub details: Vec<Comparison>,
}

impl ComparisonReport {
    /// Compare `left` against `right` with each named method
    ///
    /// Unknown method names and keys missing on the right are skipped with a
    /// log line.
    ///
    /// # Errors
    /// Returns [`CompareError::KeyMismatch`] if a stored key disagrees with
    /// its counterpart
    pub fn build(left: &ResultMap, right: &ResultMap, methods: &[String]) -> Result<Self, CompareError> {
        let mut report = Self {
            total: left.len(),
            ..Self::default()
        };

        for name in methods {
            let method = match name.parse::<CompareMethod>() {
                Ok(method) => method,
                Err(e) => {
                    warn!(error = %e, "skipping comparison method");
                    continue;
                }
            };

            for (key, l) in left {
                let Some(r) = right.get(key) else {
                    info!(%key, "key not found in right results");
                    continue;
                };
                let diffs = method.compare(l, Some(r))?;

                let matched = report.matches.entry(method).or_insert(0);
                if diffs.is_empty() {
                    *matched += 1;
                }
                for diff in &diffs {
                    let change = format!("{} → {}", diff.left, diff.right);
                    *report
                        .grouped
                        .entry(diff.text.clone())
                        .or_default()
                        .entry(change)
                        .or_insert(0) += 1;
                }
                report.details.push(Comparison {
                    key: *key,
                    method,
                    spec: l.scenario.spec.describe(),
                    diffs,
                });
            }
        }
        Ok(report)
    }

    /// Percentage of left entries matching under `method`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn match_rate(&self, method: CompareMethod) -> Option<f64> {
        let matched = *self.matches.get(&method)?;
        if self.total == 0 {
            return Some(0.0);
        }
        Some(matched as f64 / self.total as f64 * 100.0)
    }

    /// Human-readable summary; `verbose` adds per-key diffs
    #[must_use]
    pub fn render(&self, verbose: bool) -> String {
        let mut out = String::new();
        // writing to a String cannot fail
        let _ = self.write_summary(&mut out, verbose);
        out
    }

    fn write_summary(&self, out: &mut String, verbose: bool) -> fmt::Result {
        writeln!(out, "===== Final Comparison Summary =====")?;
        for (method, matched) in &self.matches {
            let rate = self.match_rate(*method).unwrap_or_default();
            let mark = if rate < 75.0 { "WARN" } else { "OK" };
            writeln!(out, "[{mark}] {method}: {rate:.2}% ({matched}/{})", self.total)?;
        }

        writeln!(out, "\n===== Summary =====")?;
        for (category, changes) in &self.grouped {
            writeln!(out, "* {category}")?;
            for (change, count) in changes {
                writeln!(out, "   {change}: {count} times")?;
            }
        }

        if verbose {
            writeln!(out, "\n===== Detailed Differences =====")?;
            for cmp in self.details.iter().filter(|c| !c.diffs.is_empty()) {
                writeln!(out, "\nKey: {} (Method: {}) {}", cmp.key, cmp.method, cmp.spec)?;
                for diff in &cmp.diffs {
                    writeln!(out, "  - {}: \"{}\" → \"{}\"", diff.text, diff.left, diff.right)?;
                    if let Some(message) = &diff.message {
                        writeln!(out, "    Message: {message}")?;
                    }
                }
            }
        }
        Ok(())
    }
}
