//! CSV summary of a results map

use crate::result::{ResultMap, ScenarioResult};
use std::fmt::Write;

/// CSV header row
pub const CSV_HEADER: &str = "Scenario,Group,Status,NonTerminalLatestError,Spec";

/// Quote values containing a comma; embedded quotes are doubled
#[must_use]
pub fn escape_csv_value(value: &str) -> String {
    let escaped = value.replace('"', "\"\"");
    if escaped.contains(',') {
        format!("\"{escaped}\"")
    } else {
        escaped
    }
}

/// Status column and latest non-terminal error column for one result
#[must_use]
pub fn status_columns(result: &ScenarioResult) -> (String, String) {
    match (&result.response, result.latest_error()) {
        (Some(response), _) => (response.status.to_string(), String::new()),
        (None, Some(latest)) => (latest.status_code.to_string(), latest.message.to_string()),
        (None, None) => ("Not executed".to_string(), String::new()),
    }
}

/// Render one CSV row per result, in key order, after the header
#[must_use]
pub fn csv_report(results: &ResultMap) -> String {
    let mut csv = String::with_capacity(64 * (results.len() + 1));
    csv.push_str(CSV_HEADER);
    csv.push('\n');

    for result in results.values() {
        let (status, error) = status_columns(result);
        let key = result.scenario.key.to_string();
        let spec = result.scenario.spec.describe();
        // writing to a String cannot fail
        let _ = writeln!(
            csv,
            "{},{},{},{},{}",
            escape_csv_value(&key),
            escape_csv_value(result.scenario.group()),
            escape_csv_value(&status),
            escape_csv_value(&error),
            escape_csv_value(&spec),
        );
    }
    csv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{ErrorEntry, Response};
    use crate::scenario::{create_scenarios, scenario_map};
    use pretty_assertions::assert_eq;
    use probe_factor::{set_field, Factor, FactorSet, Payload, TestSuite};
    use serde_json::json;

    fn results() -> ResultMap {
        let a = Factor::new("t", "a=1", false, false, |t| set_field(t, "a", json!(1)));
        let b = Factor::new("t", "b=2", false, false, |t| set_field(t, "b", json!(2)));
        let suite = TestSuite::new(vec![FactorSet::new("ab", [a, b], "pairwise")]);
        scenario_map(create_scenarios(&[suite], Payload::new))
            .into_values()
            .map(|s| (s.key, ScenarioResult::new(s)))
            .collect()
    }

    #[test]
    fn escape_rules() {
        assert_eq!(escape_csv_value("plain"), "plain");
        assert_eq!(escape_csv_value("a,b"), "\"a,b\"");
        assert_eq!(escape_csv_value("say \"hi\""), "say \"\"hi\"\"");
        assert_eq!(escape_csv_value("\"x\",y"), "\"\"\"x\"\",y\"");
    }

    #[test]
    fn unexecuted_row() {
        let results = results();
        let csv = csv_report(&results);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        let row = lines.next().unwrap();
        assert!(row.contains(",pairwise,Not executed,,\"a=1, b=2\"") || row.contains(",pairwise,Not executed,,\"b=2, a=1\""));
    }

    #[test]
    fn status_prefers_response() {
        let mut result = results().into_values().next().unwrap();
        result.errors.push(ErrorEntry::text("boom", 500));
        assert_eq!(status_columns(&result), ("500".to_string(), "{\"message\":\"boom\"}".to_string()));

        result.response = Some(Response {
            status: 400,
            headers: None,
            body: None,
        });
        assert_eq!(status_columns(&result), ("400".to_string(), String::new()));
    }
}
