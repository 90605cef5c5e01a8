//! Scenario materialization
//!
//! A [`Scenario`] is a factor set together with the payload produced by
//! applying it to a fresh base payload.

use indexmap::IndexMap;
use probe_factor::{FactorKey, FactorSetSnapshot, Payload, TestSuite};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Scenarios keyed (and therefore sorted) by factor set key
pub type ScenarioMap = BTreeMap<FactorKey, Scenario>;

/// Materialized test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub key: FactorKey,
    pub spec: FactorSetSnapshot,
    pub request_body: Payload,
}

impl Scenario {
    #[inline]
    #[must_use]
    pub fn group(&self) -> &str {
        &self.spec.group
    }
}

/// Materialize every set of every suite, in suite order
///
/// `base` is called once per scenario so payloads never share state.
pub fn create_scenarios<F>(suites: &[TestSuite], base: F) -> Vec<Scenario>
where
    F: Fn() -> Payload,
{
    let mut scenarios = Vec::with_capacity(suites.iter().map(TestSuite::len).sum());
    for set in suites.iter().flat_map(TestSuite::iter) {
        let mut body = base();
        set.apply(&mut body);
        scenarios.push(Scenario {
            key: *set.key(),
            spec: set.snapshot(),
            request_body: body,
        });
    }
    scenarios
}

/// Collect scenarios by key; a later scenario replaces an earlier one
/// with the same key
#[must_use]
pub fn scenario_map(scenarios: Vec<Scenario>) -> ScenarioMap {
    let total = scenarios.len();
    let map: ScenarioMap = scenarios.into_iter().map(|s| (s.key, s)).collect();
    if map.len() < total {
        debug!(total, unique = map.len(), "duplicate scenario keys collapsed");
    }
    map
}

/// Scenario count per group, in first-seen order
#[must_use]
pub fn group_counts<'a>(scenarios: impl IntoIterator<Item = &'a Scenario>) -> IndexMap<String, usize> {
    let mut counts = IndexMap::new();
    for scenario in scenarios {
        *counts.entry(scenario.group().to_string()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use probe_factor::{append_field, set_field, Factor, FactorSet};
    use serde_json::json;

    fn factor(name: &'static str) -> Factor {
        Factor::new("test", name, false, false, move |t| set_field(t, name, json!(1)))
    }

    #[test]
    fn create_applies_each_set_to_fresh_base() {
        let suite = TestSuite::singletons(&[factor("a"), factor("b")], "g");
        let base = || {
            let mut p = Payload::new();
            append_field(&mut p, "tags", json!("base"));
            p
        };
        let scenarios = create_scenarios(&[suite], base);

        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].request_body.get("a"), Some(&json!(1)));
        assert!(scenarios[0].request_body.get("b").is_none());
        assert_eq!(scenarios[1].request_body.get("tags"), Some(&json!(["base"])));
        assert_eq!(scenarios[0].key, scenarios[0].spec.key);
    }

    #[test]
    fn map_is_last_write_wins() {
        let a = factor("a");
        let first = TestSuite::new(vec![FactorSet::new("first", [a.clone()], "g1")]);
        let second = TestSuite::new(vec![FactorSet::new("second", [a], "g2")]);
        let scenarios = create_scenarios(&[first, second], Payload::new);

        let map = scenario_map(scenarios);
        assert_eq!(map.len(), 1);
        let only = map.values().next().unwrap();
        assert_eq!(only.spec.name, "second");
        assert_eq!(only.group(), "g2");
    }

    #[test]
    fn group_counts_in_first_seen_order() {
        let suites = [
            TestSuite::singletons(&[factor("a"), factor("b")], "negative"),
            TestSuite::singletons(&[factor("c")], "sanity"),
            TestSuite::singletons(&[factor("d")], "negative"),
        ];
        let scenarios = create_scenarios(&suites, Payload::new);
        let counts = group_counts(&scenarios);
        assert_eq!(counts.into_iter().collect::<Vec<_>>(), vec![
            ("negative".to_string(), 3),
            ("sanity".to_string(), 1)
        ]);
    }

    #[test]
    fn serializes_request_body_camel_case() {
        let scenarios = create_scenarios(&[TestSuite::singletons(&[factor("a")], "g")], Payload::new);
        let value = serde_json::to_value(&scenarios[0]).unwrap();
        assert_eq!(value["requestBody"], json!({"a": 1}));
        assert_eq!(value["key"], json!(scenarios[0].key.to_string()));
    }
}
