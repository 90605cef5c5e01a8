//! Persisted state round trips through real files

use pretty_assertions::assert_eq;
use probe_factor::{append_field, set_field, Factor, FactorRegistry, Payload};
use probe_scenario::store::{read_results, read_scenarios, write_results, write_scenarios};
use probe_scenario::{
    create_scenarios, scenario_map, seed_results, ErrorEntry, Response, ResultMap, ResultsFile,
    NO_STATUS,
};
use serde_json::json;
use std::collections::BTreeMap;

fn registry() -> FactorRegistry {
    let mut registry = FactorRegistry::new();
    for (kind, values) in [("model", ["a", "b", ""]), ("temperature", ["0", "1", "-1"])] {
        for value in values {
            let negative = value.is_empty() || value.starts_with('-');
            registry.register(Factor::new(kind, format!("{kind}={value}"), negative, false, move |t: &mut Payload| {
                set_field(t, kind, json!(value));
                append_field(t, "touched", json!(kind));
            }));
        }
    }
    registry
}

#[test]
fn scenarios_round_trip_sorted_by_key() {
    let registry = registry();
    let suites = [
        registry.negative_suite("negative"),
        registry.combination_suite("pairwise", 2).unwrap(),
    ];
    let map = scenario_map(create_scenarios(&suites, Payload::new));
    assert_eq!(map.len(), 2 + 4);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("scenarios.json");
    write_scenarios(&path, &map).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"requestBody\""));

    let back = read_scenarios(&path).unwrap();
    assert_eq!(back, map);

    let keys: Vec<String> = back.keys().map(ToString::to_string).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn results_round_trip_through_gzip() {
    let registry = registry();
    let scenarios = scenario_map(create_scenarios(
        &[registry.combination_suite("pairwise", 2).unwrap()],
        Payload::new,
    ));

    let mut results = ResultMap::new();
    assert_eq!(seed_results(&mut results, &scenarios), scenarios.len());

    let mut entries = results.values_mut();
    let settled = entries.next().unwrap();
    let mut headers = BTreeMap::new();
    headers.insert("content-type".to_string(), "application/json".to_string());
    settled.response = Some(Response {
        status: 200,
        headers: Some(headers),
        body: Some(json!({"object": "list", "data": [1, 2, 3]})),
    });
    let errored = entries.next().unwrap();
    errored.errors.push(ErrorEntry::text("connection reset", NO_STATUS));
    errored.errors.push(ErrorEntry::new(json!({"error": {"code": 500}}), 500));

    let dir = tempfile::tempdir().unwrap();
    let file = ResultsFile::new(dir.path().join("results.json.gz"));
    file.save(&results).unwrap();

    let raw = std::fs::read(file.path()).unwrap();
    assert_eq!(&raw[..2], &[0x1f, 0x8b]);

    let back = file.load().unwrap();
    assert_eq!(back, results);

    write_results(file.path(), &back).unwrap();
    assert_eq!(read_results(file.path()).unwrap(), results);
}

#[test]
fn reseeding_keeps_progress() {
    let registry = registry();
    let scenarios = scenario_map(create_scenarios(&[registry.negative_suite("negative")], Payload::new));

    let mut results = ResultMap::new();
    seed_results(&mut results, &scenarios);
    let key = *results.keys().next().unwrap();
    results.get_mut(&key).unwrap().errors.push(ErrorEntry::text("x", 502));

    assert_eq!(seed_results(&mut results, &scenarios), 0);
    assert_eq!(results[&key].errors.len(), 1);
}
