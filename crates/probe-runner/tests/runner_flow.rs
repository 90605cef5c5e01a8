//! Runner state machine driven by a scripted transport

use pretty_assertions::assert_eq;
use probe_runner::{CancellationToken, RunOutcome, RunnerOptions, ScenarioRunner};
use probe_scenario::NO_STATUS;
use probe_test_utils::{
    json_reply, nth_key, results, sse_reply, throttled_reply, MemoryCheckpoint, ScriptedTransport,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn options() -> RunnerOptions {
    RunnerOptions::new("http://test.invalid/v1/things").with_max_trials(3)
}

#[tokio::test]
async fn genuine_throttle_halts_without_recording() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(json_reply(200, &json!({"ok": true})))
            .reply(throttled_reply("0", "500"))
            .reply(json_reply(200, &json!({"ok": true}))),
    );
    let results = results(3);
    let throttled_key = nth_key(&results, 1);
    let errors = Arc::new(Mutex::new(Vec::new()));
    let seen = errors.clone();

    let mut runner = ScenarioRunner::new(
        results,
        transport.clone(),
        options().on_error(move |error, key| seen.lock().unwrap().push((error.clone(), *key))),
    );
    let summary = runner.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Halted);
    assert_eq!(summary.attempts, 2);
    assert_eq!(summary.pending, 2);
    assert!(runner.is_halted());
    assert_eq!(transport.request_count(), 2);

    let throttled = &runner.results()[&throttled_key];
    assert!(throttled.response.is_none());
    assert!(throttled.errors.is_empty());
    assert_eq!(
        *errors.lock().unwrap(),
        vec![(json!({"message": "Rate limit reached"}), throttled_key)]
    );

    // halted runners refuse further work
    let again = runner.run(&CancellationToken::new()).await.unwrap();
    assert_eq!(again.outcome, RunOutcome::Halted);
    assert_eq!(again.attempts, 0);
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn speculative_throttle_is_recorded_and_run_continues() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(throttled_reply("10", "500"))
            .reply(json_reply(200, &json!({"ok": true}))),
    );
    let results = results(2);
    let first = nth_key(&results, 0);
    let second = nth_key(&results, 1);

    let mut runner = ScenarioRunner::new(results, transport.clone(), options());
    let summary = runner.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert!(!runner.is_halted());
    assert_eq!(transport.request_count(), 2);

    let throttled = &runner.results()[&first];
    assert_eq!(throttled.errors.len(), 1);
    assert_eq!(throttled.errors[0].status_code, 429);
    assert!(throttled.response.is_none());
    assert_eq!(runner.results()[&second].response.as_ref().map(|r| r.status), Some(200));
}

#[tokio::test]
async fn server_errors_exhaust_trials_across_passes() {
    let transport = Arc::new(ScriptedTransport::new().replies(json_reply(500, &json!({"error": "boom"})), 3));
    let results = results(1);
    let key = nth_key(&results, 0);

    let mut runner = ScenarioRunner::new(results, transport.clone(), options());
    let token = CancellationToken::new();
    for _ in 0..3 {
        runner.run(&token).await.unwrap();
    }

    let result = &runner.results()[&key];
    assert!(result.response.is_none());
    assert_eq!(result.errors.len(), 3);
    assert!(result.errors.iter().all(|e| e.status_code == 500));
    assert_eq!(result.errors[0].message, json!({"error": "boom"}));
    assert!(!result.is_pending(3));

    let fourth = runner.run(&token).await.unwrap();
    assert_eq!(fourth.attempts, 0);
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test]
async fn run_passes_retries_until_settled() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(json_reply(502, &json!({})))
            .fail("connection reset")
            .reply(json_reply(400, &json!({"error": {"message": "invalid"}}))),
    );
    let results = results(1);
    let key = nth_key(&results, 0);

    let mut runner = ScenarioRunner::new(results, transport.clone(), options());
    let summary = runner.run_passes(5, &CancellationToken::new()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.attempts, 3);
    assert_eq!(summary.pending, 0);
    assert_eq!(transport.request_count(), 3);

    let result = &runner.results()[&key];
    assert_eq!(result.errors.len(), 2);
    assert_eq!(result.errors[1].status_code, NO_STATUS);
    assert_eq!(
        result.errors[1].message,
        json!({"message": "Network/IO error: connection reset"})
    );
    let response = result.response.as_ref().unwrap();
    assert_eq!(response.status, 400);
    assert_eq!(response.body, Some(json!({"error": {"message": "invalid"}})));
}

#[tokio::test]
async fn client_errors_are_terminal() {
    let transport = Arc::new(ScriptedTransport::new().reply(json_reply(404, &json!({"error": "no"}))));
    let mut runner = ScenarioRunner::new(results(1), transport.clone(), options());
    let token = CancellationToken::new();

    runner.run(&token).await.unwrap();
    let second = runner.run(&token).await.unwrap();

    assert_eq!(second.attempts, 0);
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn event_stream_body_is_recorded_as_array() {
    let transport = Arc::new(ScriptedTransport::new().reply(sse_reply(&[json!({"a": 1})])));
    let results = results(1);
    let key = nth_key(&results, 0);

    let mut runner = ScenarioRunner::new(results, transport, options());
    runner.run(&CancellationToken::new()).await.unwrap();

    let response = runner.results()[&key].response.clone().unwrap();
    assert_eq!(response.body, Some(json!([{"a": 1}])));
}

#[tokio::test]
async fn requests_carry_payload_and_headers() {
    let transport = Arc::new(ScriptedTransport::new().replies(json_reply(200, &json!({})), 2));
    let results = results(2);
    let expected: Vec<Value> = results
        .values()
        .map(|r| Value::Object(r.scenario.request_body.clone()))
        .collect();

    let mut headers = BTreeMap::new();
    headers.insert("Authorization".to_string(), "Bearer k".to_string());
    let mut runner = ScenarioRunner::new(results, transport.clone(), options().with_method("PUT").with_headers(headers));
    runner.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(transport.request_bodies(), expected);
    let requests = transport.requests();
    let first = &requests[0];
    assert_eq!(first.method, "PUT");
    assert_eq!(first.url, "http://test.invalid/v1/things");
    assert_eq!(first.headers["Authorization"], "Bearer k");
}

#[tokio::test]
async fn progress_sanitize_and_checkpoint_after_every_attempt() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(json_reply(200, &json!({"id": "abc"})).with_header("set-cookie", "secret"))
            .reply(json_reply(500, &json!({}))),
    );
    let progress = Arc::new(Mutex::new(Vec::new()));
    let sanitized = Arc::new(Mutex::new(0usize));
    let checkpoint = Arc::new(MemoryCheckpoint::new());

    let p = progress.clone();
    let s = sanitized.clone();
    let options = options()
        .on_progress(move |done, total| p.lock().unwrap().push((done, total)))
        .with_header_sanitizer(Arc::new(|headers: &mut BTreeMap<String, String>| {
            headers.remove("set-cookie");
        }))
        .with_body_sanitizer(Arc::new(move |body: &mut Value| {
            *s.lock().unwrap() += 1;
            if let Some(obj) = body.as_object_mut() {
                obj.insert("id".to_string(), json!("redacted"));
            }
        }));

    let results = results(3);
    let first = nth_key(&results, 0);
    let mut runner = ScenarioRunner::new(results, transport, options).with_checkpoint(checkpoint.clone());

    // the third attempt fails as "script exhausted"
    runner.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(*progress.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    assert_eq!(*sanitized.lock().unwrap(), 3);
    assert_eq!(checkpoint.count(), 3);

    let response = runner.results()[&first].response.clone().unwrap();
    assert_eq!(response.body, Some(json!({"id": "redacted"})));
    assert!(!response.headers.unwrap().contains_key("set-cookie"));
    assert_eq!(checkpoint.last().unwrap(), *runner.results());
}

#[tokio::test]
async fn progress_counts_previously_settled_results() {
    let transport = Arc::new(ScriptedTransport::new().reply(json_reply(200, &json!({}))));
    let mut results = results(3);
    for key in [nth_key(&results, 0), nth_key(&results, 1)] {
        results.get_mut(&key).unwrap().response = Some(probe_scenario::Response {
            status: 400,
            headers: None,
            body: None,
        });
    }
    let progress = Arc::new(Mutex::new(Vec::new()));
    let p = progress.clone();

    let mut runner = ScenarioRunner::new(
        results,
        transport,
        options().on_progress(move |done, total| p.lock().unwrap().push((done, total))),
    );
    runner.run(&CancellationToken::new()).await.unwrap();
    assert_eq!(*progress.lock().unwrap(), vec![(3, 3)]);
}

#[tokio::test]
async fn cancellation_during_pacing_flushes_and_stops() {
    let transport = Arc::new(ScriptedTransport::new().replies(json_reply(200, &json!({})), 3));
    let finalizer = Arc::new(MemoryCheckpoint::new());
    let token = CancellationToken::new();

    // one request every 100 seconds; only cancellation can end the sleep
    let mut runner = ScenarioRunner::new(results(3), transport.clone(), options().with_rate_limit(0.01))
        .with_finalizer(finalizer.clone());

    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        })
    };

    let summary = tokio::time::timeout(Duration::from_secs(5), runner.run(&token))
        .await
        .unwrap()
        .unwrap();
    canceller.await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Cancelled);
    assert_eq!(summary.attempts, 1);
    assert_eq!(transport.request_count(), 1);
    assert_eq!(finalizer.count(), 1);
    assert_eq!(finalizer.last().unwrap(), *runner.results());
}

#[tokio::test]
async fn cancelled_token_prevents_any_attempt() {
    let transport = Arc::new(ScriptedTransport::new());
    let finalizer = Arc::new(MemoryCheckpoint::new());
    let token = CancellationToken::new();
    token.cancel();

    let mut runner = ScenarioRunner::new(results(2), transport.clone(), options()).with_finalizer(finalizer.clone());
    let summary = runner.run_passes(3, &token).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Cancelled);
    assert_eq!(summary.attempts, 0);
    assert_eq!(transport.request_count(), 0);
    assert_eq!(finalizer.count(), 1);
}
