//! Testing utilities for the probe workspace
//!
//! Toy factor kinds, result fixtures, a scripted transport and an in-memory
//! checkpoint.

#![allow(missing_docs)]

use probe_factor::{set_field, FactorKey, FactorKind, FactorRegistry, Payload, TestSuite};
use probe_runner::{Checkpoint, Reply, Request, Transport, TransportError};
use probe_scenario::{create_scenarios, scenario_map, ResultMap, ScenarioResult, StoreError};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Blue,
    NotAString,
}

impl FactorKind for Color {
    const KIND: &'static str = "color";

    fn variants() -> &'static [Self] {
        &[Self::Red, Self::Green, Self::Blue, Self::NotAString]
    }

    fn name(&self) -> String {
        match self {
            Self::Red => "color=red".into(),
            Self::Green => "color=green".into(),
            Self::Blue => "color=blue".into(),
            Self::NotAString => "color=7".into(),
        }
    }

    fn is_negative(&self) -> bool {
        matches!(self, Self::NotAString)
    }

    fn is_primary(&self) -> bool {
        matches!(self, Self::Red)
    }

    fn apply(&self, target: &mut Payload) {
        let value = match self {
            Self::Red => json!("red"),
            Self::Green => json!("green"),
            Self::Blue => json!("blue"),
            Self::NotAString => json!(7),
        };
        set_field(target, "color", value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Size {
    Small,
    Large,
    Negative,
}

impl FactorKind for Size {
    const KIND: &'static str = "size";

    fn variants() -> &'static [Self] {
        &[Self::Small, Self::Large, Self::Negative]
    }

    fn name(&self) -> String {
        match self {
            Self::Small => "size=1".into(),
            Self::Large => "size=100".into(),
            Self::Negative => "size=-1".into(),
        }
    }

    fn is_negative(&self) -> bool {
        matches!(self, Self::Negative)
    }

    fn is_primary(&self) -> bool {
        matches!(self, Self::Small)
    }

    fn apply(&self, target: &mut Payload) {
        let value = match self {
            Self::Small => 1,
            Self::Large => 100,
            Self::Negative => -1,
        };
        set_field(target, "size", json!(value));
    }
}

/// Registry with [`Color`] then [`Size`]
pub fn toy_registry() -> FactorRegistry {
    let mut registry = FactorRegistry::new();
    registry.register_kind::<Color>().register_kind::<Size>();
    registry
}

/// Fresh results for every pairwise case of the toy registry (6 results)
pub fn pairwise_results() -> ResultMap {
    let suite = toy_registry().combination_suite("pairwise", 2).unwrap();
    results_for(&[suite])
}

/// Fresh, unexecuted results for the given suites
pub fn results_for(suites: &[TestSuite]) -> ResultMap {
    scenario_map(create_scenarios(suites, Payload::new))
        .into_values()
        .map(|s| (s.key, ScenarioResult::new(s)))
        .collect()
}

/// Exactly `n` fresh results (n ≤ 6)
pub fn results(n: usize) -> ResultMap {
    pairwise_results().into_iter().take(n).collect()
}

pub fn json_reply(status: u16, body: &Value) -> Reply {
    Reply::new(status)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
}

pub fn throttled_reply(remaining_requests: &str, remaining_tokens: &str) -> Reply {
    json_reply(429, &json!({"error": {"code": "rate_limit_exceeded"}}))
        .with_header("x-ratelimit-remaining-requests", remaining_requests)
        .with_header("x-ratelimit-remaining-tokens", remaining_tokens)
}

pub fn sse_reply(records: &[Value]) -> Reply {
    let mut body = String::new();
    for record in records {
        body.push_str("data: ");
        body.push_str(&record.to_string());
        body.push_str("\n\n");
    }
    body.push_str("data: [DONE]\n\n");
    Reply::new(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
}

/// Transport answering from a fixed script, recording every request
///
/// Once the script runs out every call fails as a transport error.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Reply, String>>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, reply: Reply) -> Self {
        self.script.lock().unwrap().push_back(Ok(reply));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.script.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    pub fn replies(self, reply: Reply, times: usize) -> Self {
        (0..times).fold(self, |t, _| t.reply(reply.clone()))
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Parsed JSON bodies of every request sent
    pub fn request_bodies(&self) -> Vec<Value> {
        self.requests()
            .iter()
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: Request) -> Result<Reply, TransportError> {
        self.requests.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(TransportError::Other(message)),
            None => Err(TransportError::Other("script exhausted".to_string())),
        }
    }
}

/// Checkpoint keeping every persisted snapshot in memory
#[derive(Debug, Default)]
pub struct MemoryCheckpoint {
    snapshots: Mutex<Vec<ResultMap>>,
}

impl MemoryCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<ResultMap> {
        self.snapshots.lock().unwrap().last().cloned()
    }
}

impl Checkpoint for MemoryCheckpoint {
    fn persist(&self, results: &ResultMap) -> Result<(), StoreError> {
        self.snapshots.lock().unwrap().push(results.clone());
        Ok(())
    }
}

/// Key of the `index`-th result in key order
pub fn nth_key(results: &ResultMap, index: usize) -> FactorKey {
    *results.keys().nth(index).unwrap()
}
