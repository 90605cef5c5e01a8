//! Factors: named, flagged test values with a payload mutation
//!
//! A factor kind is a closed enum implementing [`FactorKind`]; each variant is
//! one catalog value. [`Factor`] is the type-erased, cheaply clonable handle
//! that registries, sets and suites pass around.

use crate::key::FactorKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Request payload that factors mutate
pub type Payload = serde_json::Map<String, Value>;

/// A closed catalog of values for one request parameter
///
/// Each variant carries its flags and knows how to write itself into a
/// payload. By convention at most one of `is_negative`/`is_primary` is true.
pub trait FactorKind: Copy + fmt::Debug + Send + Sync + 'static {
    /// Bucket name used by registries
    const KIND: &'static str;

    /// Every variant, in catalog order
    fn variants() -> &'static [Self];

    /// Display name; also the source of the factor key
    fn name(&self) -> String;

    /// Value is expected to fail request validation on its own
    fn is_negative(&self) -> bool {
        false
    }

    /// Representative happy-path value of this kind
    fn is_primary(&self) -> bool {
        false
    }

    /// Write this value into the target payload
    fn apply(&self, target: &mut Payload);

    /// Type-erased handle for this variant
    fn factor(self) -> Factor {
        Factor::of(self)
    }
}

type Mutation = Box<dyn Fn(&mut Payload) + Send + Sync>;

struct FactorInner {
    kind: &'static str,
    name: String,
    key: FactorKey,
    negative: bool,
    primary: bool,
    mutation: Mutation,
}

/// Immutable, named test value
///
/// `key` is the SHA-256 of `name`: equal names always give equal keys.
#[derive(Clone)]
pub struct Factor {
    inner: Arc<FactorInner>,
}

impl Factor {
    /// Create a factor from an arbitrary mutation
    pub fn new<F>(kind: &'static str, name: impl Into<String>, negative: bool, primary: bool, mutation: F) -> Self
    where
        F: Fn(&mut Payload) + Send + Sync + 'static,
    {
        let name = name.into();
        let key = FactorKey::digest(&name);
        Self {
            inner: Arc::new(FactorInner {
                kind,
                name,
                key,
                negative,
                primary,
                mutation: Box::new(mutation),
            }),
        }
    }

    /// Create a factor from a catalog variant
    #[must_use]
    pub fn of<K: FactorKind>(value: K) -> Self {
        Self::new(
            K::KIND,
            value.name(),
            value.is_negative(),
            value.is_primary(),
            move |target| value.apply(target),
        )
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.inner.kind
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &FactorKey {
        &self.inner.key
    }

    #[inline]
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.inner.negative
    }

    #[inline]
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.inner.primary
    }

    /// Mutate the target payload
    #[inline]
    pub fn apply(&self, target: &mut Payload) {
        (self.inner.mutation)(target);
    }

    /// Serializable description of this factor
    #[must_use]
    pub fn snapshot(&self) -> FactorSnapshot {
        FactorSnapshot {
            kind: self.inner.kind.to_string(),
            name: self.inner.name.clone(),
            key: self.inner.key,
            negative: self.inner.negative,
            primary: self.inner.primary,
        }
    }
}

impl fmt::Debug for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factor")
            .field("kind", &self.inner.kind)
            .field("name", &self.inner.name)
            .field("key", &self.inner.key.short())
            .field("negative", &self.inner.negative)
            .field("primary", &self.inner.primary)
            .finish()
    }
}

impl PartialEq for Factor {
    fn eq(&self, other: &Self) -> bool {
        self.inner.key == other.inner.key
    }
}

impl Eq for Factor {}

/// Persisted form of a factor (the mutation is not serializable)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorSnapshot {
    pub kind: String,
    pub name: String,
    pub key: FactorKey,
    pub negative: bool,
    pub primary: bool,
}

/// Set a scalar field; a later write to the same field wins
#[inline]
pub fn set_field(target: &mut Payload, field: &str, value: Value) {
    target.insert(field.to_string(), value);
}

/// Append to an array field, creating it when absent
///
/// A non-array value already in the field is replaced by a fresh array.
pub fn append_field(target: &mut Payload, field: &str, value: Value) {
    let slot = target
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    match slot {
        Value::Array(items) => items.push(value),
        other => *other = Value::Array(vec![value]),
    }
}
