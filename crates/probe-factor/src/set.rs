//! Factor sets: one test case's bundle of factors
//!
//! Members are kept sorted by factor key, so the composite key does not depend
//! on construction order and `apply` runs in a deterministic order.

use crate::factor::{Factor, FactorSnapshot, Payload};
use crate::key::FactorKey;
use serde::{Deserialize, Serialize};

/// Named, grouped bundle of factors with an order-independent key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorSet {
    name: String,
    factors: Vec<Factor>,
    group: String,
    key: FactorKey,
}

impl FactorSet {
    /// Build a set; `factors` is sorted by key before the key is computed
    pub fn new(name: impl Into<String>, factors: impl IntoIterator<Item = Factor>, group: impl Into<String>) -> Self {
        let mut factors: Vec<Factor> = factors.into_iter().collect();
        factors.sort_by(|a, b| a.key().cmp(b.key()));
        let key = FactorKey::composite(factors.iter().map(Factor::key));
        Self {
            name: name.into(),
            factors,
            group: group.into(),
            key,
        }
    }

    /// Single-factor set named after its factor
    #[must_use]
    pub fn singleton(factor: Factor, group: impl Into<String>) -> Self {
        let name = factor.name().to_string();
        Self::new(name, [factor], group)
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in key order
    #[inline]
    #[must_use]
    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    #[inline]
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &FactorKey {
        &self.key
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// New set with `extra` appended, re-sorted; name and group are kept
    #[must_use]
    pub fn expand<'a>(&'a self, extra: impl IntoIterator<Item = &'a Factor>) -> Self {
        let factors = self.factors.iter().chain(extra).cloned();
        Self::new(self.name.clone(), factors, self.group.clone())
    }

    /// Expand with each of `others`' factors, one result per other set
    #[must_use]
    pub fn combine(&self, others: &[FactorSet]) -> Vec<FactorSet> {
        others.iter().map(|other| self.expand(&other.factors)).collect()
    }

    /// Same factors under another group
    #[must_use]
    pub fn with_group(&self, group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            ..self.clone()
        }
    }

    /// Apply every member in key order
    ///
    /// Scalar fields end up with the value of the last writer; array fields
    /// accumulate in key order.
    pub fn apply(&self, target: &mut Payload) {
        for factor in &self.factors {
            factor.apply(target);
        }
    }

    /// Factor names joined by `, `
    #[must_use]
    pub fn describe(&self) -> String {
        self.factors
            .iter()
            .map(Factor::name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Serializable description of this set
    #[must_use]
    pub fn snapshot(&self) -> FactorSetSnapshot {
        FactorSetSnapshot {
            name: self.name.clone(),
            factors: self.factors.iter().map(Factor::snapshot).collect(),
            group: self.group.clone(),
            key: self.key,
        }
    }
}

/// Persisted form of a factor set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorSetSnapshot {
    pub name: String,
    pub factors: Vec<FactorSnapshot>,
    pub group: String,
    pub key: FactorKey,
}

impl FactorSetSnapshot {
    /// Factor names joined by `, `
    #[must_use]
    pub fn describe(&self) -> String {
        self.factors
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
