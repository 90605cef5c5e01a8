//! Test suites: ordered collections of factor sets
//!
//! Suites carry no identity of their own. They only exist to compose sets
//! (extend, merge, product) before scenarios are materialized.

use crate::factor::Factor;
use crate::set::FactorSet;

/// Ordered collection of factor sets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestSuite {
    sets: Vec<FactorSet>,
}

impl TestSuite {
    #[must_use]
    pub fn new(sets: Vec<FactorSet>) -> Self {
        Self { sets }
    }

    /// One single-factor set per factor
    pub fn singletons<'a>(factors: impl IntoIterator<Item = &'a Factor>, group: &str) -> Self {
        factors
            .into_iter()
            .map(|f| FactorSet::singleton(f.clone(), group))
            .collect()
    }

    #[inline]
    #[must_use]
    pub fn sets(&self) -> &[FactorSet] {
        &self.sets
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FactorSet> {
        self.sets.iter()
    }

    /// Broadcast the same fixed factors onto every set
    #[must_use]
    pub fn extend(&self, factors: &[Factor]) -> Self {
        self.sets.iter().map(|s| s.expand(factors)).collect()
    }

    /// Concatenate two suites
    #[must_use]
    pub fn merge(&self, other: &TestSuite) -> Self {
        self.sets.iter().chain(other.sets.iter()).cloned().collect()
    }

    /// Full cross join; name and group come from the left set
    #[must_use]
    pub fn product(&self, other: &TestSuite) -> Self {
        self.sets
            .iter()
            .flat_map(|left| left.combine(&other.sets))
            .collect()
    }

    /// Same sets under another group
    #[must_use]
    pub fn regroup(&self, group: &str) -> Self {
        self.sets.iter().map(|s| s.with_group(group)).collect()
    }
}

impl FromIterator<FactorSet> for TestSuite {
    fn from_iter<I: IntoIterator<Item = FactorSet>>(iter: I) -> Self {
        Self {
            sets: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for TestSuite {
    type Item = FactorSet;
    type IntoIter = std::vec::IntoIter<FactorSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.sets.into_iter()
    }
}

impl<'a> IntoIterator for &'a TestSuite {
    type Item = &'a FactorSet;
    type IntoIter = std::slice::Iter<'a, FactorSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.sets.iter()
    }
}
