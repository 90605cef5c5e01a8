//! Factor registry and coverage strategies
//!
//! Provides [`FactorRegistry`], a per-kind catalog of factors in registration
//! order, and the three suites derived from it: negative, sanity and n-wise
//! combination.

use crate::factor::{Factor, FactorKind};
use crate::set::FactorSet;
use crate::suite::TestSuite;
use indexmap::IndexMap;
use tracing::debug;

/// Errors from suite generation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Combination size outside `2..=buckets`
    #[error("invalid combination size {n}: must be between 2 and {buckets}")]
    InvalidCombinationSize { n: usize, buckets: usize },
}

/// Per-kind catalog of factors
///
/// Buckets keep registration order, and so does every suite built from them.
#[derive(Debug, Default, Clone)]
pub struct FactorRegistry {
    buckets: IndexMap<&'static str, Vec<Factor>>,
}

impl FactorRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every variant of a kind
    pub fn register_kind<K: FactorKind>(&mut self) -> &mut Self {
        for value in K::variants() {
            self.register(Factor::of(*value));
        }
        self
    }

    /// Register one factor under its kind's bucket
    pub fn register(&mut self, factor: Factor) -> &mut Self {
        self.buckets.entry(factor.kind()).or_default().push(factor);
        self
    }

    /// Bucket of a kind, if registered
    #[must_use]
    pub fn bucket(&self, kind: &str) -> Option<&[Factor]> {
        self.buckets.get(kind).map(Vec::as_slice)
    }

    /// Kinds in registration order
    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.buckets.keys().copied()
    }

    /// Number of buckets
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Every registered factor, bucket by bucket
    pub fn factors(&self) -> impl Iterator<Item = &Factor> + '_ {
        self.buckets.values().flatten()
    }

    /// One single-factor set per negative factor
    #[must_use]
    pub fn negative_suite(&self, group: &str) -> TestSuite {
        TestSuite::singletons(self.factors().filter(|f| f.is_negative()), group)
    }

    /// One single-factor set per primary factor
    #[must_use]
    pub fn sanity_suite(&self, group: &str) -> TestSuite {
        TestSuite::singletons(self.factors().filter(|f| f.is_primary()), group)
    }

    /// Exhaustive n-wise coverage over non-negative factors
    ///
    /// For every choice of `n` distinct buckets (registration order kept, no
    /// bucket twice) emits the full cross product of their values. Set names
    /// join member names with `+`.
    ///
    /// # Errors
    /// Returns [`RegistryError::InvalidCombinationSize`] unless
    /// `2 <= n <= self.len()`.
    pub fn combination_suite(&self, group: &str, n: usize) -> Result<TestSuite, RegistryError> {
        let buckets: Vec<Vec<&Factor>> = self
            .buckets
            .values()
            .map(|bucket| bucket.iter().filter(|f| !f.is_negative()).collect())
            .collect();

        if n < 2 || n > buckets.len() {
            return Err(RegistryError::InvalidCombinationSize {
                n,
                buckets: buckets.len(),
            });
        }

        let mut sets = Vec::new();
        for chosen in bucket_choices(buckets.len(), n) {
            let picked: Vec<&[&Factor]> = chosen.iter().map(|&i| buckets[i].as_slice()).collect();
            for tuple in cross_product(&picked) {
                let name = tuple
                    .iter()
                    .map(|f| f.name())
                    .collect::<Vec<_>>()
                    .join("+");
                sets.push(FactorSet::new(name, tuple.into_iter().map(|f| (*f).clone()), group));
            }
        }

        debug!(group, n, sets = sets.len(), "built combination suite");
        Ok(TestSuite::new(sets))
    }
}

/// Every increasing index sequence of length `n` drawn from `0..count`
pub(crate) fn bucket_choices(count: usize, n: usize) -> Vec<Vec<usize>> {
    fn walk(count: usize, n: usize, start: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if current.len() == n {
            out.push(current.clone());
            return;
        }
        for i in start..count {
            current.push(i);
            walk(count, n, i + 1, current, out);
            current.pop();
        }
    }

    let mut out = Vec::new();
    walk(count, n, 0, &mut Vec::with_capacity(n), &mut out);
    out
}

/// Cartesian product, first dimension varying slowest
pub(crate) fn cross_product<'a, T>(dimensions: &[&'a [T]]) -> Vec<Vec<&'a T>> {
    dimensions.iter().fold(vec![Vec::new()], |acc, dim| {
        let dim: &'a [T] = *dim;
        acc.iter()
            .flat_map(move |prefix| {
                dim.iter().map(move |item| {
                    let mut next = prefix.clone();
                    next.push(item);
                    next
                })
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factor::{set_field, Payload};
    use serde_json::json;

    fn factor(kind: &'static str, name: &str, negative: bool, primary: bool) -> Factor {
        let field = kind;
        Factor::new(kind, format!("{kind}={name}"), negative, primary, move |t: &mut Payload| {
            set_field(t, field, json!(true));
        })
    }

    fn registry() -> FactorRegistry {
        let mut reg = FactorRegistry::new();
        reg.register(factor("a", "1", false, true))
            .register(factor("a", "2", false, false))
            .register(factor("a", "bad", true, false))
            .register(factor("b", "1", false, true))
            .register(factor("b", "2", false, false))
            .register(factor("b", "3", false, false))
            .register(factor("c", "1", false, false))
            .register(factor("c", "bad", true, false));
        reg
    }

    #[test]
    fn buckets_keep_registration_order() {
        let reg = registry();
        assert_eq!(reg.kinds().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(reg.bucket("b").map(<[Factor]>::len), Some(3));
        assert!(reg.bucket("missing").is_none());
    }

    #[test]
    fn negative_suite_has_one_set_per_negative() {
        let suite = registry().negative_suite("negative");
        let names: Vec<_> = suite.iter().map(FactorSet::name).collect();
        assert_eq!(names, vec!["a=bad", "c=bad"]);
        assert!(suite.iter().all(|s| s.len() == 1 && s.group() == "negative"));
    }

    #[test]
    fn sanity_suite_has_one_set_per_primary() {
        let suite = registry().sanity_suite("sanity");
        let names: Vec<_> = suite.iter().map(FactorSet::name).collect();
        assert_eq!(names, vec!["a=1", "b=1"]);
    }

    #[test]
    fn pairwise_counts_and_names() {
        // non-negative sizes: a=2, b=3, c=1
        let suite = registry().combination_suite("pairwise", 2).unwrap();
        assert_eq!(suite.len(), 2 * 3 + 2 + 3);
        assert_eq!(suite.sets()[0].name(), "a=1+b=1");
        assert!(suite.iter().all(|s| s.len() == 2 && s.group() == "pairwise"));
        assert!(suite.iter().all(|s| s.factors().iter().all(|f| !f.is_negative())));
    }

    #[test]
    fn three_wise_uses_every_bucket_once() {
        let suite = registry().combination_suite("triples", 3).unwrap();
        assert_eq!(suite.len(), 2 * 3);
        assert_eq!(suite.sets()[0].name(), "a=1+b=1+c=1");
    }

    #[test]
    fn combination_size_out_of_range() {
        let reg = registry();
        assert_eq!(
            reg.combination_suite("g", 1),
            Err(RegistryError::InvalidCombinationSize { n: 1, buckets: 3 })
        );
        assert_eq!(
            reg.combination_suite("g", 4),
            Err(RegistryError::InvalidCombinationSize { n: 4, buckets: 3 })
        );
    }

    #[test]
    fn bucket_choices_are_increasing() {
        assert_eq!(
            bucket_choices(4, 2),
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
        assert_eq!(bucket_choices(3, 3), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn cross_product_varies_last_fastest() {
        let left = [1, 2];
        let right = [10, 20];
        let out = cross_product(&[&left[..], &right[..]]);
        let flat: Vec<(i32, i32)> = out.iter().map(|t| (*t[0], *t[1])).collect();
        assert_eq!(flat, vec![(1, 10), (1, 20), (2, 10), (2, 20)]);
    }
}
