//! Merge-based comparison of two unordered sequences.
//!
//! A [`SetComparison`] sorts both inputs and walks them with two cursors,
//! producing the asymmetric differences and the union in a single pass.
//! The work happens once, on the first call to [`SetComparison::compute`] or
//! to any accessor, and the result is cached for the lifetime of the value.
//!
//! ```
//! use gemini::compare::IntSetComparison;
//!
//! let cmp = IntSetComparison::new(vec![5, 1, 3], vec![3, 8]);
//! assert_eq!(cmp.a_minus_b(), &[1, 5]);
//! assert_eq!(cmp.b_minus_a(), &[8]);
//! assert_eq!(cmp.superset(), &[1, 3, 5, 8]);
//! ```

use std::cmp::Ordering;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Comparison over 64-bit integer identifiers.
pub type IntSetComparison = SetComparison<i64>;

/// Everything a comparison produces. All vectors are in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult<T> {
    pub sorted_a: Vec<T>,
    pub sorted_b: Vec<T>,
    pub a_minus_b: Vec<T>,
    pub b_minus_a: Vec<T>,
    /// Union of both sides. Values present on both sides appear once.
    pub superset: Vec<T>,
}

#[derive(Debug)]
pub struct SetComparison<T> {
    a: Vec<T>,
    b: Vec<T>,
    result: OnceLock<ComparisonResult<T>>,
}

impl<T: Ord + Clone> SetComparison<T> {
    pub fn new(a: Vec<T>, b: Vec<T>) -> Self {
        Self {
            a,
            b,
            result: OnceLock::new(),
        }
    }

    /// Run the comparison if it has not run yet.
    pub fn compute(&self) -> &ComparisonResult<T> {
        self.result.get_or_init(|| merge(&self.a, &self.b))
    }

    pub fn sorted_a(&self) -> &[T] {
        &self.compute().sorted_a
    }

    pub fn sorted_b(&self) -> &[T] {
        &self.compute().sorted_b
    }

    pub fn a_minus_b(&self) -> &[T] {
        &self.compute().a_minus_b
    }

    pub fn b_minus_a(&self) -> &[T] {
        &self.compute().b_minus_a
    }

    pub fn superset(&self) -> &[T] {
        &self.compute().superset
    }

    /// True when neither side has an element the other lacks.
    pub fn is_identical(&self) -> bool {
        let result = self.compute();
        result.a_minus_b.is_empty() && result.b_minus_a.is_empty()
    }

    pub fn into_result(self) -> ComparisonResult<T> {
        let Self { a, b, result } = self;
        result.into_inner().unwrap_or_else(|| merge(&a, &b))
    }
}

fn merge<T: Ord + Clone>(a: &[T], b: &[T]) -> ComparisonResult<T> {
    let mut sorted_a = a.to_vec();
    let mut sorted_b = b.to_vec();
    sorted_a.sort();
    sorted_b.sort();

    let mut a_minus_b = Vec::new();
    let mut b_minus_a = Vec::new();
    let mut superset = Vec::with_capacity(sorted_a.len() + sorted_b.len());

    let (mut i, mut j) = (0, 0);
    while i < sorted_a.len() && j < sorted_b.len() {
        match sorted_a[i].cmp(&sorted_b[j]) {
            Ordering::Less => {
                a_minus_b.push(sorted_a[i].clone());
                superset.push(sorted_a[i].clone());
                i += 1;
            }
            Ordering::Greater => {
                b_minus_a.push(sorted_b[j].clone());
                superset.push(sorted_b[j].clone());
                j += 1;
            }
            Ordering::Equal => {
                superset.push(sorted_a[i].clone());
                i += 1;
                j += 1;
            }
        }
    }

    // At most one of these tails is non-empty.
    for value in &sorted_a[i..] {
        a_minus_b.push(value.clone());
        superset.push(value.clone());
    }
    for value in &sorted_b[j..] {
        b_minus_a.push(value.clone());
        superset.push(value.clone());
    }

    ComparisonResult {
        sorted_a,
        sorted_b,
        a_minus_b,
        b_minus_a,
        superset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_comparison() {
        let cmp = IntSetComparison::new(vec![5, 1, 3], vec![3, 8]);
        assert_eq!(cmp.sorted_a(), &[1, 3, 5]);
        assert_eq!(cmp.sorted_b(), &[3, 8]);
        assert_eq!(cmp.a_minus_b(), &[1, 5]);
        assert_eq!(cmp.b_minus_a(), &[8]);
        assert_eq!(cmp.superset(), &[1, 3, 5, 8]);
    }

    #[test]
    fn test_empty_sides() {
        let cmp = IntSetComparison::new(vec![], vec![4, 2]);
        assert!(cmp.a_minus_b().is_empty());
        assert_eq!(cmp.b_minus_a(), &[2, 4]);
        assert_eq!(cmp.superset(), &[2, 4]);

        let cmp = IntSetComparison::new(vec![7], vec![]);
        assert_eq!(cmp.a_minus_b(), &[7]);
        assert!(cmp.b_minus_a().is_empty());
        assert_eq!(cmp.superset(), &[7]);

        let cmp = IntSetComparison::new(vec![], vec![]);
        assert!(cmp.superset().is_empty());
        assert!(cmp.is_identical());
    }

    #[test]
    fn test_disjoint_inputs() {
        let cmp = IntSetComparison::new(vec![9, 1], vec![4, 6, 2]);
        assert_eq!(cmp.a_minus_b(), cmp.sorted_a());
        assert_eq!(cmp.b_minus_a(), cmp.sorted_b());
        assert_eq!(cmp.superset().len(), 5);
    }

    #[test]
    fn test_duplicates_within_one_side_are_kept() {
        let cmp = IntSetComparison::new(vec![2, 2, 1], vec![2]);
        assert_eq!(cmp.sorted_a(), &[1, 2, 2]);
        assert_eq!(cmp.a_minus_b(), &[1, 2]);
        assert!(cmp.b_minus_a().is_empty());
        assert_eq!(cmp.superset(), &[1, 2, 2]);
    }

    #[test]
    fn test_differences_are_disjoint_and_rebuild_union() {
        let a = vec![10, 3, 7, 1, 22, 15];
        let b = vec![7, 15, 4, 30, 1];
        let cmp = IntSetComparison::new(a.clone(), b.clone());

        for value in cmp.a_minus_b() {
            assert!(!cmp.b_minus_a().contains(value));
        }

        let mut rebuilt: Vec<i64> = cmp
            .a_minus_b()
            .iter()
            .chain(cmp.b_minus_a())
            .copied()
            .chain(a.iter().copied().filter(|v| b.contains(v)))
            .collect();
        rebuilt.sort();
        assert_eq!(rebuilt, cmp.superset());
    }

    #[test]
    fn test_identical_inputs() {
        let cmp = IntSetComparison::new(vec![3, 2, 1], vec![1, 2, 3]);
        assert!(cmp.is_identical());
        assert_eq!(cmp.superset(), &[1, 2, 3]);
    }

    #[test]
    fn test_compute_is_cached() {
        let cmp = IntSetComparison::new(vec![1, 2], vec![2, 3]);
        let first = cmp.compute() as *const _;
        let second = cmp.compute() as *const _;
        assert_eq!(first, second);
    }

    #[test]
    fn test_tuple_elements() {
        let cmp = SetComparison::new(vec![(1, 2), (1, 3)], vec![(1, 3), (2, 2)]);
        assert_eq!(cmp.a_minus_b(), &[(1, 2)]);
        assert_eq!(cmp.b_minus_a(), &[(2, 2)]);
    }

    #[test]
    fn test_into_result() {
        let result = IntSetComparison::new(vec![1], vec![2]).into_result();
        assert_eq!(result.superset, vec![1, 2]);
    }
}
