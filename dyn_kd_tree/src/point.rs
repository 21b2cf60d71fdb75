//! Points stored in and queried against the tree.
//!
//! A tree is generic over its point type. `[f64; D]` gives a tree whose dimension is fixed at
//! build time, so every per-axis loop has a constant trip count. `Vec<f64>` gives a tree whose
//! dimension is picked when the tree is constructed (or taken from the first inserted point).

use std::fmt;

/// Opaque label attached to every inserted point and handed back by queries.
pub type PointId = i64;

/// A vector of real coordinates with a known length.
pub trait Point: Clone + PartialEq + fmt::Debug {

    /// `Some(D)` for points whose length is part of the type, `None` for runtime-length points.
    const FIXED_DIMS: Option<usize>;

    /// A point of `dims` coordinates all equal to `value`.
    ///
    /// Fixed-length points ignore `dims`.
    fn filled(dims: usize, value: f64) -> Self;

    /// Copies `coords` into a point, or returns `None` if the length can't be represented.
    fn from_slice(coords: &[f64]) -> Option<Self>;

    fn coords(&self) -> &[f64];

    fn coords_mut(&mut self) -> &mut [f64];

    fn dims(&self) -> usize {
        self.coords().len()
    }

    /// Squared euclidean distance. Both points must have the same length.
    fn squared_distance(&self, other: &Self) -> f64 {

        let a = self.coords();
        let b = other.coords();
        assert_eq!(a.len(), b.len(), "points of different dimension");

        let mut sum = 0.0;
        for i in 0..a.len() {
            let diff = a[i] - b[i];
            sum += diff * diff;
        }

        return sum;
    }
}

impl<const D: usize> Point for [f64; D] {

    const FIXED_DIMS: Option<usize> = Some(D);

    fn filled(_dims: usize, value: f64) -> Self {
        [value; D]
    }

    fn from_slice(coords: &[f64]) -> Option<Self> {
        coords.try_into().ok()
    }

    fn coords(&self) -> &[f64] {
        self
    }

    fn coords_mut(&mut self) -> &mut [f64] {
        self
    }

    fn dims(&self) -> usize {
        D
    }

    fn squared_distance(&self, other: &Self) -> f64 {

        let mut sum = 0.0;
        for i in 0..D {
            let diff = self[i] - other[i];
            sum += diff * diff;
        }

        return sum;
    }
}

impl Point for Vec<f64> {

    const FIXED_DIMS: Option<usize> = None;

    fn filled(dims: usize, value: f64) -> Self {
        vec![value; dims]
    }

    fn from_slice(coords: &[f64]) -> Option<Self> {

        match coords.is_empty() {
            true => None,
            false => Some(coords.to_vec()),
        }
    }

    fn coords(&self) -> &[f64] {
        self
    }

    fn coords_mut(&mut self) -> &mut [f64] {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn squared_distance_fixed_and_dynamic_agree() {

        let a = [0.0, 2.0, -1.0];
        let b = [1.0, 0.5, 3.0];

        let fixed = a.squared_distance(&b);
        let dynamic = a.to_vec().squared_distance(&b.to_vec());

        assert_approx_eq!(fixed, 1.0 + 2.25 + 16.0);
        assert_approx_eq!(fixed, dynamic);
    }

    #[test]
    fn from_slice_checks_length() {

        assert_eq!(<[f64; 2]>::from_slice(&[1.0, 2.0]), Some([1.0, 2.0]));
        assert_eq!(<[f64; 2]>::from_slice(&[1.0, 2.0, 3.0]), None);
        assert_eq!(<[f64; 2]>::from_slice(&[1.0]), None);

        assert_eq!(<Vec<f64>>::from_slice(&[1.0, 2.0, 3.0]), Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(<Vec<f64>>::from_slice(&[]), None);
    }

    #[test]
    fn filled_uses_runtime_dims_only_for_vectors() {

        assert_eq!(<[f64; 4]>::filled(7, 1.5), [1.5; 4]);
        assert_eq!(<Vec<f64>>::filled(3, -2.0), vec![-2.0; 3]);
    }

    #[test]
    #[should_panic]
    fn squared_distance_panics_on_mismatched_vectors() {

        let a = vec![0.0, 1.0];
        let b = vec![0.0, 1.0, 2.0];
        a.squared_distance(&b);
    }
}
