//! Holds structs for representing nodes (both internal and leaf) of the kd tree.
//!
//! Nodes never own each other directly. The tree keeps one arena of internal nodes and one of
//! leaves, and children are referred to by `NodePointer`s into those arenas.

use std::fmt;

use crate::point::{Point, PointId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodePointer {
    Internal(usize),
    Leaf(usize),
}

impl fmt::Display for NodePointer {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {

        match self {
            NodePointer::Internal(index) => write!(f, "NODE {}", index),
            NodePointer::Leaf(index) => write!(f, "LEAF {}", index),
        }
    }
}

/// Smallest axis-aligned box holding a set of points.
///
/// An empty box has `lower = +inf` and `upper = -inf` on every axis, so extending it with the
/// first point makes it collapse onto that point.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox<P> {
    pub lower: P,
    pub upper: P,
}

impl<P: Point> BoundingBox<P> {

    pub fn empty(dims: usize) -> Self {

        return Self {
            lower: P::filled(dims, f64::INFINITY),
            upper: P::filled(dims, f64::NEG_INFINITY),
        };
    }

    pub fn from_entries(dims: usize, entries: &[Entry<P>]) -> Self {

        let mut bounds = Self::empty(dims);
        for entry in entries {
            bounds.extend(&entry.point);
        }

        return bounds;
    }

    pub fn extend(&mut self, point: &P) {

        let lower = self.lower.coords_mut();
        for (lb, x) in lower.iter_mut().zip(point.coords()) {
            *lb = lb.min(*x);
        }

        let upper = self.upper.coords_mut();
        for (ub, x) in upper.iter_mut().zip(point.coords()) {
            *ub = ub.max(*x);
        }
    }

    pub fn contains(&self, point: &P) -> bool {

        let lower = self.lower.coords();
        let upper = self.upper.coords();

        point.coords().iter().enumerate().all(|(i, x)| lower[i] <= *x && *x <= upper[i])
    }

    pub fn is_empty(&self) -> bool {

        let lower = self.lower.coords();
        let upper = self.upper.coords();

        (0..lower.len()).any(|i| lower[i] > upper[i])
    }

    /// Axis with the largest `upper - lower`, and that spread.
    ///
    /// The lowest axis index wins ties. Returns a spread of 0 when every point in the box is
    /// identical.
    pub fn widest_axis(&self) -> (usize, f64) {

        let lower = self.lower.coords();
        let upper = self.upper.coords();

        let mut axis = 0;
        let mut width = 0.0;
        for i in 0..lower.len() {
            let this_width = upper[i] - lower[i];
            if this_width > width {
                axis = i;
                width = this_width;
            }
        }

        return (axis, width);
    }
}

/// A point stored in a leaf.
///
/// `seq` counts insertions over the life of the tree and is what queries break distance ties on.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<P> {
    pub point: P,
    pub id: PointId,
    pub seq: u64,
}

#[derive(Debug, Clone)]
pub struct InternalNode<P> {
    pub left_child_pointer: NodePointer,
    pub right_child_pointer: NodePointer,
    pub split_axis: usize,
    pub split_value: f64,
    pub bounds: BoundingBox<P>,
    /// Number of points stored anywhere below this node.
    pub size: usize,
    /// `size` when the node was built.
    pub built_size: usize,
}

impl<P: Point> InternalNode<P> {

    /// Child a point belongs to: left when strictly below the split value, right otherwise.
    pub fn child_for(&self, point: &P) -> NodePointer {

        match point.coords()[self.split_axis] < self.split_value {
            true => self.left_child_pointer,
            false => self.right_child_pointer,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LeafNode<P> {
    pub entries: Vec<Entry<P>>,
    pub bounds: BoundingBox<P>,
}

impl<P: Point> LeafNode<P> {

    pub fn new(entries: Vec<Entry<P>>, bounds: BoundingBox<P>) -> Self {
        Self { entries, bounds }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: Entry<P>) {

        self.bounds.extend(&entry.point);
        self.entries.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(point: [f64; 2], id: PointId) -> Entry<[f64; 2]> {
        Entry { point, id, seq: id as u64 }
    }

    #[test]
    fn empty_box_collapses_onto_first_point() {

        let mut bounds = BoundingBox::<Vec<f64>>::empty(3);
        assert!(bounds.is_empty());

        bounds.extend(&vec![1.0, -2.0, 0.5]);
        assert!(!bounds.is_empty());
        assert_eq!(bounds.lower, vec![1.0, -2.0, 0.5]);
        assert_eq!(bounds.upper, vec![1.0, -2.0, 0.5]);
        assert_eq!(bounds.widest_axis(), (0, 0.0));
    }

    #[test]
    fn box_from_entries_is_tight() {

        let entries = vec![
            entry([0.0, 5.0], 0),
            entry([2.0, 1.0], 1),
            entry([-1.0, 3.0], 2),
        ];

        let bounds = BoundingBox::from_entries(2, &entries);
        assert_eq!(bounds.lower, [-1.0, 1.0]);
        assert_eq!(bounds.upper, [2.0, 5.0]);

        for e in entries.iter() {
            assert!(bounds.contains(&e.point));
        }
        assert!(!bounds.contains(&[2.5, 3.0]));
    }

    #[test]
    fn widest_axis_prefers_lowest_index_on_ties() {

        let bounds = BoundingBox { lower: [0.0, 0.0, 0.0], upper: [1.0, 3.0, 3.0] };
        assert_eq!(bounds.widest_axis(), (1, 3.0));

        let bounds = BoundingBox { lower: [0.0, 0.0], upper: [2.0, 2.0] };
        assert_eq!(bounds.widest_axis(), (0, 2.0));
    }

    #[test]
    fn child_for_sends_equal_values_right() {

        let node = InternalNode {
            left_child_pointer: NodePointer::Leaf(0),
            right_child_pointer: NodePointer::Leaf(1),
            split_axis: 1,
            split_value: 2.0,
            bounds: BoundingBox { lower: [0.0, 0.0], upper: [4.0, 4.0] },
            size: 10,
            built_size: 10,
        };

        assert_eq!(node.child_for(&[3.0, 1.9]), NodePointer::Leaf(0));
        assert_eq!(node.child_for(&[3.0, 2.0]), NodePointer::Leaf(1));
        assert_eq!(node.child_for(&[0.0, 3.0]), NodePointer::Leaf(1));
    }

    #[test]
    fn leaf_push_extends_bounds() {

        let mut leaf = LeafNode::new(Vec::new(), BoundingBox::<[f64; 2]>::empty(2));
        assert!(leaf.is_empty());

        leaf.push(entry([1.0, 1.0], 0));
        leaf.push(entry([3.0, -1.0], 1));

        assert_eq!(leaf.len(), 2);
        assert_eq!(leaf.bounds.lower, [1.0, -1.0]);
        assert_eq!(leaf.bounds.upper, [3.0, 1.0]);
    }
}
