//! Implementation of kd-tree creation, insertion and rebuilding
//!
//! Queries live in `search.rs`.
use log::{debug, trace};

use crate::config::TreeConfig;
use crate::error::{Error, Result};
use crate::node::{BoundingBox, Entry, InternalNode, LeafNode, NodePointer};
use crate::point::{Point, PointId};

/// Dimension argument asking the tree to take its dimension from the point type, or for runtime
/// trees, from the first inserted point.
pub const INFER_DIMS: i64 = -1;

pub type FixedTree<const D: usize> = Tree<[f64; D]>;
pub type DynTree = Tree<Vec<f64>>;

pub type TreeR2 = FixedTree<2>;
pub type TreeR4 = FixedTree<4>;
pub type TreeR7 = FixedTree<7>;
pub type TreeRX = DynTree;

/// Struct to represent the kd-tree
///
/// Internal nodes and leaves are kept in separate arenas and refer to each other through
/// `NodePointer`s. Slots freed by a subtree rebuild are recycled by later allocations.
#[derive(Debug, Clone)]
pub struct Tree<P> {
    pub(crate) nodes: Vec<InternalNode<P>>,
    pub(crate) leaves: Vec<LeafNode<P>>,
    free_nodes: Vec<usize>,
    free_leaves: Vec<usize>,
    pub(crate) root: Option<NodePointer>,
    dims: Option<usize>,
    pub(crate) config: TreeConfig,
    num_points: usize,
    next_seq: u64,
    pending: usize,
}

impl<P: Point> Tree<P> {

    /// Creates an empty tree with the default config.
    ///
    /// `dims` is the point dimension, or `INFER_DIMS`. Fixed-dimension trees accept either
    /// `INFER_DIMS` or their own `D`.
    pub fn new(dims: i64) -> Result<Self> {

        return Self::with_config(dims, TreeConfig::default());
    }

    pub fn with_config(dims: i64, config: TreeConfig) -> Result<Self> {

        config.validate()?;
        let dims = match (Self::resolve_dims(dims)?, config.metric.dims()) {
            (Some(tree_dims), Some(metric_dims)) if tree_dims != metric_dims => {
                return Err(Error::invalid_argument(format!(
                    "{:?} works on {} dimensions, tree has {}",
                    config.metric, metric_dims, tree_dims
                )));
            },
            (None, metric_dims) => metric_dims,
            (tree_dims, _) => tree_dims,
        };

        return Ok(Self {
            nodes: Vec::new(),
            leaves: Vec::new(),
            free_nodes: Vec::new(),
            free_leaves: Vec::new(),
            root: None,
            dims,
            config,
            num_points: 0,
            next_seq: 0,
            pending: 0,
        });
    }

    fn resolve_dims(dims: i64) -> Result<Option<usize>> {

        match P::FIXED_DIMS {
            Some(0) => Err(Error::invalid_argument("points must have at least one dimension")),
            Some(fixed) => match dims == INFER_DIMS || dims == fixed as i64 {
                true => Ok(Some(fixed)),
                false => Err(Error::invalid_argument(format!(
                    "tree is built for {} dimensions, got {}",
                    fixed, dims
                ))),
            },
            None => match dims {
                INFER_DIMS => Ok(None),
                x if x >= 1 => Ok(Some(x as usize)),
                x => Err(Error::invalid_argument(format!(
                    "dimension must be positive or {}, got {}",
                    INFER_DIMS, x
                ))),
            },
        }
    }

    /// Point dimension, `None` until it has been inferred.
    pub fn dims(&self) -> Option<usize> {
        self.dims
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.num_points
    }

    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    /// Number of insertions made with `rebuild_now = false` since the last whole-tree rebuild.
    pub fn pending_inserts(&self) -> usize {
        self.pending
    }

    pub fn num_leaves(&self) -> usize {
        self.leaves.len() - self.free_leaves.len()
    }

    pub fn num_internal_nodes(&self) -> usize {
        self.nodes.len() - self.free_nodes.len()
    }

    /// Bounding box of every point in the tree.
    pub fn bounds(&self) -> Option<&BoundingBox<P>> {

        match self.root? {
            NodePointer::Internal(index) => Some(&self.nodes[index].bounds),
            NodePointer::Leaf(index) => Some(&self.leaves[index].bounds),
        }
    }

    /// Number of nodes on the longest root-to-leaf path. 0 for an empty tree.
    pub fn depth(&self) -> usize {

        let mut max_depth = 0;
        let mut nodes_to_check: Vec<(NodePointer, usize)> = Vec::new();

        if let Some(root) = self.root {
            nodes_to_check.push((root, 1));
        }

        while let Some((curr_pointer, depth)) = nodes_to_check.pop() {
            match curr_pointer {
                NodePointer::Leaf(_) => max_depth = max_depth.max(depth),
                NodePointer::Internal(index) => {
                    let node = &self.nodes[index];
                    nodes_to_check.push((node.left_child_pointer, depth + 1));
                    nodes_to_check.push((node.right_child_pointer, depth + 1));
                },
            }
        }

        return max_depth;
    }

    /// Every stored point with its id, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&P, PointId)> + '_ {

        self.leaves
            .iter()
            .flat_map(|leaf| leaf.entries.iter())
            .map(|entry| (&entry.point, entry.id))
    }

    /// Checks a caller-supplied coordinate slice against the tree dimension.
    pub(crate) fn to_point(&self, coords: &[f64]) -> Result<P> {

        if let Some(expected) = self.dims {
            if coords.len() != expected {
                return Err(Error::DimensionMismatch { expected, got: coords.len() });
            }
        }

        if coords.iter().any(|x| x.is_nan()) {
            return Err(Error::invalid_argument("coordinates must not be NaN"));
        }

        let point = match P::from_slice(coords) {
            Some(point) => point,
            None => return Err(Error::invalid_argument("a point needs at least one coordinate")),
        };

        self.config.metric.check_point(coords)?;

        return Ok(point);
    }

    ///Adds a point to the tree. Descends down the tree until a leaf is found, growing the bounding
    ///box of every node on the way, and appends the point to that leaf.
    ///
    ///With `rebuild_now` the tree is restructured right away: everything if earlier insertions
    ///were deferred, otherwise the highest unbalanced node on the path, otherwise the leaf if it
    ///went over `max_leaf_size`. Without it nothing moves until a later `rebuild_now` insertion
    ///or an explicit `rebuild`.
    pub fn add_point(&mut self, coords: &[f64], id: PointId, rebuild_now: bool) -> Result<()> {

        let point = self.to_point(coords)?;

        if self.dims.is_none() {
            debug!("inferred {} dimensions from the first point", point.dims());
            self.dims = Some(point.dims());
        }

        let entry = Entry { point, id, seq: self.next_seq };
        self.next_seq += 1;
        self.num_points += 1;

        let mut path: Vec<usize> = Vec::new();

        let leaf_index = match self.root {
            None => {
                let mut leaf = LeafNode::new(Vec::new(), BoundingBox::empty(entry.point.dims()));
                leaf.push(entry);

                let index = self.alloc_leaf(leaf);
                self.root = Some(NodePointer::Leaf(index));
                index
            },
            Some(root) => self.descend_and_push(root, entry, &mut path),
        };

        trace!("inserted id {} into {}", id, NodePointer::Leaf(leaf_index));

        match rebuild_now {
            false => self.pending += 1,
            true => match self.pending > 0 {
                true => self.rebuild(),
                false => self.rebalance_path(&path, leaf_index),
            },
        }

        Ok(())
    }

    fn descend_and_push(&mut self, root: NodePointer, entry: Entry<P>, path: &mut Vec<usize>) -> usize {

        let mut curr_pointer = root;

        loop {
            match curr_pointer {
                NodePointer::Leaf(index) => {
                    self.leaves[index].push(entry);
                    return index;
                },
                NodePointer::Internal(index) => {
                    let node = &mut self.nodes[index];
                    node.bounds.extend(&entry.point);
                    node.size += 1;

                    path.push(index);
                    curr_pointer = node.child_for(&entry.point);
                },
            }
        }
    }

    ///Restructures after a single insertion along `path` (internal node indices from the root down
    ///to the leaf's parent).
    fn rebalance_path(&mut self, path: &[usize], leaf_index: usize) {

        for (depth, index) in path.iter().enumerate() {
            if self.is_unbalanced(*index) {
                let parent = match depth {
                    0 => None,
                    _ => Some(path[depth - 1]),
                };
                self.rebuild_subtree(NodePointer::Internal(*index), parent);
                return;
            }
        }

        let leaf_pointer = NodePointer::Leaf(leaf_index);
        if self.leaves[leaf_index].len() > self.config.max_leaf_size && self.is_splittable(leaf_pointer) {
            self.rebuild_subtree(leaf_pointer, path.last().copied());
        }
    }

    ///A node is unbalanced when its larger child holds more than `max_imbalance` of its points.
    ///
    ///Nodes whose larger child can't be split any further, or that have seen fewer than a quarter
    ///of their build size in new insertions, are left alone: rebuilding them would give back the
    ///same shape.
    fn is_unbalanced(&self, index: usize) -> bool {

        let node = &self.nodes[index];

        let left_size = self.subtree_size(node.left_child_pointer);
        let right_size = self.subtree_size(node.right_child_pointer);

        let heavier_pointer = match left_size >= right_size {
            true => node.left_child_pointer,
            false => node.right_child_pointer,
        };
        let heavier_size = left_size.max(right_size);

        if (heavier_size as f64) <= self.config.max_imbalance * node.size as f64 {
            return false;
        }

        let inserted_since_build = node.size - node.built_size;
        if inserted_since_build * 4 < node.built_size {
            return false;
        }

        return self.is_splittable(heavier_pointer);
    }

    fn is_splittable(&self, pointer: NodePointer) -> bool {

        match pointer {
            NodePointer::Internal(_) => true,
            NodePointer::Leaf(index) => self.leaves[index].bounds.widest_axis().1 > 0.0,
        }
    }

    pub(crate) fn subtree_size(&self, pointer: NodePointer) -> usize {

        match pointer {
            NodePointer::Internal(index) => self.nodes[index].size,
            NodePointer::Leaf(index) => self.leaves[index].len(),
        }
    }

    /// Rebuilds the whole tree from scratch and clears the pending insertion count.
    pub fn rebuild(&mut self) {

        let root = match self.root {
            None => {
                self.pending = 0;
                return;
            },
            Some(x) => x,
        };

        let mut entries = Vec::with_capacity(self.num_points);
        self.take_subtree(root, &mut entries);

        self.nodes.clear();
        self.leaves.clear();
        self.free_nodes.clear();
        self.free_leaves.clear();

        self.root = Some(self.build(entries));

        debug!(
            "rebuilt tree: {} points, {} pending, {} leaves, {} internal nodes",
            self.num_points,
            self.pending,
            self.num_leaves(),
            self.num_internal_nodes()
        );

        self.pending = 0;
    }

    ///Replaces the subtree at `pointer` with a freshly built one and hooks it back into `parent`
    ///(or the root).
    fn rebuild_subtree(&mut self, pointer: NodePointer, parent: Option<usize>) {

        let size = self.subtree_size(pointer);
        let was_left = match parent {
            Some(parent_index) => self.nodes[parent_index].left_child_pointer == pointer,
            None => false,
        };

        let mut entries = Vec::with_capacity(size);
        self.take_subtree(pointer, &mut entries);

        let new_pointer = self.build(entries);

        match parent {
            None => self.root = Some(new_pointer),
            Some(parent_index) => {
                let parent_node = &mut self.nodes[parent_index];
                match was_left {
                    true => parent_node.left_child_pointer = new_pointer,
                    false => parent_node.right_child_pointer = new_pointer,
                }
            },
        }

        debug!("rebuilt subtree {} ({} points) as {}", pointer, size, new_pointer);
    }

    ///Moves every entry below `pointer` into `out` and frees the slots the subtree used.
    fn take_subtree(&mut self, pointer: NodePointer, out: &mut Vec<Entry<P>>) {

        let mut nodes_to_check = vec![pointer];

        while let Some(curr_pointer) = nodes_to_check.pop() {
            match curr_pointer {
                NodePointer::Leaf(index) => {
                    out.append(&mut self.leaves[index].entries);
                    self.free_leaves.push(index);
                },
                NodePointer::Internal(index) => {
                    let node = &self.nodes[index];
                    nodes_to_check.push(node.right_child_pointer);
                    nodes_to_check.push(node.left_child_pointer);
                    self.free_nodes.push(index);
                },
            }
        }
    }

    ///Builds a balanced subtree over `entries`, which must not be empty.
    ///
    ///Splits on the axis of largest spread at the median. Sets of at most `max_leaf_size` entries,
    ///and sets whose points are all identical, become leaves.
    fn build(&mut self, entries: Vec<Entry<P>>) -> NodePointer {

        let dims = match entries.first() {
            Some(entry) => entry.point.dims(),
            None => self.dims.unwrap_or(0),
        };
        let bounds = BoundingBox::from_entries(dims, &entries);

        if entries.len() <= self.config.max_leaf_size {
            return NodePointer::Leaf(self.alloc_leaf(LeafNode::new(entries, bounds)));
        }

        let (split_axis, spread) = bounds.widest_axis();
        if spread <= 0.0 {
            return NodePointer::Leaf(self.alloc_leaf(LeafNode::new(entries, bounds)));
        }

        let split_value = split_threshold(&entries, split_axis);
        let size = entries.len();

        let (left, right): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|entry| entry.point.coords()[split_axis] < split_value);

        let left_child_pointer = self.build(left);
        let right_child_pointer = self.build(right);

        return self.alloc_node(InternalNode {
            left_child_pointer,
            right_child_pointer,
            split_axis,
            split_value,
            bounds,
            size,
            built_size: size,
        });
    }

    fn alloc_leaf(&mut self, leaf: LeafNode<P>) -> usize {

        match self.free_leaves.pop() {
            Some(index) => {
                self.leaves[index] = leaf;
                index
            },
            None => {
                self.leaves.push(leaf);
                self.leaves.len() - 1
            },
        }
    }

    fn alloc_node(&mut self, node: InternalNode<P>) -> NodePointer {

        match self.free_nodes.pop() {
            Some(index) => {
                self.nodes[index] = node;
                NodePointer::Internal(index)
            },
            None => {
                self.nodes.push(node);
                NodePointer::Internal(self.nodes.len() - 1)
            },
        }
    }
}

///Split value along `axis`: the median, or when the median is also the smallest value, the next
///larger one. Either way both sides of the split end up non-empty, as long as the values along
///`axis` are not all equal.
fn split_threshold<P: Point>(entries: &[Entry<P>], axis: usize) -> f64 {

    let mut values: Vec<f64> = entries.iter().map(|x| x.point.coords()[axis]).collect();

    let mid = values.len() / 2;
    let median = {
        let (_, median, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
        *median
    };

    let has_lower = values[..mid].iter().any(|x| *x < median);
    if has_lower {
        return median;
    }

    return values
        .iter()
        .copied()
        .filter(|x| *x > median)
        .fold(f64::INFINITY, f64::min);
}

#[cfg(test)]
impl<P: Point> Tree<P> {

    ///Walks the whole tree and panics on any broken structural invariant.
    pub(crate) fn check_invariants(&self) {

        let root = match self.root {
            None => {
                assert_eq!(self.num_points, 0);
                return;
            },
            Some(x) => x,
        };

        let mut seen = 0;
        let mut nodes_to_check = vec![root];

        while let Some(curr_pointer) = nodes_to_check.pop() {
            match curr_pointer {
                NodePointer::Leaf(index) => {
                    let leaf = &self.leaves[index];
                    assert!(!leaf.is_empty(), "empty leaf {}", curr_pointer);

                    let dims = self.dims.unwrap();
                    let tight = BoundingBox::from_entries(dims, &leaf.entries);
                    assert_eq!(leaf.bounds, tight, "loose bounds at {}", curr_pointer);

                    seen += leaf.len();
                },
                NodePointer::Internal(index) => {
                    let node = &self.nodes[index];

                    let mut below = Vec::new();
                    self.collect(node.left_child_pointer, &mut below);
                    let left_count = below.len();
                    self.collect(node.right_child_pointer, &mut below);

                    assert!(left_count > 0, "empty left child at {}", curr_pointer);
                    assert!(below.len() > left_count, "empty right child at {}", curr_pointer);
                    assert_eq!(node.size, below.len(), "wrong size at {}", curr_pointer);

                    for (i, entry) in below.iter().enumerate() {
                        let x = entry.point.coords()[node.split_axis];
                        match i < left_count {
                            true => assert!(x < node.split_value),
                            false => assert!(x >= node.split_value),
                        }
                    }

                    let tight = BoundingBox::from_entries(self.dims.unwrap(), &below);
                    assert_eq!(node.bounds, tight, "loose bounds at {}", curr_pointer);

                    nodes_to_check.push(node.left_child_pointer);
                    nodes_to_check.push(node.right_child_pointer);
                },
            }
        }

        assert_eq!(seen, self.num_points);
        assert_eq!(self.iter().count(), self.num_points);
    }

    fn collect(&self, pointer: NodePointer, out: &mut Vec<Entry<P>>) {

        match pointer {
            NodePointer::Leaf(index) => out.extend(self.leaves[index].entries.iter().cloned()),
            NodePointer::Internal(index) => {
                let node = &self.nodes[index];
                self.collect(node.left_child_pointer, out);
                self.collect(node.right_child_pointer, out);
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::Metric;
    use rand::prelude::*;

    fn small_leaves() -> TreeConfig {

        let mut config = TreeConfig::default();
        config.max_leaf_size = 4;
        return config;
    }

    fn random_point(rng: &mut StdRng, dims: usize) -> Vec<f64> {
        (0..dims).map(|_| rng.gen::<f64>()).collect()
    }

    #[test]
    fn construct_runtime_tree() {

        let tree = TreeRX::new(3).unwrap();
        assert_eq!(tree.dims(), Some(3));
        assert!(tree.is_empty());
        assert_eq!(tree.depth(), 0);
        assert!(tree.bounds().is_none());

        let tree = TreeRX::new(INFER_DIMS).unwrap();
        assert_eq!(tree.dims(), None);

        assert!(matches!(TreeRX::new(0), Err(Error::InvalidArgument(_))));
        assert!(matches!(TreeRX::new(-2), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn construct_fixed_tree() {

        assert_eq!(TreeR2::new(INFER_DIMS).unwrap().dims(), Some(2));
        assert_eq!(TreeR4::new(4).unwrap().dims(), Some(4));
        assert_eq!(TreeR7::new(-1).unwrap().dims(), Some(7));

        assert!(matches!(TreeR2::new(3), Err(Error::InvalidArgument(_))));
        assert!(matches!(TreeR2::new(0), Err(Error::InvalidArgument(_))));
        assert!(matches!(FixedTree::<0>::new(INFER_DIMS), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn construct_with_bad_config() {

        let mut config = TreeConfig::default();
        config.max_leaf_size = 0;
        assert!(matches!(TreeR2::with_config(2, config), Err(Error::InvalidArgument(_))));

        let mut config = TreeConfig::default();
        config.metric = Metric::Manhattan;
        let tree = TreeRX::with_config(5, config.clone()).unwrap();
        assert_eq!(tree.config(), &config);
    }

    #[test]
    fn dimension_mismatch_on_insert() {

        let mut tree = TreeR2::new(-1).unwrap();
        let err = tree.add_point(&[1.0], 0, true).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, got: 1 }));

        let mut tree = TreeRX::new(3).unwrap();
        tree.add_point(&[1.0, 2.0, 3.0], 0, true).unwrap();
        let err = tree.add_point(&[1.0, 2.0], 1, true).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, got: 2 }));

        assert_eq!(tree.len(), 1);
        tree.check_invariants();
    }

    #[test]
    fn infer_dims_from_first_point() {

        let mut tree = TreeRX::new(INFER_DIMS).unwrap();
        assert!(matches!(tree.add_point(&[], 0, true), Err(Error::InvalidArgument(_))));

        tree.add_point(&[1.0, 2.0, 3.0], 0, true).unwrap();
        assert_eq!(tree.dims(), Some(3));

        let err = tree.add_point(&[1.0, 2.0], 1, true).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, got: 2 }));
    }

    #[test]
    fn metric_fixes_the_dimension() {

        let mut config = TreeConfig::default();
        config.metric = Metric::SO3Squared;

        let tree = TreeRX::with_config(INFER_DIMS, config.clone()).unwrap();
        assert_eq!(tree.dims(), Some(4));
        assert!(TreeR4::with_config(INFER_DIMS, config.clone()).is_ok());
        assert!(matches!(TreeR2::with_config(INFER_DIMS, config.clone()), Err(Error::InvalidArgument(_))));
        assert!(matches!(TreeRX::with_config(3, config), Err(Error::InvalidArgument(_))));

        let mut config = TreeConfig::default();
        config.metric = Metric::combined(&["Rn:3", "SO3"]).unwrap();
        assert_eq!(TreeR7::with_config(INFER_DIMS, config).unwrap().dims(), Some(7));
    }

    #[test]
    fn states_outside_the_space_are_rejected() {

        let mut config = TreeConfig::default();
        config.metric = Metric::R2SO2 { angular_weight: 1.0 };
        let mut tree = TreeRX::with_config(INFER_DIMS, config).unwrap();

        tree.add_point(&[5.0, -5.0, 3.0], 0, true).unwrap();
        assert!(matches!(tree.add_point(&[0.0, 0.0, 3.5], 1, true), Err(Error::InvalidArgument(_))));
        assert!(matches!(tree.search(&[0.0, 0.0, -4.0]), Err(Error::InvalidArgument(_))));
        assert_eq!(tree.len(), 1);

        let mut config = TreeConfig::default();
        config.metric = Metric::SO3;
        let mut tree = TreeR4::with_config(INFER_DIMS, config).unwrap();
        assert!(matches!(tree.add_point(&[1.0, 1.0, 0.0, 0.0], 0, true), Err(Error::InvalidArgument(_))));
        tree.add_point(&[0.0, 0.0, 0.0, 1.0], 0, true).unwrap();
    }

    #[test]
    fn nan_coordinates_are_rejected() {

        let mut tree = TreeR2::new(-1).unwrap();
        assert!(matches!(tree.add_point(&[f64::NAN, 0.0], 0, true), Err(Error::InvalidArgument(_))));
        assert!(tree.is_empty());
    }

    #[test]
    fn quick_tree_new() {

        let mut rng = StdRng::seed_from_u64(7);

        for dims in [2, 4, 7] {
            let mut tree = TreeRX::with_config(dims as i64, small_leaves()).unwrap();

            for i in 0..2000 {
                let point = random_point(&mut rng, dims);
                tree.add_point(&point, i, true).unwrap();
            }

            assert_eq!(tree.len(), 2000);
            assert_eq!(tree.pending_inserts(), 0);
            assert!(tree.num_leaves() >= 2000 / 4);
            assert_eq!(tree.num_internal_nodes(), tree.num_leaves() - 1);
            tree.check_invariants();

            for leaf in tree.leaves.iter().filter(|x| !x.is_empty()) {
                assert!(leaf.len() <= 4);
            }
        }
    }

    #[test]
    fn sorted_insertions_stay_shallow() {

        let mut tree = TreeR2::with_config(-1, small_leaves()).unwrap();

        for i in 0..2000 {
            tree.add_point(&[i as f64, 0.5 * i as f64], i, true).unwrap();
        }

        tree.check_invariants();
        assert!(tree.depth() <= 40, "depth {}", tree.depth());
    }

    #[test]
    fn deferred_inserts_wait_for_rebuild() {

        let mut rng = StdRng::seed_from_u64(11);
        let mut tree = TreeR4::with_config(-1, small_leaves()).unwrap();

        for i in 0..1000 {
            let point = random_point(&mut rng, 4);
            tree.add_point(&point, i, false).unwrap();
        }

        assert_eq!(tree.pending_inserts(), 1000);
        assert_eq!(tree.num_leaves(), 1);
        assert_eq!(tree.depth(), 1);
        tree.check_invariants();

        tree.rebuild();

        assert_eq!(tree.pending_inserts(), 0);
        assert!(tree.num_leaves() >= 1000 / 4);
        assert!(tree.depth() <= 12, "depth {}", tree.depth());
        tree.check_invariants();
    }

    #[test]
    fn rebuild_now_flushes_deferred_inserts() {

        let mut rng = StdRng::seed_from_u64(3);
        let mut tree = TreeRX::with_config(2, small_leaves()).unwrap();

        for i in 0..100 {
            let point = random_point(&mut rng, 2);
            tree.add_point(&point, i, false).unwrap();
        }
        assert_eq!(tree.num_leaves(), 1);

        tree.add_point(&[0.5, 0.5], 100, true).unwrap();

        assert_eq!(tree.pending_inserts(), 0);
        assert!(tree.num_leaves() > 1);
        tree.check_invariants();
    }

    #[test]
    fn identical_points_make_one_leaf() {

        let mut tree = TreeR2::with_config(-1, small_leaves()).unwrap();

        for i in 0..100 {
            tree.add_point(&[1.0, 1.0], i, true).unwrap();
        }

        assert_eq!(tree.num_leaves(), 1);
        assert_eq!(tree.len(), 100);
        tree.check_invariants();

        tree.rebuild();
        assert_eq!(tree.num_leaves(), 1);

        tree.add_point(&[2.0, 1.0], 100, true).unwrap();
        tree.rebuild();
        assert_eq!(tree.num_leaves(), 2);
        tree.check_invariants();
    }

    #[test]
    fn mostly_duplicate_points() {

        let mut tree = TreeRX::with_config(3, small_leaves()).unwrap();

        for i in 0..300 {
            let x = match i % 10 {
                0 => i as f64,
                _ => 0.0,
            };
            tree.add_point(&[x, 0.0, 1.0], i, true).unwrap();
        }

        tree.check_invariants();
        assert_eq!(tree.len(), 300);
    }

    #[test]
    fn split_threshold_moves_past_a_repeated_minimum() {

        let entries: Vec<Entry<[f64; 1]>> = [1.0, 1.0, 1.0, 1.0, 2.0, 3.0]
            .into_iter()
            .enumerate()
            .map(|(i, x)| Entry { point: [x], id: i as PointId, seq: i as u64 })
            .collect();

        assert_eq!(split_threshold(&entries, 0), 2.0);

        let entries: Vec<Entry<[f64; 1]>> = [5.0, 1.0, 4.0, 2.0, 3.0]
            .into_iter()
            .enumerate()
            .map(|(i, x)| Entry { point: [x], id: i as PointId, seq: i as u64 })
            .collect();

        assert_eq!(split_threshold(&entries, 0), 3.0);
    }

    #[test]
    fn bounds_cover_everything() {

        let mut tree = TreeR2::new(-1).unwrap();
        tree.add_point(&[0.0, 0.0], 0, true).unwrap();
        tree.add_point(&[0.0, 1.0], 1, true).unwrap();
        tree.add_point(&[-3.0, 2.0], 2, true).unwrap();

        let bounds = tree.bounds().unwrap();
        assert_eq!(bounds.lower, [-3.0, 0.0]);
        assert_eq!(bounds.upper, [0.0, 2.0]);

        let mut ids: Vec<_> = tree.iter().map(|(_, id)| id).collect();
        ids.sort();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}
