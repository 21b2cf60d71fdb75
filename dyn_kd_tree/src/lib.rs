//! Implementation of an in-memory, incrementally built kd tree for exact nearest neighbor search.
//!
//! Points are labeled with an opaque integer id and live in the leaf buckets of the tree. Internal
//! nodes hold a split axis, a split value and the bounding box of everything below them, which is
//! what the branch-and-bound queries prune on.
//!
//! The same tree works over two kinds of points:
//! - `[f64; D]` when the dimension is known at build time (`TreeR2`, `TreeR4`, `TreeR7`, ...)
//! - `Vec<f64>` when the dimension is only known at construction, or from the first point (`TreeRX`)
//!
//! ```
//! use dyn_kd_tree::TreeRX;
//!
//! let mut tree = TreeRX::new(2).unwrap();
//! tree.add_point(&[0.0, 0.0], 0, true).unwrap();
//! tree.add_point(&[0.0, 1.0], 1, true).unwrap();
//! tree.add_point(&[0.0, 2.0], 2, true).unwrap();
//!
//! let nn = tree.search(&[0.0, 2.1]).unwrap();
//! assert_eq!(nn.id, 2);
//! ```
//!
//! Nodes are stored in two arenas (internal nodes and leaves) and refer to each other by index, so
//! a rebuild only has to swap the pointer to a subtree and recycle the old slots.
//!
//! TODO
//! - [x] fixed and runtime dimension trees sharing one implementation
//! - [x] nearest, k nearest and ball queries
//! - [x] angle and quaternion state spaces, and compositions of them
//! - [ ] batched queries for many query points at once
pub mod error;
pub mod point;
pub mod metric;
pub mod node;
pub mod hits;
pub mod config;
pub mod tree;
pub mod search;

pub use config::TreeConfig;
pub use error::Error;
pub use hits::{NearestNeighbors, Neighbor};
pub use metric::{Metric, Subspace};
pub use point::{Point, PointId};
pub use tree::{DynTree, FixedTree, Tree, TreeR2, TreeR4, TreeR7, TreeRX, INFER_DIMS};
