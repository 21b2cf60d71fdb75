//! Querying the kd-tree: single nearest neighbor, k nearest neighbors and ball queries.
//!
//! All three share one depth-first branch-and-bound walk. At every internal node the child on the
//! query's side of the split is visited first, and any subtree whose bounding box is provably
//! farther than what has been collected so far is skipped.
//!
//! Distances are in the units of the tree's metric, so with the default `SquaredEuclidean` a ball
//! radius is a squared radius too.

use log::trace;

use crate::error::{Error, Result};
use crate::hits::{Candidate, NearestNeighbors, Neighbor, TopHits};
use crate::node::NodePointer;
use crate::point::Point;
use crate::tree::Tree;

/// What a query keeps of the points it is shown, and how far away a subtree has to be before
/// it can't contribute anything.
trait Collector {

    fn can_skip(&self, lower_bound: f64) -> bool;

    fn offer(&mut self, candidate: Candidate);
}

/// Keeps the closest point. Subtrees exactly as far as the current best are still visited since
/// they may hold a more recent point at the same distance.
struct NearestHit {
    best: Option<Candidate>,
}

impl Collector for NearestHit {

    fn can_skip(&self, lower_bound: f64) -> bool {

        match &self.best {
            Some(best) => lower_bound > best.distance,
            None => false,
        }
    }

    fn offer(&mut self, candidate: Candidate) {

        let replace = match &self.best {
            Some(best) => candidate.replaces_nearest(best),
            None => true,
        };

        if replace {
            self.best = Some(candidate);
        }
    }
}

impl Collector for TopHits {

    fn can_skip(&self, lower_bound: f64) -> bool {
        self.is_full() && lower_bound > self.get_highest_dist()
    }

    fn offer(&mut self, candidate: Candidate) {
        self.try_add(candidate);
    }
}

/// Keeps every point strictly closer than `radius`.
struct BallHits {
    radius: f64,
    candidates: Vec<Candidate>,
}

impl Collector for BallHits {

    fn can_skip(&self, lower_bound: f64) -> bool {
        lower_bound >= self.radius
    }

    fn offer(&mut self, candidate: Candidate) {

        if candidate.distance < self.radius {
            self.candidates.push(candidate);
        }
    }
}

impl<P: Point> Tree<P> {

    ///Returns the stored point closest to `coords`.
    ///
    ///When several points are exactly equally close, the most recently inserted one is returned.
    pub fn search(&self, coords: &[f64]) -> Result<Neighbor> {

        let query = self.to_point(coords)?;

        let root = match self.root {
            None => return Err(Error::EmptyTree),
            Some(x) => x,
        };

        let mut hit = NearestHit { best: None };
        self.branch_and_bound(&query, root, &mut hit);

        match hit.best {
            Some(best) => Ok(best.to_neighbor()),
            None => Err(Error::EmptyTree),
        }
    }

    ///Returns the `k` stored points closest to `coords`, closest first.
    ///
    ///Returns every point when the tree holds fewer than `k`. Equally distant points come out in
    ///insertion order.
    pub fn search_knn(&self, coords: &[f64], k: usize) -> Result<NearestNeighbors> {

        if k == 0 {
            return Err(Error::invalid_argument("k must be at least 1"));
        }

        let query = self.to_point(coords)?;

        let root = match self.root {
            None => return Ok(NearestNeighbors::default()),
            Some(x) => x,
        };

        let mut hits = TopHits::new(k);
        self.branch_and_bound(&query, root, &mut hits);

        return Ok(hits.into_nearest_neighbors());
    }

    ///Returns every stored point strictly closer than `radius` to `coords`, closest first.
    pub fn search_ball(&self, coords: &[f64], radius: f64) -> Result<NearestNeighbors> {

        if !(radius >= 0.0) {
            return Err(Error::invalid_argument(format!("radius must be non-negative, got {}", radius)));
        }

        let query = self.to_point(coords)?;

        let root = match self.root {
            None => return Ok(NearestNeighbors::default()),
            Some(x) => x,
        };

        let mut hits = BallHits { radius, candidates: Vec::new() };
        self.branch_and_bound(&query, root, &mut hits);

        return Ok(NearestNeighbors::from_candidates(hits.candidates));
    }

    fn distance_to_node(&self, query: &P, pointer: NodePointer) -> f64 {

        let bounds = match pointer {
            NodePointer::Internal(index) => &self.nodes[index].bounds,
            NodePointer::Leaf(index) => &self.leaves[index].bounds,
        };

        return self.config.metric.distance_to_box(query, &bounds.lower, &bounds.upper);
    }

    fn branch_and_bound<C: Collector>(&self, query: &P, root: NodePointer, collector: &mut C) {

        let metric = &self.config.metric;

        let mut num_nodes_visited: usize = 0;
        let mut num_leaves_visited: usize = 0;

        //each pointer is pushed with the lower bound of its distance to the query
        let mut nodes_to_check: Vec<(NodePointer, f64)> = vec![(root, self.distance_to_node(query, root))];

        while let Some((curr_pointer, lower_bound)) = nodes_to_check.pop() {

            if collector.can_skip(lower_bound) {
                continue;
            }

            match curr_pointer {
                NodePointer::Leaf(index) => {

                    num_leaves_visited += 1;

                    for entry in self.leaves[index].entries.iter() {
                        collector.offer(Candidate {
                            distance: metric.distance(query, &entry.point),
                            seq: entry.seq,
                            id: entry.id,
                        });
                    }
                },
                NodePointer::Internal(index) => {

                    num_nodes_visited += 1;

                    let node = &self.nodes[index];

                    let near_pointer = node.child_for(query);
                    let far_pointer = match near_pointer == node.left_child_pointer {
                        true => node.right_child_pointer,
                        false => node.left_child_pointer,
                    };

                    //the near side goes on top so it is searched first
                    nodes_to_check.push((far_pointer, self.distance_to_node(query, far_pointer)));
                    nodes_to_check.push((near_pointer, self.distance_to_node(query, near_pointer)));
                },
            }
        }

        trace!("nodes visited: {}, leaves visited: {}", num_nodes_visited, num_leaves_visited);
    }
}
