//! Query results, and the bounded collection used to gather the k best of them.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::point::PointId;

/// A single query answer: the id of a stored point and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: PointId,
    pub distance: f64,
}

/// Ordered answers of a k nearest neighbor or ball query, closest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NearestNeighbors {
    pub neighbors: Vec<Neighbor>,
}

impl NearestNeighbors {

    /// Sorts candidates by distance, then by insertion order.
    pub(crate) fn from_candidates(mut candidates: Vec<Candidate>) -> Self {

        candidates.sort();
        let neighbors = candidates.into_iter().map(|c| c.to_neighbor()).collect();

        return Self { neighbors };
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn first(&self) -> Option<&Neighbor> {
        self.neighbors.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Neighbor> {
        self.neighbors.iter()
    }

    pub fn ids(&self) -> Vec<PointId> {
        self.neighbors.iter().map(|x| x.id).collect()
    }

    pub fn distances(&self) -> Vec<f64> {
        self.neighbors.iter().map(|x| x.distance).collect()
    }

    pub fn to_json(&self) -> Result<String> {

        let s = serde_json::to_string(&self.neighbors)?;
        return Ok(s);
    }

    pub fn to_yaml(&self) -> Result<String> {

        let s = serde_yaml::to_string(&self.neighbors)?;
        return Ok(s);
    }
}

impl Index<usize> for NearestNeighbors {
    type Output = Neighbor;

    fn index(&self, index: usize) -> &Neighbor {
        &self.neighbors[index]
    }
}

impl IntoIterator for NearestNeighbors {
    type Item = Neighbor;
    type IntoIter = std::vec::IntoIter<Neighbor>;

    fn into_iter(self) -> Self::IntoIter {
        self.neighbors.into_iter()
    }
}

impl<'a> IntoIterator for &'a NearestNeighbors {
    type Item = &'a Neighbor;
    type IntoIter = std::slice::Iter<'a, Neighbor>;

    fn into_iter(self) -> Self::IntoIter {
        self.neighbors.iter()
    }
}

/// A point under consideration during a query.
///
/// Ordered by distance, then by insertion sequence, so the earlier insertion is the "smaller" of
/// two equally distant candidates.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate {
    pub distance: f64,
    pub seq: u64,
    pub id: PointId,
}

impl Candidate {

    pub fn to_neighbor(&self) -> Neighbor {
        Neighbor { id: self.id, distance: self.distance }
    }

    /// Single nearest neighbor rule: strictly closer wins, and on an exact tie the more recent
    /// insertion wins.
    pub fn replaces_nearest(&self, current: &Candidate) -> bool {

        match self.distance.total_cmp(&current.distance) {
            Ordering::Less => true,
            Ordering::Equal => self.seq > current.seq,
            Ordering::Greater => false,
        }
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance.total_cmp(&other.distance).then(self.seq.cmp(&other.seq))
    }
}

///struct for keeping the N closest candidates seen so far
///
///A max-heap capped at `max_length`: once full, a new candidate only gets in by evicting the current
///worst one.
#[derive(Debug)]
pub(crate) struct TopHits {
    pub max_length: usize,
    heap: BinaryHeap<Candidate>,
}

impl TopHits {

    ///`max_length` may exceed the number of points in the tree by any amount
    pub fn new(max_length: usize) -> Self {

        return Self {
            max_length,
            heap: BinaryHeap::new(),
        };
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.max_length
    }

    ///# Returns
    ///
    ///the distance of the worst kept candidate once the list is full, infinity before that
    pub fn get_highest_dist(&self) -> f64 {

        match (self.is_full(), self.heap.peek()) {
            (true, Some(worst)) => worst.distance,
            _ => f64::INFINITY,
        }
    }

    ///Public method to be called on every point for consideration as a neighbor
    pub fn try_add(&mut self, candidate: Candidate) {

        if !self.is_full() {
            self.heap.push(candidate);
            return;
        }

        let replaces_worst = match self.heap.peek() {
            Some(worst) => candidate < *worst,
            None => false,
        };

        if replaces_worst {
            self.heap.pop();
            self.heap.push(candidate);
        }
    }

    pub fn into_nearest_neighbors(self) -> NearestNeighbors {

        let neighbors = self.heap.into_sorted_vec().into_iter().map(|c| c.to_neighbor()).collect();

        return NearestNeighbors { neighbors };
    }
}
