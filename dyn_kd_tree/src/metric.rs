//! Distance functions the tree can be configured with.
//!
//! Every metric comes in two parts: the distance between two points, and a lower bound on the
//! distance from a point to anything inside an axis-aligned box. Pruning is only exact as long as
//! the second never overestimates the first.
//!
//! Besides plain Rn metrics, points can be states of a rigid body: angles (`SO2`, one coordinate
//! in `[-pi, pi]` that wraps around), unit quaternions (`SO3`, four coordinates, `q` and `-q` are
//! the same rotation) and concatenations of those with Rn blocks.

use std::f64::consts::PI;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::point::Point;

/// How far a quaternion's norm may drift from 1.
const QUATERNION_NORM_TOLERANCE: f64 = 1e-6;

/// One block of coordinates inside a point, with its own distance.
///
/// Written as `Rn:3`, `RnSquared:3`, `RnL1:3`, `SO2`, `SO2Squared`, `SO3` or `SO3Squared`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Subspace {
    Rn(usize),
    RnSquared(usize),
    RnL1(usize),
    SO2,
    SO2Squared,
    SO3,
    SO3Squared,
}

impl Subspace {

    pub fn dims(&self) -> usize {

        match self {
            Subspace::Rn(n) | Subspace::RnSquared(n) | Subspace::RnL1(n) => *n,
            Subspace::SO2 | Subspace::SO2Squared => 1,
            Subspace::SO3 | Subspace::SO3Squared => 4,
        }
    }

    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {

        match self {
            Subspace::Rn(_) => squared_sum(a, b, 1.0).sqrt(),
            Subspace::RnSquared(_) => squared_sum(a, b, 1.0),
            Subspace::RnL1(_) => {
                let mut sum = 0.0;
                for i in 0..a.len() {
                    sum += (a[i] - b[i]).abs();
                }
                sum
            },
            Subspace::SO2 => so2_distance(a[0], b[0]),
            Subspace::SO2Squared => so2_distance(a[0], b[0]).powi(2),
            Subspace::SO3 => quaternion_distance(a, b).sqrt(),
            Subspace::SO3Squared => quaternion_distance(a, b),
        }
    }

    /// Smallest possible distance from `x` to anything in the box `[lower, upper]`.
    pub fn distance_to_box(&self, x: &[f64], lower: &[f64], upper: &[f64]) -> f64 {

        match self {
            Subspace::Rn(_) => squared_box_distance(x, lower, upper, 1.0).sqrt(),
            Subspace::RnSquared(_) => squared_box_distance(x, lower, upper, 1.0),
            Subspace::RnL1(_) => {
                let mut sum = 0.0;
                for i in 0..x.len() {
                    sum += (x[i].min(upper[i]).max(lower[i]) - x[i]).abs();
                }
                sum
            },
            Subspace::SO2 => so2_box_distance(x[0], lower[0], upper[0]),
            Subspace::SO2Squared => so2_box_distance(x[0], lower[0], upper[0]).powi(2),
            Subspace::SO3 => quaternion_box_distance(x, lower, upper).sqrt(),
            Subspace::SO3Squared => quaternion_box_distance(x, lower, upper),
        }
    }

    /// Rejects coordinates outside the space: angles beyond `[-pi, pi]`, quaternions that are
    /// not unit length.
    pub fn check(&self, coords: &[f64]) -> Result<()> {

        match self {
            Subspace::SO2 | Subspace::SO2Squared => match (-PI..=PI).contains(&coords[0]) {
                true => Ok(()),
                false => Err(Error::invalid_argument(format!(
                    "angle {} is outside [-pi, pi]",
                    coords[0]
                ))),
            },
            Subspace::SO3 | Subspace::SO3Squared => {
                let norm = squared_sum(coords, &[0.0; 4], 1.0).sqrt();
                match (norm - 1.0).abs() <= QUATERNION_NORM_TOLERANCE {
                    true => Ok(()),
                    false => Err(Error::invalid_argument(format!(
                        "quaternion {:?} has norm {}, expected 1",
                        coords, norm
                    ))),
                }
            },
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Subspace {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {

        match self {
            Subspace::Rn(n) => write!(f, "Rn:{}", n),
            Subspace::RnSquared(n) => write!(f, "RnSquared:{}", n),
            Subspace::RnL1(n) => write!(f, "RnL1:{}", n),
            Subspace::SO2 => write!(f, "SO2"),
            Subspace::SO2Squared => write!(f, "SO2Squared"),
            Subspace::SO3 => write!(f, "SO3"),
            Subspace::SO3Squared => write!(f, "SO3Squared"),
        }
    }
}

impl FromStr for Subspace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {

        let (name, dims) = match s.split_once(':') {
            None => (s.trim(), None),
            Some((name, dims)) => match dims.trim().parse::<usize>() {
                Ok(n) => (name.trim(), Some(n)),
                Err(_) => return Err(Error::invalid_argument(format!("bad dimension in space {:?}", s))),
            },
        };

        match (name, dims) {
            ("Rn", Some(n)) => Ok(Subspace::Rn(n)),
            ("RnSquared", Some(n)) => Ok(Subspace::RnSquared(n)),
            ("RnL1", Some(n)) => Ok(Subspace::RnL1(n)),
            ("SO2", None) => Ok(Subspace::SO2),
            ("SO2Squared", None) => Ok(Subspace::SO2Squared),
            ("SO3", None) => Ok(Subspace::SO3),
            ("SO3Squared", None) => Ok(Subspace::SO3Squared),
            _ => Err(Error::invalid_argument(format!("unknown space {:?}", s))),
        }
    }
}

impl TryFrom<String> for Subspace {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Subspace> for String {

    fn from(space: Subspace) -> String {
        space.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Metric {
    /// Euclidean distance without the final square root.
    #[default]
    SquaredEuclidean,
    Euclidean,
    /// L1 distance.
    Manhattan,
    SO2,
    SO2Squared,
    SO3,
    SO3Squared,
    /// Planar pose `[x, y, angle]`: euclidean position plus weighted angle.
    R2SO2 { angular_weight: f64 },
    R2SO2Squared { angular_weight: f64 },
    /// Rigid body pose `[x, y, z, qx, qy, qz, qw]`.
    R3SO3,
    R3SO3Squared,
    /// Blocks laid out one after another, distances summed.
    Combined(Vec<Subspace>),
}

impl Metric {

    /// Builds a `Combined` metric from block names like `["Rn:3", "SO3"]`.
    pub fn combined<S: AsRef<str>>(spaces: &[S]) -> Result<Self> {

        let spaces = spaces
            .iter()
            .map(|x| x.as_ref().parse())
            .collect::<Result<Vec<Subspace>>>()?;

        let metric = Metric::Combined(spaces);
        metric.validate()?;

        return Ok(metric);
    }

    /// Number of coordinates the metric works on, `None` for the Rn metrics that take any.
    pub fn dims(&self) -> Option<usize> {

        match self {
            Metric::SquaredEuclidean | Metric::Euclidean | Metric::Manhattan => None,
            Metric::SO2 | Metric::SO2Squared => Some(1),
            Metric::SO3 | Metric::SO3Squared => Some(4),
            Metric::R2SO2 { .. } | Metric::R2SO2Squared { .. } => Some(3),
            Metric::R3SO3 | Metric::R3SO3Squared => Some(7),
            Metric::Combined(spaces) => Some(spaces.iter().map(|x| x.dims()).sum()),
        }
    }

    pub fn validate(&self) -> Result<()> {

        match self {
            Metric::R2SO2 { angular_weight } | Metric::R2SO2Squared { angular_weight } => {
                if !(angular_weight.is_finite() && *angular_weight >= 0.0) {
                    return Err(Error::invalid_argument(format!(
                        "angular_weight must be finite and non-negative, got {}",
                        angular_weight
                    )));
                }
            },
            Metric::Combined(spaces) => {
                if spaces.is_empty() {
                    return Err(Error::invalid_argument("combined metric needs at least one space"));
                }
                if let Some(space) = spaces.iter().find(|x| x.dims() == 0) {
                    return Err(Error::invalid_argument(format!("space {} has no coordinates", space)));
                }
            },
            _ => {},
        }

        Ok(())
    }

    /// Checks every block of `coords` against its space. `coords` must already have the
    /// metric's dimension.
    pub fn check_point(&self, coords: &[f64]) -> Result<()> {

        let mut result = Ok(());

        self.fold_blocks(coords.len(), |space, range| {
            if result.is_ok() {
                result = space.check(&coords[range]);
            }
            0.0
        });

        return result;
    }

    /// Calls `f` on every block with its coordinate range and sums the weighted results.
    fn fold_blocks<F: FnMut(Subspace, Range<usize>) -> f64>(&self, dims: usize, mut f: F) -> f64 {

        match self {
            Metric::SquaredEuclidean => f(Subspace::RnSquared(dims), 0..dims),
            Metric::Euclidean => f(Subspace::Rn(dims), 0..dims),
            Metric::Manhattan => f(Subspace::RnL1(dims), 0..dims),
            Metric::SO2 => f(Subspace::SO2, 0..1),
            Metric::SO2Squared => f(Subspace::SO2Squared, 0..1),
            Metric::SO3 => f(Subspace::SO3, 0..4),
            Metric::SO3Squared => f(Subspace::SO3Squared, 0..4),
            Metric::R2SO2 { angular_weight } => {
                f(Subspace::Rn(2), 0..2) + angular_weight * f(Subspace::SO2, 2..3)
            },
            Metric::R2SO2Squared { angular_weight } => {
                f(Subspace::RnSquared(2), 0..2) + angular_weight * f(Subspace::SO2Squared, 2..3)
            },
            Metric::R3SO3 => f(Subspace::Rn(3), 0..3) + f(Subspace::SO3, 3..7),
            Metric::R3SO3Squared => f(Subspace::RnSquared(3), 0..3) + f(Subspace::SO3Squared, 3..7),
            Metric::Combined(spaces) => {
                let mut sum = 0.0;
                let mut start = 0;
                for space in spaces.iter() {
                    let end = start + space.dims();
                    sum += f(*space, start..end);
                    start = end;
                }
                sum
            },
        }
    }

    pub fn distance<P: Point>(&self, a: &P, b: &P) -> f64 {

        if let Metric::SquaredEuclidean = self {
            return a.squared_distance(b);
        }

        let a = a.coords();
        let b = b.coords();
        assert_eq!(a.len(), b.len(), "points of different dimension");

        self.fold_blocks(a.len(), |space, range| space.distance(&a[range.clone()], &b[range]))
    }

    /// Smallest possible distance from `point` to any point inside the box `[lower, upper]`.
    ///
    /// Zero when the point lies inside the box.
    pub fn distance_to_box<P: Point>(&self, point: &P, lower: &P, upper: &P) -> f64 {

        let x = point.coords();
        let lb = lower.coords();
        let ub = upper.coords();

        self.fold_blocks(x.len(), |space, range| {
            space.distance_to_box(&x[range.clone()], &lb[range.clone()], &ub[range])
        })
    }
}

///sum of (sign * a[i] - b[i])^2
fn squared_sum(a: &[f64], b: &[f64], sign: f64) -> f64 {

    let mut sum = 0.0;
    for i in 0..a.len() {
        let diff = sign * a[i] - b[i];
        sum += diff * diff;
    }

    return sum;
}

fn squared_box_distance(x: &[f64], lower: &[f64], upper: &[f64], sign: f64) -> f64 {

    let mut sum = 0.0;
    for i in 0..x.len() {
        let xi = sign * x[i];
        let diff = xi.min(upper[i]).max(lower[i]) - xi;
        sum += diff * diff;
    }

    return sum;
}

///Shortest way around the circle between two angles in `[-pi, pi]`
fn so2_distance(a: f64, b: f64) -> f64 {

    let mut diff = a - b;
    if diff > PI {
        diff -= 2.0 * PI;
    } else if diff < -PI {
        diff += 2.0 * PI;
    }

    return diff.abs();
}

///The arc `[lower, upper]` never wraps, so from outside it the closest point is one of its ends.
fn so2_box_distance(x: f64, lower: f64, upper: f64) -> f64 {

    if lower <= x && x <= upper {
        return 0.0;
    }

    return so2_distance(x, lower).min(so2_distance(x, upper));
}

fn quaternion_distance(a: &[f64], b: &[f64]) -> f64 {
    squared_sum(a, b, 1.0).min(squared_sum(a, b, -1.0))
}

fn quaternion_box_distance(x: &[f64], lower: &[f64], upper: &[f64]) -> f64 {
    squared_box_distance(x, lower, upper, 1.0).min(squared_box_distance(x, lower, upper, -1.0))
}

///Appends a uniformly drawn block of coordinates that `space` accepts
#[cfg(test)]
pub(crate) fn random_block(rng: &mut rand::rngs::StdRng, space: Subspace, out: &mut Vec<f64>) {

    use rand::Rng;

    match space {
        Subspace::SO2 | Subspace::SO2Squared => out.push(rng.gen_range(-PI..PI)),
        Subspace::SO3 | Subspace::SO3Squared => loop {
            let q: Vec<f64> = (0..4).map(|_| rng.gen_range(-1.0..1.0)).collect();
            let norm = squared_sum(&q, &[0.0; 4], 1.0).sqrt();
            if norm > 1e-3 {
                out.extend(q.iter().map(|x| x / norm));
                break;
            }
        },
        _ => out.extend((0..space.dims()).map(|_| rng.gen_range(-1.0..1.0))),
    }
}
