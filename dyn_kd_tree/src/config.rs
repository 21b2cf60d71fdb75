//! Tuning knobs for a tree, loadable from YAML.

use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::metric::Metric;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TreeConfig {
    /// Largest bucket a leaf keeps after a rebuild.
    pub max_leaf_size: usize,
    /// Largest share of a node's points allowed in one of its children before the node is rebuilt
    /// on insertion. 1.0 turns rebalancing off and only overfull leaves get split.
    pub max_imbalance: f64,
    pub metric: Metric,
}

impl Default for TreeConfig {

    fn default() -> Self {

        return Self {
            max_leaf_size: 32,
            max_imbalance: 0.75,
            metric: Metric::SquaredEuclidean,
        };
    }
}

impl TreeConfig {

    pub fn validate(&self) -> Result<()> {

        if self.max_leaf_size == 0 {
            return Err(Error::invalid_argument("max_leaf_size must be at least 1"));
        }

        if !(0.5..=1.0).contains(&self.max_imbalance) {
            return Err(Error::invalid_argument(format!(
                "max_imbalance must be within [0.5, 1.0], got {}",
                self.max_imbalance
            )));
        }

        self.metric.validate()?;

        Ok(())
    }

    pub fn from_file<P: AsRef<Path>>(filename: P) -> Result<Self> {

        let serialized = std::fs::read_to_string(filename)?;

        let deserialized: Self = serde_yaml::from_str(&serialized)?;
        deserialized.validate()?;

        return Ok(deserialized);
    }

    pub fn to_file<P: AsRef<Path>>(&self, filename: P) -> Result<()> {

        let serialized = serde_yaml::to_string(&self)?;
        let mut file = File::create(filename)?;

        file.write_all(serialized.as_bytes())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {

        let config = TreeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_leaf_size, 32);
        assert_eq!(config.metric, Metric::SquaredEuclidean);
    }

    #[test]
    fn bad_values_are_rejected() {

        let mut config = TreeConfig::default();
        config.max_leaf_size = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));

        let mut config = TreeConfig::default();
        config.max_imbalance = 0.4;
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));

        config.max_imbalance = f64::NAN;
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));

        config.max_imbalance = 1.0;
        assert!(config.validate().is_ok());

        config.metric = Metric::Combined(Vec::new());
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn config_file_round_trip() {

        let dir = tempfile::tempdir().unwrap();
        let filename = dir.path().join("config.yaml");

        let mut config = TreeConfig::default();
        config.max_leaf_size = 4;
        config.metric = Metric::Manhattan;
        config.to_file(&filename).unwrap();

        let read_back = TreeConfig::from_file(&filename).unwrap();
        assert_eq!(read_back, config);

        for metric in [
            Metric::R2SO2Squared { angular_weight: 0.5 },
            Metric::SO3,
            Metric::combined(&["Rn:3", "SO3Squared", "SO2"]).unwrap(),
        ] {
            config.metric = metric;
            config.to_file(&filename).unwrap();
            assert_eq!(TreeConfig::from_file(&filename).unwrap(), config);
        }
    }

    #[test]
    fn partial_config_file_uses_defaults() {

        let dir = tempfile::tempdir().unwrap();
        let filename = dir.path().join("config.yaml");
        std::fs::write(&filename, "max_leaf_size: 8\n").unwrap();

        let config = TreeConfig::from_file(&filename).unwrap();
        assert_eq!(config.max_leaf_size, 8);
        assert_eq!(config.max_imbalance, 0.75);
        assert_eq!(config.metric, Metric::SquaredEuclidean);
    }

    #[test]
    fn invalid_config_file_is_an_error() {

        let dir = tempfile::tempdir().unwrap();
        let filename = dir.path().join("config.yaml");
        std::fs::write(&filename, "max_leaf_size: 0\n").unwrap();
        assert!(matches!(TreeConfig::from_file(&filename), Err(Error::InvalidArgument(_))));

        let missing = dir.path().join("missing.yaml");
        assert!(matches!(TreeConfig::from_file(&missing), Err(Error::Io(_))));
    }
}
