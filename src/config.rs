//! Loading run parameters from configuration files.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Run configuration, typically loaded from a YAML file and applied through
/// [`ModelBuilder::config`](crate::ModelBuilder::config).
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Initial value of the termination counter; the run ends when it
    /// reaches zero.
    pub termination_count: u32,
    /// Random seed; drawn from entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Config {
    /// Load config from YAML.
    ///
    /// # Example
    ///
    /// ```
    /// # use gpsim::Config;
    /// # fn main() -> anyhow::Result<()> {
    /// let input = r#"
    /// termination_count: 100
    /// seed: 17"#;
    /// let config = Config::from_yaml(std::io::Cursor::new(input))?;
    /// assert_eq!(config.termination_count, 100);
    /// assert_eq!(config.seed, Some(17));
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when the input is not well-formed YAML of the
    /// expected shape.
    pub fn from_yaml<R: Read>(reader: R) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_reader(reader).context("Failed to parse config")?;
        Ok(config)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_config() -> anyhow::Result<()> {
        let config = Config::from_yaml(Cursor::new("termination_count: 5"))?;
        assert_eq!(
            config,
            Config {
                termination_count: 5,
                seed: None,
            }
        );
        Ok(())
    }

    #[test]
    fn test_malformed_config_is_rejected() {
        assert!(Config::from_yaml(Cursor::new("termination_count: lots")).is_err());
    }
}
