//! Engine configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Configuration of the data-parallel helper used inside strategies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Whether independent components may be processed in parallel.
    pub enabled: bool,

    /// Below this many independent work items, work runs sequentially.
    pub min_components: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_components: 4,
        }
    }
}

impl ParallelConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration that always runs sequentially.
    pub fn sequential() -> Self {
        Self::default().with_enabled(false)
    }

    /// Builder: enable/disable parallel execution.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builder: set the parallel threshold.
    pub fn with_min_components(mut self, min: usize) -> Self {
        self.min_components = min.max(1);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_components == 0 {
            return Err(ConfigError::InvalidMinComponents);
        }
        Ok(())
    }
}

/// Guards for simple-cycle enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Longest cycle considered, in nodes (`None` = unbounded).
    pub max_length: Option<usize>,

    /// Enumeration fails once more cycles than this are found.
    pub max_cycles: usize,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            max_length: None,
            max_cycles: 100_000,
        }
    }
}

impl CycleConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: bound the cycle length.
    pub fn with_max_length(mut self, length: usize) -> Self {
        self.max_length = Some(length.max(1));
        self
    }

    /// Builder: set the enumeration guard.
    pub fn with_max_cycles(mut self, cycles: usize) -> Self {
        self.max_cycles = cycles.max(1);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_length == Some(0) {
            return Err(ConfigError::InvalidMaxCycleLength);
        }
        if self.max_cycles == 0 {
            return Err(ConfigError::InvalidMaxCycles);
        }
        Ok(())
    }
}

/// Filter for maximal cliques.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliqueConfig {
    /// Maximal cliques with fewer nodes form no component set.
    pub min_size: usize,
}

impl Default for CliqueConfig {
    fn default() -> Self {
        Self { min_size: 1 }
    }
}

impl CliqueConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the minimum clique size.
    pub fn with_min_size(mut self, size: usize) -> Self {
        self.min_size = size.max(1);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_size == 0 {
            return Err(ConfigError::InvalidMinCliqueSize);
        }
        Ok(())
    }
}

/// Aggregate configuration for every strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Data-parallel execution.
    pub parallel: ParallelConfig,
    /// Cycle enumeration guards.
    pub cycles: CycleConfig,
    /// Clique filter.
    pub cliques: CliqueConfig,
}

impl EngineConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parallel.validate()?;
        self.cycles.validate()?;
        self.cliques.validate()
    }
}
