//! Sorter configuration values.

use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

/// Smallest accepted number of lines per initial run.
pub const MIN_RUN_SIZE: usize = 64;
/// Largest accepted number of lines per initial run.
pub const MAX_RUN_SIZE: usize = 1024;

/// Configuration error. Always detected before any input is read or any run is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Run size was not provided.
    MissingRunSize,
    /// Run size is not an integer.
    InvalidRunSize(String),
    /// Run size is outside of the accepted range.
    RunSizeOutOfRange(usize),
}

impl Error for ConfigError {}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            ConfigError::MissingRunSize => write!(f, "run size is not set"),
            ConfigError::InvalidRunSize(value) => write!(f, "run size should be an integer, got '{}'", value),
            ConfigError::RunSizeOutOfRange(value) => write!(
                f,
                "run size must be from {} to {}, got {}",
                MIN_RUN_SIZE, MAX_RUN_SIZE, value
            ),
        }
    }
}

/// Maximum number of lines per initial run, validated to lie within
/// [`MIN_RUN_SIZE`]..=[`MAX_RUN_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSize(usize);

impl RunSize {
    pub fn new(value: usize) -> Result<Self, ConfigError> {
        if (MIN_RUN_SIZE..=MAX_RUN_SIZE).contains(&value) {
            Ok(RunSize(value))
        } else {
            Err(ConfigError::RunSizeOutOfRange(value))
        }
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl FromStr for RunSize {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidRunSize(s.to_string()))?;

        RunSize::new(value)
    }
}
