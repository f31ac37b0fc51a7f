use std::str::FromStr;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Charge, Result};

/// Tuning for the isotope pattern calculations, fixed for the lifetime of a `Molecule`
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Decimal places the raw isotope pattern is binned to
    pub decimals: u32,
    /// Resolving power of the simulated instrument, used to derive peak widths
    pub resolution: f64,
    /// Used unless the formula specifies its own charge
    pub charge: Charge,
    /// Raw peaks below this fraction of the tallest peak are discarded after every atom
    pub discard_threshold: f64,
    /// Report pipeline progress at `info` instead of `debug`
    pub verbose: bool,
    pub storage: Storage,
}

/// How spectra are stored while they're being accumulated
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Storage {
    /// Only allocate bins as they're filled (best for large molecules)
    #[default]
    Sparse,
    /// Allocate every bin in the expected mass range up front
    Dense,
}

#[derive(Debug, Diagnostic, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[diagnostic(help("check the TOML syntax and that every option is spelled correctly"))]
    #[error("failed to read {file}: {message}")]
    Toml { file: String, message: String },

    #[diagnostic(help(
        "the supported options are decimals, resolution, charge, discard_threshold, verbose, and storage"
    ))]
    #[error("unknown option {0:?}")]
    UnknownOption(String),

    #[error("{value:?} is not a valid value for {option}")]
    InvalidValue { option: String, value: String },

    #[diagnostic(help("beyond 10 decimal places, masses are more precise than the atomic database"))]
    #[error("the raw pattern can be binned to at most 10 decimal places, but {0} were requested")]
    Decimals(u32),

    #[diagnostic(help("peaks widen as the resolution falls, and each one is sampled across four FWHMs"))]
    #[error("the resolution must be a finite number of at least 100, but was {0}")]
    Resolution(f64),

    #[error("the charge of a molecule cannot be zero")]
    ZeroCharge,

    #[error("the discard threshold must be at least 0 and less than 1, but was {0}")]
    DiscardThreshold(f64),

    #[error("the confidence level must lie strictly between 0 and 1, but was {0}")]
    Confidence(f64),

    #[error("the intensity threshold must lie between 0 and 1, but was {0}")]
    Threshold(f64),
}

const MAX_DECIMALS: u32 = 10;
const MIN_RESOLUTION: f64 = 100.0;

impl Config {
    /// Reads a configuration from TOML, falling back to the defaults for any missing options
    pub fn from_toml(file_name: impl AsRef<str>, toml: impl AsRef<str>) -> Result<Self> {
        let config: Self = toml::from_str(toml.as_ref()).map_err(|e| ConfigError::Toml {
            file: file_name.as_ref().to_owned(),
            message: e.message().to_owned(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// If any option is out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.decimals > MAX_DECIMALS {
            return Err(ConfigError::Decimals(self.decimals));
        }
        if !(self.resolution.is_finite() && self.resolution >= MIN_RESOLUTION) {
            return Err(ConfigError::Resolution(self.resolution));
        }
        if self.charge.is_zero() {
            return Err(ConfigError::ZeroCharge);
        }
        if !(0.0..1.0).contains(&self.discard_threshold) {
            return Err(ConfigError::DiscardThreshold(self.discard_threshold));
        }
        Ok(())
    }

    /// Sets a single option from text, leaving the configuration untouched if the new value is invalid
    ///
    /// # Errors
    ///
    /// If the option doesn't exist, or the value can't be parsed or is out of range
    pub fn set(&mut self, option: &str, value: &str) -> Result<(), ConfigError> {
        let mut updated = *self;
        match option {
            "decimals" => updated.decimals = parse_value(option, value)?,
            "resolution" => updated.resolution = parse_value(option, value)?,
            "charge" => updated.charge = Charge(parse_value(option, value)?),
            "discard_threshold" => updated.discard_threshold = parse_value(option, value)?,
            "verbose" => updated.verbose = parse_value(option, value)?,
            "storage" => updated.storage = parse_value(option, value)?,
            _ => return Err(ConfigError::UnknownOption(option.to_owned())),
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            decimals: 7,
            resolution: 5000.0,
            charge: Charge::default(),
            discard_threshold: 0.01,
            verbose: false,
            storage: Storage::default(),
        }
    }
}

impl FromStr for Storage {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sparse" => Ok(Self::Sparse),
            "dense" => Ok(Self::Dense),
            _ => Err(()),
        }
    }
}

fn parse_value<T: FromStr>(option: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        option: option.to_owned(),
        value: value.to_owned(),
    })
}
