pub mod accumulator;
pub(crate) mod bar;
pub(crate) mod gaussian;
pub(crate) mod raw;

use std::cmp::Ordering;

use crate::{IsochemError, Result, Spectrum};

use accumulator::Accumulator;

// NOTE: Pipeline steps are reported at `info` when a molecule is configured to be verbose, and `debug` otherwise
macro_rules! progress {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+);
        } else {
            tracing::debug!($($arg)+);
        }
    };
}

pub(crate) use progress;

impl Spectrum {
    /// Pairs up m/z and intensity values, sorting them by m/z
    ///
    /// # Errors
    ///
    /// If `mz` and `intensity` aren't the same length
    pub fn new(mz: Vec<f64>, intensity: Vec<f64>) -> Result<Self> {
        if mz.len() != intensity.len() {
            return Err(IsochemError::spectrum_length(mz.len(), intensity.len()).into());
        }
        Ok(mz.into_iter().zip(intensity).collect())
    }

    #[must_use]
    pub fn mz(&self) -> &[f64] {
        &self.mz
    }

    #[must_use]
    pub fn intensity(&self) -> &[f64] {
        &self.intensity
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.mz.iter().copied().zip(self.intensity.iter().copied())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mz.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }

    #[must_use]
    pub fn max_intensity(&self) -> Option<f64> {
        self.intensity.iter().copied().reduce(f64::max)
    }

    /// The most intense peak, preferring the lightest if several tie
    #[must_use]
    pub fn base_peak(&self) -> Option<(f64, f64)> {
        self.iter()
            .reduce(|best, peak| if peak.1 > best.1 { peak } else { best })
    }
}

impl FromIterator<(f64, f64)> for Spectrum {
    fn from_iter<T: IntoIterator<Item = (f64, f64)>>(iter: T) -> Self {
        let mut peaks: Vec<_> = iter.into_iter().collect();
        peaks.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        let (mz, intensity) = peaks.into_iter().unzip();
        Self { mz, intensity }
    }
}

/// The root-mean-square difference between an experimental spectrum (normalised so its tallest peak is 100) and a
/// simulated one, using only the experimental points that fall strictly inside the simulated mass range and land on a
/// non-empty simulated bin
///
/// Returns `None` if the experimental spectrum has no signal, or if none of its points could be compared.
#[must_use]
pub fn rms_residual(simulated: &Accumulator, experimental: &Spectrum) -> Option<f64> {
    let max = experimental.max_intensity().filter(|&m| m > 0.0)?;
    let (lightest, heaviest) = simulated.mass_range()?;

    let residuals: Vec<_> = experimental
        .iter()
        .filter(|&(mz, _)| lightest < mz && mz < heaviest)
        .filter_map(|(mz, intensity)| {
            simulated
                .nearest(mz)
                .map(|predicted| intensity / max * 100.0 - predicted)
        })
        .collect();
    if residuals.is_empty() {
        return None;
    }

    let sum_of_squares: f64 = residuals.iter().map(|r| r * r).sum();
    Some((sum_of_squares / residuals.len() as f64).sqrt())
}
