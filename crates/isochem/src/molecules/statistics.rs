use probability::distribution::{Gaussian, Inverse};

use crate::{Molecule, Result, spectra::progress};

use super::config::ConfigError;

/// Whether `Molecule::bounds()` reports an interval for every peak, or one covering the whole pattern
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum BoundsMode {
    PerPeak,
    #[default]
    Envelope,
}

#[derive(Clone, PartialEq, Debug)]
pub enum Bounds {
    /// Each retained peak's m/z, paired with its `(lower, upper)` interval
    PerPeak(Vec<(f64, (f64, f64))>),
    /// From the lower bound of the lightest retained peak, to the upper bound of the heaviest
    Envelope(f64, f64),
}

impl Molecule<'_> {
    /// Confidence intervals for the m/z of the bar pattern's peaks, treating each as a normal distribution with this
    /// molecule's `sigma()`. Peaks less intense than `threshold` (a fraction of the tallest peak) are left out.
    ///
    /// # Errors
    ///
    /// If `confidence` doesn't lie strictly between 0 and 1, or `threshold` doesn't lie between 0 and 1
    pub fn bounds(&self, confidence: f64, mode: BoundsMode, threshold: f64) -> Result<Bounds> {
        if confidence.is_nan() || confidence <= 0.0 || confidence >= 1.0 {
            return Err(ConfigError::Confidence(confidence).into());
        }
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Threshold(threshold).into());
        }

        let bars = self.bar_pattern();
        let floor = threshold * bars.max_intensity().unwrap_or_default();
        let retained: Vec<_> = bars
            .iter()
            .filter(|&(_, intensity)| intensity >= floor)
            .map(|(mz, _)| mz)
            .collect();

        let sigma = self.sigma();
        let interval = |mz| {
            let distribution = Gaussian::new(mz, sigma);
            (
                distribution.inverse((1.0 - confidence) / 2.0),
                distribution.inverse((1.0 + confidence) / 2.0),
            )
        };

        let bounds = match mode {
            BoundsMode::PerPeak => Bounds::PerPeak(retained.iter().map(|&mz| (mz, interval(mz))).collect()),
            BoundsMode::Envelope => {
                // SAFETY: The tallest peak always clears a `threshold` of at most 1, so at least one peak is retained
                let (lower, _) = interval(*retained.first().unwrap());
                let (_, upper) = interval(*retained.last().unwrap());
                progress!(self.config().verbose, lower, upper, confidence, "calculated bounds");
                Bounds::Envelope(lower, upper)
            }
        };
        Ok(bounds)
    }
}

#[cfg(test)]
mod tests {
    use once_cell::sync::Lazy;

    use crate::{
        AbbreviationDatabase, AtomicDatabase, Config, Simulator, testing_tools::assert_error_message,
    };

    use super::*;

    static DB: Lazy<AtomicDatabase> = Lazy::new(AtomicDatabase::default);
    static ABBREVIATIONS: Lazy<AbbreviationDatabase> = Lazy::new(|| AbbreviationDatabase::builtin(&DB));
    static SIMULATOR: Lazy<Simulator> =
        Lazy::new(|| Simulator::new(&DB, &ABBREVIATIONS, Config::default()).unwrap());

    // The 95% two-sided critical value of the standard normal distribution
    const Z_95: f64 = 1.959_963_984_540_054;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn per_peak_bounds() {
        let borate = SIMULATOR.molecule("B(OH)4").unwrap();
        let sigma = borate.sigma();

        let Bounds::PerPeak(peaks) = borate.bounds(0.95, BoundsMode::PerPeak, 0.01).unwrap() else {
            panic!("expected per-peak bounds");
        };
        assert_eq!(peaks.len(), 2);
        for (&(mz, (lower, upper)), &bar) in peaks.iter().zip(borate.bar_pattern().mz()) {
            assert_eq!(mz, bar);
            assert_close(lower, mz - Z_95 * sigma);
            assert_close(upper, mz + Z_95 * sigma);
        }

        // The 10B peak (at ~25%) is dropped by a higher threshold
        let Bounds::PerPeak(peaks) = borate.bounds(0.95, BoundsMode::PerPeak, 0.3).unwrap() else {
            panic!("expected per-peak bounds");
        };
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].0, borate.exact_mass());
    }

    #[test]
    fn envelope_bounds() {
        let borate = SIMULATOR.molecule("B(OH)4").unwrap();
        let sigma = borate.sigma();
        let bars = borate.bar_pattern().mz();

        let Bounds::Envelope(lower, upper) = borate.bounds(0.95, BoundsMode::Envelope, 0.01).unwrap() else {
            panic!("expected envelope bounds");
        };
        assert_close(lower, bars[0] - Z_95 * sigma);
        assert_close(upper, bars[1] + Z_95 * sigma);

        // Wider confidence gives wider bounds, and a threshold of 1 keeps only the tallest peak
        let Bounds::Envelope(wide_lower, wide_upper) =
            borate.bounds(0.999, BoundsMode::default(), 1.0).unwrap()
        else {
            panic!("expected envelope bounds");
        };
        assert!(wide_lower > lower && wide_lower < borate.exact_mass());
        assert!(wide_upper > upper);
        assert_close(borate.exact_mass() - wide_lower, wide_upper - borate.exact_mass());
    }

    #[test]
    fn invalid_bounds() {
        let borate = SIMULATOR.molecule("B(OH)4").unwrap();
        for confidence in [0.0, 1.0, -0.5, 95.0, f64::NAN] {
            assert!(borate.bounds(confidence, BoundsMode::Envelope, 0.01).is_err());
        }
        assert_error_message!(
            borate.bounds(1.5, BoundsMode::PerPeak, 0.01),
            "the confidence level must lie strictly between 0 and 1, but was 1.5"
        );
        assert_error_message!(
            borate.bounds(0.95, BoundsMode::PerPeak, 1.01),
            "the intensity threshold must lie between 0 and 1, but was 1.01"
        );
        assert!(borate.bounds(0.95, BoundsMode::Envelope, -0.1).is_err());
    }
}
