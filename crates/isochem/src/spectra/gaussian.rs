use probability::distribution::{Continuous, Gaussian};

use crate::{Spectrum, Storage};

use super::accumulator::Accumulator;

/// The simulated spectrum is binned to this many decimal places
pub(crate) const DECIMALS: u32 = 3;
/// Distance between the points sampled from each peak's distribution
const STEP: f64 = 0.001;
/// How many FWHMs either side of a peak are sampled
const HALF_WIDTH: f64 = 2.0;

/// Simulates the spectrum an instrument would record for `bars`: every bar becomes a normal distribution with the
/// given `sigma`, scaled to the bar's height and sampled out to two FWHMs either side, and their sum is normalised
/// so the tallest point is 100. Nothing is sampled below an m/z of zero.
pub(crate) fn gaussian_spectrum(bars: &Spectrum, fwhm: f64, sigma: f64, storage: Storage) -> Accumulator {
    let lightest = (bars.mz().first().copied().unwrap_or_default() - fwhm * HALF_WIDTH).max(0.0);
    let heaviest = bars.mz().last().copied().unwrap_or_default() + fwhm * HALF_WIDTH;
    let mut spectrum = Accumulator::new(storage, DECIMALS, lightest, heaviest);

    // NOTE: Every peak shares the same width, so the sampled offsets can be reused
    let samples = ((2.0 * HALF_WIDTH * fwhm) / STEP).ceil().max(1.0) as u32;
    let offsets: Vec<_> = (0..samples)
        .map(|i| f64::from(i).mul_add(STEP, -fwhm * HALF_WIDTH))
        .collect();

    for (center, height) in bars.iter() {
        let distribution = Gaussian::new(center, sigma);
        let points: Vec<_> = offsets
            .iter()
            .map(|offset| {
                let mass = center + offset;
                (mass, distribution.density(mass))
            })
            .filter(|&(mass, _)| mass >= 0.0)
            .collect();

        let Some(peak) = points.iter().map(|&(_, density)| density).reduce(f64::max) else {
            continue;
        };
        if peak > 0.0 {
            for (mass, density) in points {
                spectrum.add(mass, density / peak * height);
            }
        }
    }

    spectrum.normalize(100.0);
    spectrum
}
