use tracing::trace;

use crate::{Composition, Config, Spectrum};

use super::{
    accumulator::{self, Accumulator},
    progress,
};

/// Intensity of the single peak the pattern starts from, and the height it's renormalised to after every atom
const CEILING: f64 = 100.0;

/// The infinite-resolution isotope pattern of `composition`, with every mass defect preserved and the tallest peak at
/// an intensity of 100. Masses are uncorrected for charge.
///
/// Natural elements are convolved into the pattern one atom at a time, renormalising and discarding any peak below
/// `config.discard_threshold` of the maximum after each atom, which keeps the number of peaks from growing
/// combinatorially. Explicit isotopes just shift every peak by their mass.
pub(crate) fn raw_pattern(composition: &Composition<'_>, config: &Config) -> Spectrum {
    let decimals = config.decimals;
    let floor = config.discard_threshold * CEILING;
    let scale = accumulator::scale(decimals);

    progress!(config.verbose, %composition, decimals, "generating raw isotope pattern");

    let mut pattern = vec![(0, CEILING)];
    // NOTE: One accumulator is reset for every atom, so `Dense` storage allocates its bins just once
    let mut convolved = Accumulator::with_tick_range(config.storage, scale, 0, 0);
    for (element, count) in composition.iter() {
        if let Some(mass) = element.isotope_mass() {
            let shift = mass.ticks(decimals) * i64::from(count.get());
            for (tick, _) in &mut pattern {
                *tick += shift;
            }
            trace!(%element, count = count.get(), "shifted pattern by explicit isotope");
            continue;
        }

        let isotopes: Vec<_> = element
            .natural_isotopes()
            .map(|(mass, abundance)| (mass.ticks(decimals), abundance.to_f64()))
            .collect();
        let (Some(&(lightest, _)), Some(&(heaviest, _))) = (isotopes.first(), isotopes.last()) else {
            continue;
        };

        for atom in 1..=count.get() {
            // NOTE: `pattern` is always sorted by mass, since it's read back out of an accumulator
            let lowest = pattern.first().map_or(0, |&(tick, _)| tick) + lightest;
            let highest = pattern.last().map_or(0, |&(tick, _)| tick) + heaviest;
            convolved.reset(lowest, highest);
            for &(tick, intensity) in &pattern {
                for &(shift, abundance) in &isotopes {
                    convolved.add_tick(tick + shift, intensity * abundance);
                }
            }
            convolved.normalize(CEILING);
            convolved.threshold(floor);
            pattern = convolved.nonempty_ticks();

            trace!(%element, atom, of = count.get(), peaks = pattern.len(), "convolved atom");
        }
        progress!(config.verbose, %element, count = count.get(), peaks = pattern.len(), "convolved element");
    }

    pattern
        .into_iter()
        .map(|(tick, intensity)| (accumulator::tick_to_mass(tick, scale), intensity))
        .collect()
}
