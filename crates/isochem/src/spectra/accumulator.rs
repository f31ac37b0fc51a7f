use std::collections::BTreeMap;

use crate::{Spectrum, Storage};

/// Intensities binned on a grid of `10^-decimals` mass units
///
/// Bins are addressed by integer "ticks" (`round(mass × 10^decimals)`), so contributions landing in the same bin always
/// accumulate exactly, however they were computed. An intensity of zero marks an empty bin.
#[derive(Clone, PartialEq, Debug)]
pub struct Accumulator {
    scale: f64,
    bins: Bins,
}

#[derive(Clone, PartialEq, Debug)]
enum Bins {
    Sparse(BTreeMap<i64, f64>),
    Dense { start: i64, values: Vec<f64> },
}

impl Accumulator {
    /// An accumulator expected to hold masses between `lowest` and `highest`. `Dense` storage allocates that range up
    /// front, while `Sparse` storage allocates nothing until values are added. Either kind grows to fit masses
    /// outside of the expected range.
    #[must_use]
    pub fn new(storage: Storage, decimals: u32, lowest: f64, highest: f64) -> Self {
        let scale = scale(decimals);
        Self::with_tick_range(storage, scale, to_tick(lowest, scale), to_tick(highest, scale))
    }

    pub(crate) fn with_tick_range(storage: Storage, scale: f64, lowest: i64, highest: i64) -> Self {
        let bins = match storage {
            Storage::Sparse => Bins::Sparse(BTreeMap::new()),
            Storage::Dense => Bins::Dense {
                start: lowest,
                values: vec![0.0; dense_width(lowest, highest)],
            },
        };
        Self { scale, bins }
    }

    /// Empties every bin and expects masses between the ticks `lowest` and `highest` from now on. `Dense` storage
    /// reuses the space it has already allocated.
    pub(crate) fn reset(&mut self, lowest: i64, highest: i64) {
        match &mut self.bins {
            Bins::Sparse(bins) => bins.clear(),
            Bins::Dense { start, values } => {
                values.clear();
                values.resize(dense_width(lowest, highest), 0.0);
                *start = lowest;
            }
        }
    }

    /// Adds `intensity` to the bin nearest `mass`
    pub fn add(&mut self, mass: f64, intensity: f64) {
        self.add_tick(to_tick(mass, self.scale), intensity);
    }

    pub fn add_spectrum(&mut self, spectrum: &Spectrum) {
        for (mass, intensity) in spectrum.iter() {
            self.add(mass, intensity);
        }
    }

    /// Scales every bin so that the largest equals `ceiling`. Does nothing to an empty accumulator.
    pub fn normalize(&mut self, ceiling: f64) {
        let Some(max) = self.max_intensity() else {
            return;
        };
        // NOTE: Dividing before multiplying means the largest bin lands on exactly `ceiling`
        self.values_mut().for_each(|v| *v = *v / max * ceiling);
    }

    /// Empties every bin with an intensity below `floor`
    pub fn threshold(&mut self, floor: f64) {
        match &mut self.bins {
            Bins::Sparse(bins) => bins.retain(|_, &mut v| v >= floor),
            Bins::Dense { values, .. } => values
                .iter_mut()
                .filter(|v| **v < floor)
                .for_each(|v| *v = 0.0),
        }
    }

    /// The intensity of the bin nearest `mass`, if that bin isn't empty
    #[must_use]
    pub fn nearest(&self, mass: f64) -> Option<f64> {
        let tick = to_tick(mass, self.scale);
        let value = match &self.bins {
            Bins::Sparse(bins) => bins.get(&tick).copied(),
            Bins::Dense { start, values } => usize::try_from(tick - start)
                .ok()
                .and_then(|i| values.get(i).copied()),
        };
        value.filter(|&v| v != 0.0)
    }

    /// The masses of the lightest and heaviest non-empty bins
    #[must_use]
    pub fn mass_range(&self) -> Option<(f64, f64)> {
        let mut ticks = self.ticks().map(|(tick, _)| tick);
        let lightest = ticks.next()?;
        let heaviest = ticks.last().unwrap_or(lightest);
        Some((self.to_mass(lightest), self.to_mass(heaviest)))
    }

    #[must_use]
    pub fn max_intensity(&self) -> Option<f64> {
        self.ticks().map(|(_, v)| v).reduce(f64::max)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ticks().next().is_none()
    }

    /// Drops the empty bins and pairs the rest with their masses
    #[must_use]
    pub fn into_spectrum(self) -> Spectrum {
        let scale = self.scale;
        self.nonempty_ticks()
            .into_iter()
            .map(|(tick, intensity)| (tick_to_mass(tick, scale), intensity))
            .collect()
    }

    pub(crate) fn add_tick(&mut self, tick: i64, intensity: f64) {
        match &mut self.bins {
            Bins::Sparse(bins) => *bins.entry(tick).or_default() += intensity,
            Bins::Dense { start, values } => {
                if tick < *start {
                    let missing = usize::try_from(*start - tick).unwrap_or_default();
                    values.splice(0..0, std::iter::repeat_n(0.0, missing));
                    *start = tick;
                }
                let index = usize::try_from(tick - *start).unwrap_or_default();
                if index >= values.len() {
                    values.resize(index + 1, 0.0);
                }
                values[index] += intensity;
            }
        }
    }

    pub(crate) fn nonempty_ticks(&self) -> Vec<(i64, f64)> {
        self.ticks().collect()
    }

    fn ticks(&self) -> Box<dyn Iterator<Item = (i64, f64)> + '_> {
        match &self.bins {
            Bins::Sparse(bins) => Box::new(bins.iter().map(|(&t, &v)| (t, v)).filter(|&(_, v)| v != 0.0)),
            Bins::Dense { start, values } => Box::new(
                (*start..)
                    .zip(values.iter().copied())
                    .filter(|&(_, v)| v != 0.0),
            ),
        }
    }

    fn values_mut(&mut self) -> Box<dyn Iterator<Item = &mut f64> + '_> {
        match &mut self.bins {
            Bins::Sparse(bins) => Box::new(bins.values_mut()),
            Bins::Dense { values, .. } => Box::new(values.iter_mut()),
        }
    }

    fn to_mass(&self, tick: i64) -> f64 {
        tick_to_mass(tick, self.scale)
    }
}

fn dense_width(lowest: i64, highest: i64) -> usize {
    usize::try_from(highest - lowest + 1).unwrap_or_default()
}

pub(crate) fn scale(decimals: u32) -> f64 {
    10_f64.powi(i32::try_from(decimals).unwrap_or(i32::MAX))
}

#[allow(clippy::cast_possible_truncation)]
fn to_tick(mass: f64, scale: f64) -> i64 {
    (mass * scale).round() as i64
}

pub(crate) fn tick_to_mass(tick: i64, scale: f64) -> f64 {
    tick as f64 / scale
}
