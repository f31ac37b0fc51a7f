use crate::{Charge, Spectrum};

/// Raw peaks closer together than this (in mass units) are unresolvable, and are merged into a single bar
const GROUP_GAP: f64 = 0.5;

#[derive(Copy, Clone, Debug)]
struct Group {
    weighted_mass: f64,
    intensity: f64,
}

impl Group {
    const fn new(mass: f64, intensity: f64) -> Self {
        Self {
            weighted_mass: mass * intensity,
            intensity,
        }
    }

    fn add(&mut self, mass: f64, intensity: f64) {
        self.weighted_mass += mass * intensity;
        self.intensity += intensity;
    }

    fn centroid(self) -> f64 {
        self.weighted_mass / self.intensity
    }
}

/// Consolidates the raw pattern into resolvable peaks: each run of peaks separated by no more than 0.5 becomes one bar
/// at their intensity-weighted mean mass, with their summed intensity. Masses are then divided by the magnitude of
/// `charge`, and intensities normalised so the tallest bar is exactly 100.
pub(crate) fn bar_pattern(raw: &Spectrum, charge: Charge) -> Spectrum {
    let mut groups: Vec<Group> = Vec::new();
    let mut previous = None;
    for (mass, intensity) in raw.iter() {
        match groups.last_mut() {
            Some(group) if previous.is_some_and(|p| mass - p <= GROUP_GAP) => group.add(mass, intensity),
            _ => groups.push(Group::new(mass, intensity)),
        }
        previous = Some(mass);
    }

    let Some(max) = groups.iter().map(|g| g.intensity).reduce(f64::max) else {
        return Spectrum::default();
    };
    let charge = i64::from(charge.abs()) as f64;
    groups
        .into_iter()
        .map(|group| (group.centroid() / charge, group.intensity / max * 100.0))
        .collect()
}
