//! Theoretical isotope patterns, masses, and elemental compositions for chemical formulae

pub mod atoms;
pub mod errors;
pub mod molecules;
pub mod parsers;
pub mod spectra;
#[cfg(test)]
mod testing_tools;

use std::{collections::BTreeMap, num::NonZeroU32};

// External Crate Imports
use ahash::HashMap;
use derive_more::{Add, AddAssign, Display, From, Into, Sub, Sum};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use static_assertions::assert_impl_all;

pub use atoms::{abbreviations::AbbreviationDatabase, atomic_database::AtomicDatabase};
pub use errors::{IsochemError, Result};
pub use molecules::{
    config::{Config, Storage},
    mutation::Operand,
    statistics::{Bounds, BoundsMode},
};

// NOTE: For the types in this module, 'a lifetimes indicate references to the AtomicDatabase (or to the
// AbbreviationDatabase, which itself only borrows from the AtomicDatabase)

// Molecules ===========================================================================================================

#[derive(Copy, Clone, Debug)]
pub struct Simulator<'a> {
    atomic_db: &'a AtomicDatabase,
    abbreviations: &'a AbbreviationDatabase<'a>,
    config: Config,
}

#[derive(Clone, Debug)]
pub struct Molecule<'a> {
    simulator: Simulator<'a>,
    state: MoleculeState<'a>,
    snapshot: MoleculeState<'a>,
}

// NOTE: Everything derived from the composition is computed eagerly, so a `MoleculeState` is only ever replaced
// wholesale, never patched field-by-field
#[derive(Clone, PartialEq, Debug)]
struct MoleculeState<'a> {
    formula: String,
    composition: Composition<'a>,
    charge: Charge,
    molecular_weight: Mass,
    percent_composition: BTreeMap<&'a str, Decimal>,
    raw_pattern: Spectrum,
    bar_pattern: Spectrum,
    exact_mass: f64,
    fwhm: f64,
    sigma: f64,
}

// Compositions ========================================================================================================

#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Composition<'a>(BTreeMap<Element<'a>, Count>);

#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct ParsedFormula<'a> {
    pub composition: Composition<'a>,
    pub charge: Option<Charge>,
}

// Atoms ===============================================================================================================

#[derive(Copy, Clone, Debug)]
pub struct Element<'a> {
    symbol: &'a str,
    name: &'a str,
    mass_number: Option<MassNumber>,
    isotopes: &'a HashMap<MassNumber, Isotope>,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Into, Serialize)]
pub struct Count(NonZeroU32);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Into, Serialize)]
pub struct MassNumber(NonZeroU32);

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Isotope {
    relative_mass: Mass,
    abundance: Option<Abundance>,
}

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, From, Into, Serialize, Deserialize,
)]
pub struct Charge(pub i64);

#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Debug,
    Default,
    Display,
    From,
    Into,
    Add,
    AddAssign,
    Sub,
    Sum,
    Serialize,
)]
pub struct Mass(Decimal);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, From, Into, Serialize)]
pub struct Abundance(Decimal);

// Spectra =============================================================================================================

/// Paired m/z and intensity values, sorted by m/z
#[derive(Clone, PartialEq, Debug, Default, Serialize)]
pub struct Spectrum {
    mz: Vec<f64>,
    intensity: Vec<f64>,
}

// =====================================================================================================================

pub trait Massive {
    fn monoisotopic_mass(&self) -> Mass;
    fn average_mass(&self) -> Mass;
}

// Blanket impls

macro_rules! massive_ref_impls {
    ($($ref_type:ty),+ $(,)?) => {
        $(
            impl<T: Massive> Massive for $ref_type {
                fn monoisotopic_mass(&self) -> Mass {
                    (**self).monoisotopic_mass()
                }

                fn average_mass(&self) -> Mass {
                    (**self).average_mass()
                }
            }
        )+
    };
}

massive_ref_impls!(&T, &mut T, Box<T>);

// The reference tables are meant to live in `static`s and be shared freely
assert_impl_all!(AtomicDatabase: Send, Sync);
assert_impl_all!(AbbreviationDatabase<'static>: Send, Sync);
assert_impl_all!(Molecule<'static>: Send, Sync, Clone);
