use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
    hash::{Hash, Hasher},
};

use itertools::Itertools;

use crate::{Abundance, Element, Isotope, Mass, MassNumber, Massive, Result};

use super::{
    atomic_database::{AtomicDatabase, ElementDescription},
    errors::AtomicLookupError,
};

impl<'a> Element<'a> {
    pub fn new(db: &'a AtomicDatabase, symbol: impl AsRef<str>) -> Result<Self, AtomicLookupError> {
        Self::lookup(db, symbol, None)
    }

    pub fn new_isotope(
        db: &'a AtomicDatabase,
        symbol: impl AsRef<str>,
        mass_number: impl Into<MassNumber>,
    ) -> Result<Self, AtomicLookupError> {
        Self::lookup(db, symbol, Some(mass_number.into()))
    }

    fn lookup(
        db: &'a AtomicDatabase,
        symbol: impl AsRef<str>,
        mass_number: Option<MassNumber>,
    ) -> Result<Self, AtomicLookupError> {
        let symbol = symbol.as_ref();
        let (symbol, ElementDescription { name, isotopes }) = db
            .elements
            .get_key_value(symbol)
            .ok_or_else(|| AtomicLookupError::element(symbol))?;

        let element = Self {
            symbol,
            name,
            mass_number,
            isotopes,
        };

        Self::validate_isotopes(element)
    }

    fn validate_isotopes(
        element @ Self {
            symbol,
            name,
            mass_number,
            isotopes,
        }: Self,
    ) -> Result<Self, AtomicLookupError> {
        if let Some(mass_number) = mass_number {
            if !isotopes.contains_key(&mass_number) {
                return Err(AtomicLookupError::isotope(
                    symbol,
                    mass_number,
                    name,
                    isotopes,
                ));
            }
        } else if element.natural_isotopes().next().is_none() {
            return Err(AtomicLookupError::abundance(symbol, name, isotopes));
        }

        Ok(element)
    }

    #[must_use]
    pub const fn symbol(&self) -> &'a str {
        self.symbol
    }

    #[must_use]
    pub const fn name(&self) -> &'a str {
        self.name
    }

    #[must_use]
    pub const fn mass_number(&self) -> Option<MassNumber> {
        self.mass_number
    }

    #[must_use]
    pub const fn is_isotope(&self) -> bool {
        self.mass_number.is_some()
    }

    /// The key this element is sorted and written by: its symbol, prefixed by the mass number of explicit isotopes
    #[must_use]
    pub fn designator(&self) -> String {
        self.mass_number.map_or_else(
            || self.symbol.to_owned(),
            |mass_number| format!("{mass_number}{}", self.symbol),
        )
    }

    pub(crate) fn isotope_mass(&self) -> Option<Mass> {
        self.mass_number
            .and_then(|a| self.isotopes.get(&a))
            .map(|i| i.relative_mass)
    }

    /// Isotopes with a non-zero natural abundance, in order of increasing mass number
    pub(crate) fn natural_isotopes(&self) -> impl Iterator<Item = (Mass, Abundance)> + 'a {
        self.isotopes
            .iter()
            .filter_map(|(&mass_number, &Isotope { relative_mass, abundance })| {
                abundance
                    .filter(|a| !a.is_zero())
                    .map(|a| (mass_number, relative_mass, a))
            })
            .sorted_unstable_by_key(|&(mass_number, ..)| mass_number)
            .map(|(_, mass, abundance)| (mass, abundance))
    }
}

// Display and Comparison Trait Implementations ========================================================================

impl Display for Element<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let symbol = self.symbol;
        if let Some(mass_number) = self.mass_number {
            write!(f, "({mass_number}{symbol})")
        } else {
            write!(f, "{symbol}")
        }
    }
}

// NOTE: Two `Element`s looked up from the same `AtomicDatabase` are identical iff their symbols and mass numbers are
impl PartialEq for Element<'_> {
    fn eq(&self, other: &Self) -> bool {
        (self.symbol, self.mass_number) == (other.symbol, other.mass_number)
    }
}

impl Eq for Element<'_> {}

impl Hash for Element<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
        self.mass_number.hash(state);
    }
}

impl PartialOrd for Element<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Element<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.symbol, self.mass_number).cmp(&(other.symbol, other.mass_number))
    }
}

// Massive Trait Implementation ========================================================================================

impl Massive for Element<'_> {
    fn monoisotopic_mass(&self) -> Mass {
        // SAFETY: The call to `.unwrap()` is safe here since `.natural_isotopes()` is guaranteed to yield at least
        // one isotope for elements without a mass number
        self.isotope_mass().unwrap_or_else(|| {
            self.natural_isotopes()
                .max_by_key(|&(_, abundance)| abundance)
                .unwrap()
                .0
        })
    }

    fn average_mass(&self) -> Mass {
        self.isotope_mass().unwrap_or_else(|| {
            self.natural_isotopes()
                .map(|(mass, abundance)| mass * abundance)
                .sum()
        })
    }
}
