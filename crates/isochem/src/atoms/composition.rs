use std::{
    collections::{BTreeMap, btree_map::Entry},
    fmt::{self, Display, Formatter},
};

// External Crate Imports
use itertools::Itertools;
use rust_decimal::Decimal;

// Local Crate Imports
use crate::{
    AbbreviationDatabase, AtomicDatabase, Charge, Composition, Count, Element, Mass, Massive,
    ParsedFormula, Result, parsers::formula,
};

// Public API ==========================================================================================================

impl<'a> ParsedFormula<'a> {
    pub fn new(
        atomic_db: &'a AtomicDatabase,
        abbreviations: &AbbreviationDatabase<'a>,
        text: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(formula::formula(atomic_db, Some(abbreviations), text.as_ref())?)
    }

    /// Adds `multiplier` copies of `other` to this formula. A charge in `other` replaces this one, but is never
    /// multiplied. Returns `None` if any count would overflow.
    pub(crate) fn merge(&mut self, other: Self, multiplier: Count) -> Option<()> {
        self.composition.checked_extend(&other.composition, multiplier)?;
        self.charge = other.charge.or(self.charge);
        Some(())
    }
}

impl<'a> Composition<'a> {
    /// Looks up the count of a plain element (like `"C"`) or an explicit isotope (like `"13C"`)
    #[must_use]
    pub fn get(&self, designator: impl AsRef<str>) -> Option<Count> {
        let designator = designator.as_ref();
        self.iter()
            .find_map(|(element, count)| (element.designator() == designator).then_some(count))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Element<'a>, Count)> {
        self.0.iter().map(|(element, &count)| (element, count))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Elements in Hill order: carbon, then hydrogen, then everything else alphabetically when plain carbon is
    /// present, otherwise everything alphabetically. Explicit isotopes sort by their designator (e.g. `"13C"`).
    pub fn hill_order(&self) -> impl Iterator<Item = (&Element<'a>, Count)> {
        let has_carbon = self.0.keys().any(|e| e.symbol() == "C" && !e.is_isotope());
        self.iter().sorted_by_cached_key(|(element, _)| {
            let designator = element.designator();
            let rank = match designator.as_str() {
                "C" if has_carbon => 0,
                "H" if has_carbon => 1,
                _ => 2,
            };
            (rank, designator)
        })
    }

    /// The fraction of the molecular weight contributed by each element, with explicit isotopes counted towards
    /// their element. The fractions sum to one; scale by 100 for percentages.
    #[must_use]
    pub fn percent_composition(&self) -> BTreeMap<&'a str, Decimal> {
        let total = self.average_mass();
        let mut fractions = BTreeMap::new();
        if total == Mass::default() {
            return fractions;
        }

        for (element, count) in self.iter() {
            let Mass(contribution) = count * element.average_mass();
            *fractions.entry(element.symbol()).or_default() += contribution / total.0;
        }
        fractions
    }

    pub(crate) fn add_element(&mut self, element: Element<'a>, count: Count) -> Option<()> {
        match self.0.entry(element) {
            Entry::Vacant(entry) => {
                entry.insert(count);
            }
            Entry::Occupied(mut entry) => {
                let total = entry.get().checked_add(count)?;
                entry.insert(total);
            }
        }
        Some(())
    }

    /// Adds `multiplier` copies of every element in `other`. Returns `None` (possibly after partially extending
    /// `self`) if any count would overflow, so callers should discard `self` on failure.
    pub(crate) fn checked_extend(&mut self, other: &Self, multiplier: Count) -> Option<()> {
        for (&element, &count) in &other.0 {
            self.add_element(element, count.checked_mul(multiplier)?)?;
        }
        Some(())
    }

    pub(crate) fn checked_scale(&self, factor: Count) -> Option<Self> {
        let mut scaled = Self::default();
        scaled.checked_extend(self, factor)?;
        Some(scaled)
    }
}

impl<'a> From<Element<'a>> for Composition<'a> {
    fn from(element: Element<'a>) -> Self {
        Self(BTreeMap::from([(element, Count::default())]))
    }
}

impl<'a> From<Composition<'a>> for ParsedFormula<'a> {
    fn from(composition: Composition<'a>) -> Self {
        Self {
            composition,
            charge: None,
        }
    }
}

impl From<Charge> for ParsedFormula<'_> {
    fn from(charge: Charge) -> Self {
        Self {
            composition: Composition::default(),
            charge: Some(charge),
        }
    }
}

// Massive Trait Implementation ========================================================================================

impl Massive for Composition<'_> {
    fn monoisotopic_mass(&self) -> Mass {
        self.iter()
            .map(|(element, count)| count * element.monoisotopic_mass())
            .sum()
    }

    fn average_mass(&self) -> Mass {
        self.iter()
            .map(|(element, count)| count * element.average_mass())
            .sum()
    }
}

// Display Trait Implementation ========================================================================================

impl Display for Composition<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (element, count) in self.hill_order() {
            write!(f, "{element}{count}")?;
        }
        Ok(())
    }
}

// Module Tests ========================================================================================================
