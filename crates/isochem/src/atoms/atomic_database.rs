use std::collections::BTreeMap;

use ahash::HashMap;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{Abundance, Isotope, Mass, MassNumber, Result};

use super::errors::DatabaseError;

pub const DEFAULT_TOML: &str = include_str!("../../data/atomic_database.toml");

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct AtomicDatabase {
    pub(crate) elements: HashMap<String, ElementDescription>,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub(crate) struct ElementDescription {
    pub(crate) name: String,
    pub(crate) isotopes: HashMap<MassNumber, Isotope>,
}

impl AtomicDatabase {
    pub fn new(file_name: impl AsRef<str>, toml: impl AsRef<str>) -> Result<Self> {
        let schema: AtomicDatabaseToml =
            toml::from_str(toml.as_ref()).map_err(|e| DatabaseError::toml(file_name, &e))?;
        let elements = schema
            .elements
            .into_iter()
            .map(|(symbol, element)| element.into_description(&symbol).map(|d| (symbol, d)))
            .collect::<Result<_, _>>()?;

        Ok(Self { elements })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[must_use]
    pub fn contains(&self, symbol: impl AsRef<str>) -> bool {
        self.elements.contains_key(symbol.as_ref())
    }
}

impl Default for AtomicDatabase {
    fn default() -> Self {
        // SAFETY: The embedded database is checked by the `default_database` test below
        Self::new("atomic_database.toml", DEFAULT_TOML).unwrap()
    }
}

// TOML Schema =========================================================================================================

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AtomicDatabaseToml {
    elements: BTreeMap<String, ElementToml>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ElementToml {
    name: String,
    #[serde(default)]
    isotopes: BTreeMap<String, IsotopeToml>,
}

// NOTE: Masses and abundances are kept as strings in the TOML file, since TOML floats would lose precision on their
// way to becoming `Decimal`s
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct IsotopeToml {
    mass: String,
    abundance: Option<String>,
}

// Schema Validation and Conversion ====================================================================================

pub(crate) fn is_symbol(symbol: &str) -> bool {
    let mut chars = symbol.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase()) && chars.all(|c| c.is_ascii_lowercase())
}

impl ElementToml {
    fn into_description(self, symbol: &str) -> Result<ElementDescription, DatabaseError> {
        if !is_symbol(symbol) {
            return Err(DatabaseError::ElementSymbol(symbol.to_owned()));
        }

        if self.isotopes.is_empty() {
            return Err(DatabaseError::NoIsotopes(symbol.to_owned()));
        }

        let isotopes: HashMap<_, _> = self
            .isotopes
            .into_iter()
            .map(|(mass_number, isotope)| isotope.into_isotope(symbol, &mass_number))
            .collect::<Result<_, _>>()?;

        let mut abundances = isotopes
            .values()
            .filter_map(|i| i.abundance)
            .map(Decimal::from)
            .peekable();
        if abundances.peek().is_some() {
            let total: Decimal = abundances.sum();
            if total != Decimal::ONE {
                return Err(DatabaseError::AbundanceSum(symbol.to_owned(), total));
            }
        }

        Ok(ElementDescription {
            name: self.name,
            isotopes,
        })
    }
}

impl IsotopeToml {
    fn into_isotope(
        self,
        symbol: &str,
        mass_number: &str,
    ) -> Result<(MassNumber, Isotope), DatabaseError> {
        let label = format!("{mass_number}{symbol}");
        let mass_number = mass_number
            .parse()
            .ok()
            .and_then(MassNumber::new)
            .ok_or_else(|| DatabaseError::MassNumber(symbol.to_owned(), mass_number.to_owned()))?;

        let relative_mass = Decimal::from_str_exact(&self.mass)
            .map_err(|_| DatabaseError::decimal("mass", &self.mass, label.clone()))?;
        if relative_mass <= Decimal::ZERO {
            return Err(DatabaseError::NonPositiveMass(label, relative_mass));
        }

        let abundance = self
            .abundance
            .map(|a| {
                let abundance = Decimal::from_str_exact(&a)
                    .map_err(|_| DatabaseError::decimal("abundance", &a, label.clone()))?;
                if (Decimal::ZERO..=Decimal::ONE).contains(&abundance) {
                    Ok(Abundance(abundance))
                } else {
                    Err(DatabaseError::AbundanceRange(label.clone(), abundance))
                }
            })
            .transpose()?;

        let isotope = Isotope {
            relative_mass: Mass(relative_mass),
            abundance,
        };
        Ok((mass_number, isotope))
    }
}

impl Isotope {
    #[must_use]
    pub const fn relative_mass(&self) -> Mass {
        self.relative_mass
    }

    #[must_use]
    pub const fn abundance(&self) -> Option<Abundance> {
        self.abundance
    }
}
