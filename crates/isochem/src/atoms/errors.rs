use ahash::HashMap;
use miette::Diagnostic;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{Isotope, MassNumber, parsers::errors::FormulaError};

// NOTE: Public so that parsers using elements as a building block can inspect errors
#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum AtomicLookupError {
    #[diagnostic(help("double-check for typos, or add a new entry to the atomic database"))]
    #[error("the element {0:?} could not be found in the supplied atomic database")]
    Element(String),

    #[diagnostic(help("double-check for typos, or add a new entry to the atomic database"))]
    #[error(
        "the isotope \"{0}-{1}\" could not be found in the supplied atomic database, though the following {2} \
        isotopes were found: {3}"
    )]
    Isotope(String, MassNumber, String, String),

    #[diagnostic(help(
        "consider explicitly selecting the isotope to be used in mass calculations, e.g. ({2}{1})"
    ))]
    #[error("no natural abundance data could be found for {0} ({1}), though the following isotopes were found: {3}")]
    Abundance(String, String, MassNumber, String),
}

impl AtomicLookupError {
    pub(crate) fn element(symbol: &str) -> Self {
        Self::Element(symbol.to_owned())
    }

    pub(crate) fn isotope(
        symbol: &str,
        mass_number: MassNumber,
        name: &str,
        isotopes: &HashMap<MassNumber, Isotope>,
    ) -> Self {
        Self::Isotope(
            symbol.to_owned(),
            mass_number,
            name.to_owned(),
            Self::display_vec(isotopes.keys()),
        )
    }

    pub(crate) fn abundance(
        symbol: &str,
        name: &str,
        isotopes: &HashMap<MassNumber, Isotope>,
    ) -> Self {
        Self::Abundance(
            name.to_owned(),
            symbol.to_owned(),
            // SAFETY: Validation of the `AtomicDatabase` ensures there is always at least one isotope per element
            *isotopes.keys().min().unwrap(),
            Self::display_vec(isotopes.keys()),
        )
    }

    fn display_vec<I: Ord + ToString>(items: impl IntoIterator<Item = I>) -> String {
        let mut items: Vec<_> = items.into_iter().collect();
        items.sort_unstable();
        let items: Vec<_> = items.into_iter().map(|i| i.to_string()).collect();
        format!("[{}]", items.join(", "))
    }
}

#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum DatabaseError {
    #[diagnostic(help("check the TOML syntax and that every field is spelled correctly"))]
    #[error("failed to read {file}: {message}")]
    Toml { file: String, message: String },

    #[diagnostic(help("element symbols are one uppercase ASCII letter followed by any lowercase ones"))]
    #[error("{0:?} is not a valid element symbol")]
    ElementSymbol(String),

    #[error("the element {0} doesn't have any isotopes")]
    NoIsotopes(String),

    #[error("the mass number {1:?} of {0} is not a positive integer")]
    MassNumber(String, String),

    #[error("the {field} {value:?} of {isotope} is not a valid decimal")]
    Decimal {
        field: &'static str,
        value: String,
        isotope: String,
    },

    #[error("the mass of {0} must be positive, but was {1}")]
    NonPositiveMass(String, Decimal),

    #[error("the natural abundance of {0} must lie between 0 and 1, but was {1}")]
    AbundanceRange(String, Decimal),

    #[diagnostic(help("natural abundances are fractions, and should sum to exactly 1"))]
    #[error("the natural abundances of {0} sum to {1}")]
    AbundanceSum(String, Decimal),

    #[diagnostic(help("abbreviations can't share a symbol with an element in the atomic database"))]
    #[error("the abbreviation {0:?} shadows an element with the same symbol")]
    ShadowedElement(String),

    #[diagnostic(help("abbreviations are one uppercase ASCII letter followed by any lowercase ones"))]
    #[error("{0:?} is not a valid abbreviation")]
    AbbreviationSymbol(String),

    #[error("the formula of the abbreviation {abbr:?} is invalid")]
    AbbreviationFormula {
        abbr: String,
        #[source]
        error: FormulaError,
    },

    #[diagnostic(help("abbreviations should only contribute atoms, so leave any charge off of their formula"))]
    #[error("the formula of the abbreviation {0:?} specifies a charge")]
    AbbreviationCharge(String),
}

impl DatabaseError {
    pub(crate) fn toml(file: impl AsRef<str>, error: &toml::de::Error) -> Self {
        let file = file.as_ref().to_owned();
        let message = error.message().to_owned();

        Self::Toml { file, message }
    }

    pub(crate) fn decimal(field: &'static str, value: &str, isotope: String) -> Self {
        let value = value.to_owned();

        Self::Decimal {
            field,
            value,
            isotope,
        }
    }
}
