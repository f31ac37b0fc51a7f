use miette::Diagnostic;
use thiserror::Error;

use crate::{
    atoms::errors::DatabaseError,
    molecules::{config::ConfigError, mutation::MutationError},
    parsers::errors::FormulaError,
};

pub type Result<T, E = Box<IsochemError>> = std::result::Result<T, E>;

#[derive(Debug, Diagnostic, Clone, PartialEq, Error)]
pub enum IsochemError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Formula {
        #[from]
        error: FormulaError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Database {
        #[from]
        error: DatabaseError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Mutation {
        #[from]
        error: MutationError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidConfiguration {
        #[from]
        error: ConfigError,
    },

    #[diagnostic(help("a molecule needs at least one atom, so try adding an element or isotope"))]
    #[error("the formula {0:?} doesn't contain any atoms")]
    EmptyComposition(String),

    #[error(
        "a spectrum needs as many intensities as m/z values, but {mz} m/z values and {intensity} intensities were \
        given"
    )]
    SpectrumLength { mz: usize, intensity: usize },
}

impl IsochemError {
    pub(crate) fn empty_composition(formula: &str) -> Self {
        Self::EmptyComposition(formula.to_owned())
    }

    pub(crate) const fn spectrum_length(mz: usize, intensity: usize) -> Self {
        Self::SpectrumLength { mz, intensity }
    }
}

// NOTE: Lets `?` box errors from the rest of the crate without an intermediate `.map_err()`
macro_rules! boxed_from_impls {
    ($($error:ty),+ $(,)?) => {
        $(
            impl From<$error> for Box<IsochemError> {
                fn from(error: $error) -> Self {
                    Box::new(error.into())
                }
            }
        )+
    };
}

boxed_from_impls!(FormulaError, DatabaseError, MutationError, ConfigError);
