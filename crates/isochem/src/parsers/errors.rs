use std::fmt;

// External Crate Imports
use miette::{Diagnostic, LabeledSpan, SourceCode, SourceSpan};
use nom::{
    IResult, Parser,
    combinator::consumed,
    error::{ErrorKind, ParseError as NomParseError},
};
use thiserror::Error;

// Local Crate Imports
use crate::atoms::errors::AtomicLookupError;

pub type ParseResult<'a, O> = IResult<&'a str, O, ParseError<'a>>;

/// A formula that couldn't be parsed, along with the region of it responsible
#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("{kind}")]
pub struct FormulaError {
    // NOTE: Stored with an additional trailing space, so that labels can point to the end of the formula
    source_code: String,
    span: SourceSpan,
    kind: FormulaErrorKind,
}

/// The broad class of mistake a `FormulaError` represents
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCategory {
    MalformedFormula,
    UnknownSpecies,
    UnknownIsotope,
    InvalidCharge,
}

#[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
pub enum FormulaErrorKind {
    #[diagnostic(help("try something like C6H12O6, Fe(CN)6(3-), or (13C)H4"))]
    #[error("the formula is empty")]
    EmptyFormula,

    #[diagnostic(help("add a matching closing bracket, or remove this one"))]
    #[error("the '{0}' bracket is never closed")]
    UnclosedBracket(char),

    #[diagnostic(help("brackets can be nested, but each must be closed by its own kind of bracket"))]
    #[error("expected '{expected}' to close the '{open}' bracket, but found '{found}'")]
    MismatchedBracket {
        open: char,
        expected: char,
        found: char,
    },

    #[diagnostic(help("you've probably forgotten to open a bracket earlier in the formula"))]
    #[error("found a closing '{0}' bracket without a matching opening bracket")]
    UnmatchedBracket(char),

    #[diagnostic(help(
        "formulae are made of elements, isotopes (like 13C), abbreviations, counts, brackets, and charges"
    ))]
    #[error("unexpected character {0:?} in the formula")]
    UnexpectedCharacter(char),

    #[diagnostic(help(
        "a 0 value doesn't make sense here, if you've mistakenly included a leading zero, like \
        NH02, try just NH2 instead"
    ))]
    #[error("counts and mass numbers cannot start with 0")]
    ExpectedNoLeadingZero,

    #[error("counts and mass numbers must be less than 4294967296")]
    CountOverflow,

    #[diagnostic(help(
        "a charge is a non-zero number with at most one sign, like 2+, +2, 3-, or 2, and it must come last in \
        its bracket or in the formula"
    ))]
    #[error("{0:?} is not a valid charge")]
    InvalidCharge(String),

    #[diagnostic(help(
        "double-check for typos (symbols are case-sensitive), or add a new entry to the abbreviation table"
    ))]
    #[error("{0:?} could not be found among the supplied abbreviations or elements")]
    UnknownSpecies(String),

    #[diagnostic(transparent)]
    #[error(transparent)]
    Lookup(Box<AtomicLookupError>),

    #[error("expected a charge")]
    ExpectedCharge,

    #[diagnostic(help(
        "this is an internal error that you shouldn't ever see! If you have gotten this error, \
        then please report it as a bug!"
    ))]
    #[error("internal `nom` error: {0:?}")]
    NomError(ErrorKind),
}

// Formula Errors ======================================================================================================

impl FormulaError {
    pub(crate) fn new(formula: &str, span: impl Into<SourceSpan>, kind: FormulaErrorKind) -> Self {
        Self {
            source_code: format!("{formula} "),
            span: span.into(),
            kind,
        }
    }

    #[must_use]
    pub fn formula(&self) -> &str {
        // SAFETY: `source_code` always ends with the single space added in `FormulaError::new()`
        self.source_code.strip_suffix(' ').unwrap()
    }

    #[must_use]
    pub const fn span(&self) -> SourceSpan {
        self.span
    }

    #[must_use]
    pub const fn kind(&self) -> &FormulaErrorKind {
        &self.kind
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

impl Diagnostic for FormulaError {
    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.kind.help()
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.source_code)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let label = self.kind.label()?;
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(label.to_owned()),
            self.span,
        ))))
    }
}

impl FormulaErrorKind {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidCharge(_) => ErrorCategory::InvalidCharge,
            Self::UnknownSpecies(_) => ErrorCategory::UnknownSpecies,
            // NOTE: Stuck with this nested match until either `box_patterns` or `deref_patterns` are stabilized
            Self::Lookup(e) => match **e {
                AtomicLookupError::Element(..) => ErrorCategory::UnknownSpecies,
                AtomicLookupError::Isotope(..) | AtomicLookupError::Abundance(..) => {
                    ErrorCategory::UnknownIsotope
                }
            },
            _ => ErrorCategory::MalformedFormula,
        }
    }

    fn label(&self) -> Option<&'static str> {
        Some(match self {
            Self::Lookup(e) => match **e {
                AtomicLookupError::Element(..) => "element not found",
                AtomicLookupError::Isotope(..) => "isotope not found",
                AtomicLookupError::Abundance(..) => "no natural abundance",
            },
            Self::UnclosedBracket(_) => "unclosed bracket",
            Self::MismatchedBracket { .. } => "mismatched brackets",
            Self::UnmatchedBracket(_) => "unmatched bracket",
            Self::UnexpectedCharacter(_) => "input was valid up until this point",
            Self::ExpectedNoLeadingZero => "expected non-zero",
            Self::CountOverflow => "too large",
            Self::InvalidCharge(_) => "invalid charge",
            Self::UnknownSpecies(_) => "unknown species",
            Self::NomError(_) => "the region that triggered this bug!",
            Self::EmptyFormula | Self::ExpectedCharge => return None,
        })
    }
}

impl From<AtomicLookupError> for FormulaErrorKind {
    fn from(error: AtomicLookupError) -> Self {
        Self::Lookup(Box::new(error))
    }
}

impl From<ErrorKind> for FormulaErrorKind {
    fn from(kind: ErrorKind) -> Self {
        Self::NomError(kind)
    }
}

// Parse Errors ========================================================================================================

/// The error type threaded through the `nom` parsers, converted into a `FormulaError` once parsing is finished
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ParseError<'a> {
    input: &'a str,
    length: usize,
    kind: FormulaErrorKind,
}

impl<'a> ParseError<'a> {
    pub(crate) const fn new(input: &'a str, kind: FormulaErrorKind) -> Self {
        Self::with_length(input, 0, kind)
    }

    pub(crate) const fn with_length(input: &'a str, length: usize, kind: FormulaErrorKind) -> Self {
        Self {
            input,
            length,
            kind,
        }
    }

    pub(crate) const fn kind(&self) -> &FormulaErrorKind {
        &self.kind
    }

    // NOTE: `nom` only ever hands parsers suffixes of the original input, so the offset of an error is just the
    // difference in length between the two
    pub(crate) fn into_formula_error(self, formula: &str) -> FormulaError {
        let offset = formula.len() - self.input.len();
        FormulaError::new(formula, (offset, self.length), self.kind)
    }
}

impl<'a> NomParseError<&'a str> for ParseError<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        Self::new(input, kind.into())
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

// Error-Handling Combinators ==========================================================================================

/// Replaces any error returned by `parser` with one of the given `kind`
pub(crate) fn expect<'a, O>(
    mut parser: impl Parser<&'a str, O, ParseError<'a>>,
    kind: FormulaErrorKind,
) -> impl FnMut(&'a str) -> ParseResult<'a, O> {
    move |i| {
        parser
            .parse(i)
            .map_err(|e| e.map(|_| ParseError::new(i, kind.clone())))
    }
}

/// Like `nom::combinator::map_res`, but a failed mapping is fatal and labels everything `parser` consumed
pub(crate) fn map_res<'a, O1, O2, E: Into<FormulaErrorKind>>(
    parser: impl Parser<&'a str, O1, ParseError<'a>>,
    mut f: impl FnMut(O1) -> Result<O2, E>,
) -> impl FnMut(&'a str) -> ParseResult<'a, O2> {
    let mut parser = consumed(parser);
    move |i| {
        let (rest, (consumed, o1)) = parser(i)?;
        match f(o1) {
            Ok(o2) => Ok((rest, o2)),
            Err(e) => Err(nom::Err::Failure(ParseError::with_length(
                i,
                consumed.len(),
                e.into(),
            ))),
        }
    }
}

/// Builds a fatal error covering `length` bytes from the start of `input`
pub(crate) fn failure<'a, O>(
    input: &'a str,
    length: usize,
    kind: FormulaErrorKind,
) -> ParseResult<'a, O> {
    Err(nom::Err::Failure(ParseError::with_length(input, length, kind)))
}
