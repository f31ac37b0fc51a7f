// External Crate Imports
use nom::{
    Finish,
    branch::alt,
    character::complete::one_of,
    combinator::{map, opt},
    sequence::pair,
};

// Local Crate Imports
use super::{
    errors::{FormulaError, FormulaErrorKind, ParseResult, failure, map_res},
    primitives::{CLOSING_BRACKETS, charge, count, mass_number, token},
};
use crate::{
    AbbreviationDatabase, AtomicDatabase, Composition, Count, Element, ParsedFormula,
    atoms::errors::AtomicLookupError,
};

// Public API ==========================================================================================================

/// Formula = Segment , { Segment } ;
///
/// Abbreviations (when a table is supplied) are expanded as they're parsed, and take precedence over elements
pub fn formula<'a>(
    atomic_db: &'a AtomicDatabase,
    abbreviations: Option<&AbbreviationDatabase<'a>>,
    input: &str,
) -> Result<ParsedFormula<'a>, FormulaError> {
    if input.is_empty() {
        return Err(FormulaError::new(input, (0, 0), FormulaErrorKind::EmptyFormula));
    }

    let parser = FormulaParser {
        atomic_db,
        abbreviations,
    };
    let (rest, parsed) = parser
        .segments(input)
        .finish()
        .map_err(|e| e.into_formula_error(input))?;

    // NOTE: `segments` stops at the first thing it can't parse, so anything left over is an error
    if let Some(c) = rest.chars().next() {
        let offset = input.len() - rest.len();
        let kind = if CLOSING_BRACKETS.contains(&c) {
            FormulaErrorKind::UnmatchedBracket(c)
        } else {
            FormulaErrorKind::UnexpectedCharacter(c)
        };
        return Err(FormulaError::new(input, (offset, c.len_utf8()), kind));
    }

    Ok(parsed)
}

// Private Sub-Parsers =================================================================================================

struct FormulaParser<'a, 'p> {
    atomic_db: &'a AtomicDatabase,
    abbreviations: Option<&'p AbbreviationDatabase<'a>>,
}

impl<'a> FormulaParser<'a, '_> {
    /// Segments = { Segment } ;
    fn segments<'s>(&self, mut i: &'s str) -> ParseResult<'s, ParsedFormula<'a>> {
        let mut formula = ParsedFormula::default();
        loop {
            match self.segment(i) {
                Ok((rest, segment)) => {
                    if formula.merge(segment, Count::default()).is_none() {
                        return failure(i, i.len() - rest.len(), FormulaErrorKind::CountOverflow);
                    }
                    i = rest;
                }
                Err(nom::Err::Error(_)) => return Ok((i, formula)),
                Err(e) => return Err(e),
            }
        }
    }

    /// Segment = Group | Isotope Atoms | Token Atoms | Charge ;
    fn segment<'s>(&self, i: &'s str) -> ParseResult<'s, ParsedFormula<'a>> {
        alt((
            |i| self.group(i),
            |i| self.isotope_atoms(i),
            |i| self.token_atoms(i),
            map(charge, ParsedFormula::from),
        ))(i)
    }

    /// Group = Open , Segments , Close , [ Count ] ;
    /// Open = "(" | "[" | "{" ;
    /// Close = ")" | "]" | "}" ;   (* matching the kind of the opening bracket *)
    fn group<'s>(&self, i: &'s str) -> ParseResult<'s, ParsedFormula<'a>> {
        let (rest, open) = one_of("([{")(i)?;
        let (rest, inner) = self.segments(rest)?;

        let expected = closing_bracket(open);
        let rest = match rest.chars().next() {
            Some(c) if c == expected => &rest[c.len_utf8()..],
            Some(found) if CLOSING_BRACKETS.contains(&found) => {
                let length = i.len() - rest.len() + found.len_utf8();
                let kind = FormulaErrorKind::MismatchedBracket {
                    open,
                    expected,
                    found,
                };
                return failure(i, length, kind);
            }
            Some(c) => {
                return failure(rest, c.len_utf8(), FormulaErrorKind::UnexpectedCharacter(c));
            }
            None => return failure(i, i.len(), FormulaErrorKind::UnclosedBracket(open)),
        };

        let (rest, multiplier) = opt(count)(rest)?;
        scale(i, rest, inner, multiplier.unwrap_or_default())
    }

    /// Isotope Atoms = Mass Number , Token , [ Count ] ;
    fn isotope_atoms<'s>(&self, i: &'s str) -> ParseResult<'s, ParsedFormula<'a>> {
        let isotope = map_res(pair(mass_number, token), |(mass_number, symbol)| {
            Element::new_isotope(self.atomic_db, symbol, mass_number)
                .map_err(|e| unknown_species(symbol, e))
        });
        let (rest, (element, multiplier)) = pair(isotope, opt(count))(i)?;
        let composition = Composition::from(element);
        scale(i, rest, composition.into(), multiplier.unwrap_or_default())
    }

    /// Token Atoms = Token , [ Count ] ;
    fn token_atoms<'s>(&self, i: &'s str) -> ParseResult<'s, ParsedFormula<'a>> {
        let species = map_res(token, |token| self.lookup(token));
        let (rest, (composition, multiplier)) = pair(species, opt(count))(i)?;
        scale(i, rest, composition.into(), multiplier.unwrap_or_default())
    }

    fn lookup(&self, token: &str) -> Result<Composition<'a>, FormulaErrorKind> {
        if let Some(expansion) = self.abbreviations.and_then(|a| a.get(token)) {
            return Ok(expansion.clone());
        }

        Element::new(self.atomic_db, token)
            .map(Composition::from)
            .map_err(|e| unknown_species(token, e))
    }
}

fn scale<'a, 's>(
    i: &'s str,
    rest: &'s str,
    formula: ParsedFormula<'a>,
    multiplier: Count,
) -> ParseResult<'s, ParsedFormula<'a>> {
    let mut scaled = ParsedFormula::default();
    if scaled.merge(formula, multiplier).is_some() {
        Ok((rest, scaled))
    } else {
        failure(i, i.len() - rest.len(), FormulaErrorKind::CountOverflow)
    }
}

const fn closing_bracket(open: char) -> char {
    match open {
        '[' => ']',
        '{' => '}',
        _ => ')',
    }
}

fn unknown_species(token: &str, error: AtomicLookupError) -> FormulaErrorKind {
    match error {
        AtomicLookupError::Element(_) => FormulaErrorKind::UnknownSpecies(token.to_owned()),
        error => error.into(),
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use once_cell::sync::Lazy;

    use crate::{Charge, parsers::errors::ErrorCategory, testing_tools::assert_miette_labels};

    use super::*;

    static DB: Lazy<AtomicDatabase> = Lazy::new(AtomicDatabase::default);
    static ABBREVIATIONS: Lazy<AbbreviationDatabase> = Lazy::new(|| AbbreviationDatabase::builtin(&DB));

    fn parse(input: &str) -> Result<ParsedFormula<'static>, FormulaError> {
        formula(&DB, Some(&ABBREVIATIONS), input)
    }

    fn counts(input: &str) -> Vec<(String, u32)> {
        parse(input)
            .unwrap()
            .composition
            .iter()
            .map(|(element, count)| (element.designator(), count.get()))
            .collect()
    }

    fn charge_of(input: &str) -> Option<i64> {
        parse(input).unwrap().charge.map(i64::from)
    }

    macro_rules! assert_counts {
        ($input:literal, [$(($key:literal, $count:literal)),* $(,)?]) => {
            assert_eq!(counts($input), vec![$(($key.to_owned(), $count)),*]);
        };
    }

    macro_rules! assert_formula_error {
        ($input:literal, $category:ident, $label:literal, ($offset:literal, $length:literal)) => {
            let error = parse($input).unwrap_err();
            assert_eq!(error.category(), ErrorCategory::$category);
            assert_miette_labels!(error, [($label, $offset, $length)]);
        };
    }

    #[test]
    fn simple_formulae() {
        assert_counts!("H2O", [("H", 2), ("O", 1)]);
        assert_counts!("C6H12O6", [("C", 6), ("H", 12), ("O", 6)]);
        assert_counts!("NaCl", [("Cl", 1), ("Na", 1)]);
        assert_counts!("CH3CH2OH", [("C", 2), ("H", 6), ("O", 1)]);
        assert_counts!("C12H22O11", [("C", 12), ("H", 22), ("O", 11)]);
    }

    #[test]
    fn bracketed_groups() {
        assert_counts!("C(H2O)3", [("C", 1), ("H", 6), ("O", 3)]);
        assert_counts!("((CH2)2O)2", [("C", 4), ("H", 8), ("O", 2)]);
        assert_counts!("B(OH)4", [("B", 1), ("H", 4), ("O", 4)]);
        assert_counts!("Ca3(PO4)2", [("Ca", 3), ("O", 8), ("P", 2)]);
        assert_counts!("[Fe(CN)6]", [("C", 6), ("Fe", 1), ("N", 6)]);
        assert_counts!("{[(H)2]3}4", [("H", 24)]);
        assert_counts!("CH3(CH2)10CH3", [("C", 12), ("H", 26)]);
        // Groups without a multiplier count once
        assert_counts!("(OH)(OH)", [("H", 2), ("O", 2)]);
        // Empty groups are allowed, but contribute nothing
        assert_counts!("H2()O", [("H", 2), ("O", 1)]);
    }

    #[test]
    fn explicit_isotopes() {
        assert_counts!("13CH4", [("13C", 1), ("H", 4)]);
        assert_counts!("(13C)H4", [("13C", 1), ("H", 4)]);
        assert_counts!("C5(13C)H12", [("C", 5), ("13C", 1), ("H", 12)]);
        assert_counts!("2H2O", [("2H", 2), ("O", 1)]);
        assert_counts!("(2H)2(18O)", [("2H", 2), ("18O", 1)]);
        assert_counts!("(13C)2(13C)3", [("13C", 5)]);
        // Isotopes without natural abundances can be used explicitly
        assert_counts!("(99Tc)O4", [("O", 4), ("99Tc", 1)]);
    }

    #[test]
    fn abbreviations() {
        assert_counts!("Me2O", [("C", 2), ("H", 6), ("O", 1)]);
        assert_counts!("Et3N", [("C", 6), ("H", 15), ("N", 1)]);
        assert_counts!("(Me)3N", [("C", 3), ("H", 9), ("N", 1)]);
        assert_counts!("PhOH", [("C", 6), ("H", 6), ("O", 1)]);
        assert_counts!("(Ph)2(Me2)", [("C", 14), ("H", 16)]);
        assert_counts!("D2O", [("2H", 2), ("O", 1)]);
        assert_counts!("CD3OD", [("C", 1), ("2H", 4), ("O", 1)]);
        assert_counts!("BocNH2", [("C", 5), ("H", 11), ("N", 1), ("O", 2)]);
        // Without an abbreviation table, only elements are recognised
        assert_eq!(
            formula(&DB, None, "Me").unwrap_err().category(),
            ErrorCategory::UnknownSpecies
        );
    }

    #[test]
    fn charges() {
        assert_eq!(charge_of("C6H12O6"), None);
        assert_eq!(charge_of("C6H12O6(2+)"), Some(2));
        assert_eq!(charge_of("C6H12O6(+2)"), Some(2));
        assert_eq!(charge_of("C6H12O6(2-)"), Some(-2));
        assert_eq!(charge_of("C6H12O6[-2]"), Some(-2));
        assert_eq!(charge_of("C6H12O6(3)"), Some(3));
        assert_eq!(charge_of("[Fe(CN)6]{3-}"), Some(-3));
        assert_eq!(charge_of("(2+)C6H12O6"), Some(2));
        // A bare charge is a complete formula
        assert_eq!(charge_of("2+"), Some(2));
        assert_eq!(charge_of("1-"), Some(-1));
        // Nested charges are not multiplied, and the last charge wins
        assert_eq!(charge_of("(H(2+))3"), Some(2));
        assert_eq!(charge_of("H(1+)(2-)"), Some(-2));
        // Charges don't add to the composition
        assert_counts!("NH4(1+)", [("H", 4), ("N", 1)]);
        assert_eq!(parse("(2+)").unwrap().composition, Composition::default());
        assert_eq!(parse("(2+)").unwrap().charge, Some(Charge(2)));
    }

    #[test]
    fn malformed_formulae() {
        let error = parse("").unwrap_err();
        assert_eq!(error.category(), ErrorCategory::MalformedFormula);
        assert_eq!(error.kind(), &FormulaErrorKind::EmptyFormula);

        assert_formula_error!("C(H2O", MalformedFormula, "unclosed bracket", (1, 4));
        assert_formula_error!("C((H2O)2", MalformedFormula, "unclosed bracket", (1, 7));
        assert_formula_error!("C(H2O]", MalformedFormula, "mismatched brackets", (1, 5));
        assert_formula_error!("C6H12O6)", MalformedFormula, "unmatched bracket", (7, 1));
        assert_formula_error!("C6H12O6$", MalformedFormula, "input was valid up until this point", (7, 1));
        assert_formula_error!("C6 H12", MalformedFormula, "input was valid up until this point", (2, 1));
        assert_formula_error!("(H2O$)", MalformedFormula, "input was valid up until this point", (4, 1));
        assert_formula_error!("h2o", MalformedFormula, "input was valid up until this point", (0, 1));
        assert_formula_error!("C6H012", MalformedFormula, "expected non-zero", (3, 0));
        assert_formula_error!("(013C)", MalformedFormula, "expected non-zero", (1, 3));
        assert_formula_error!("H4294967296", MalformedFormula, "too large", (1, 10));
        assert_formula_error!("(H65536)65536", MalformedFormula, "too large", (0, 13));
    }

    #[test]
    fn unknown_species() {
        assert_formula_error!("Xx2O", UnknownSpecies, "unknown species", (0, 2));
        assert_formula_error!("C6H12O6Q", UnknownSpecies, "unknown species", (7, 1));
        assert_formula_error!("(Foo)2", UnknownSpecies, "unknown species", (1, 3));
        assert_formula_error!("(15Xx)", UnknownSpecies, "unknown species", (1, 4));
    }

    #[test]
    fn unknown_isotopes() {
        assert_formula_error!("(15C)H4", UnknownIsotope, "isotope not found", (1, 3));
        assert_formula_error!("H2(100Tc)O4", UnknownIsotope, "isotope not found", (3, 5));
        // Elements without natural abundances must be given as isotopes
        assert_formula_error!("TcO4", UnknownIsotope, "no natural abundance", (0, 2));
    }

    #[test]
    fn invalid_charges() {
        assert_formula_error!("C6H12O6(0)", InvalidCharge, "invalid charge", (8, 1));
        assert_formula_error!("C6H12O6(+2+)", InvalidCharge, "invalid charge", (8, 3));
        assert_formula_error!("C6H12O6(2+-)", InvalidCharge, "invalid charge", (8, 3));
        assert_formula_error!("2+H2O", InvalidCharge, "invalid charge", (0, 3));
        assert_formula_error!("NH4+", InvalidCharge, "invalid charge", (3, 1));
        assert_formula_error!("(2+)(H+)", InvalidCharge, "invalid charge", (6, 1));
    }
}
