use nom::{
    character::complete::{char, digit0, digit1, one_of, satisfy},
    combinator::{consumed, cut, map, not, opt, peek, recognize},
    multi::many0_count,
    sequence::{pair, preceded, terminated, tuple},
};

use crate::{Charge, Count, MassNumber};

use super::errors::{FormulaErrorKind, ParseError, ParseResult, expect, failure, map_res};

pub const OPENING_BRACKETS: [char; 3] = ['(', '[', '{'];
pub const CLOSING_BRACKETS: [char; 3] = [')', ']', '}'];

/// uppercase
///   = "A" | "B" | "C" | "D" | "E" | "F" | "G"
///   | "H" | "I" | "J" | "K" | "L" | "M" | "N"
///   | "O" | "P" | "Q" | "R" | "S" | "T" | "U"
///   | "V" | "W" | "X" | "Y" | "Z"
///   ;
pub fn uppercase(i: &str) -> ParseResult<char> {
    satisfy(|c| c.is_ascii_uppercase())(i)
}

/// lowercase
///   = "a" | "b" | "c" | "d" | "e" | "f" | "g"
///   | "h" | "i" | "j" | "k" | "l" | "m" | "n"
///   | "o" | "p" | "q" | "r" | "s" | "t" | "u"
///   | "v" | "w" | "x" | "y" | "z"
///   ;
pub fn lowercase(i: &str) -> ParseResult<char> {
    satisfy(|c| c.is_ascii_lowercase())(i)
}

/// Token = uppercase , { lowercase } ;
pub fn token(i: &str) -> ParseResult<&str> {
    recognize(pair(uppercase, many0_count(lowercase)))(i)
}

/// Count = digit - "0" , { digit } ;
pub fn count(i: &str) -> ParseResult<Count> {
    let not_zero = expect(cut(not(char('0'))), FormulaErrorKind::ExpectedNoLeadingZero);
    let digits = preceded(not_zero, digit1);
    map_res(digits, |d: &str| {
        d.parse()
            .ok()
            .and_then(Count::new)
            .ok_or(FormulaErrorKind::CountOverflow)
    })(i)
}

/// Mass Number = Count ;   (* only when immediately followed by an uppercase letter *)
pub fn mass_number(i: &str) -> ParseResult<MassNumber> {
    let digits = terminated(digit1, peek(uppercase));
    map_res(digits, |d: &str| {
        if d.starts_with('0') {
            return Err(FormulaErrorKind::ExpectedNoLeadingZero);
        }
        d.parse()
            .ok()
            .and_then(MassNumber::new)
            .ok_or(FormulaErrorKind::CountOverflow)
    })(i)
}

/// Sign = "+" | "-" ;
pub fn sign(i: &str) -> ParseResult<i64> {
    map(one_of("+-"), |c| if c == '-' { -1 } else { 1 })(i)
}

/// Charge = [ Sign ] , Digits , [ Sign ] ;
///
/// A charge must be the last thing in its bracket (or in the formula), and may only carry one sign. Unsigned charges
/// are positive.
pub fn charge(i: &str) -> ParseResult<Charge> {
    let (rest, (text, (leading, magnitude, trailing))) =
        consumed(tuple((opt(sign), digit0, opt(sign))))(i)?;
    if text.is_empty() {
        return Err(nom::Err::Error(ParseError::new(i, FormulaErrorKind::ExpectedCharge)));
    }

    let ends_group = rest.is_empty() || rest.starts_with(CLOSING_BRACKETS);
    let length = if ends_group {
        text.len()
    } else {
        text.len() + rest.chars().next().map_or(0, char::len_utf8)
    };

    let sign = match (leading, trailing) {
        (Some(sign), None) | (None, Some(sign)) => Some(sign),
        (None, None) => Some(1),
        (Some(_), Some(_)) => None,
    };
    let magnitude: Option<i64> = magnitude.parse().ok().filter(|&m| m != 0);

    match sign.zip(magnitude) {
        Some((sign, magnitude)) if ends_group => Ok((rest, Charge(sign * magnitude))),
        _ => failure(
            i,
            length,
            FormulaErrorKind::InvalidCharge(i[..length].to_owned()),
        ),
    }
}
