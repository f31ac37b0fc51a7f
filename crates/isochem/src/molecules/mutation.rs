use std::cmp::Ordering;

use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::{Charge, Composition, Count, Molecule, MoleculeState, ParsedFormula, Result, Simulator};

/// Anything that can be added to or subtracted from a `Molecule`
pub trait Operand<'a> {
    /// # Errors
    ///
    /// If the operand is a formula that can't be parsed
    fn parsed(&self, simulator: &Simulator<'a>) -> Result<ParsedFormula<'a>>;
}

impl<'a> Operand<'a> for str {
    fn parsed(&self, simulator: &Simulator<'a>) -> Result<ParsedFormula<'a>> {
        simulator.parse(self)
    }
}

impl<'a> Operand<'a> for String {
    fn parsed(&self, simulator: &Simulator<'a>) -> Result<ParsedFormula<'a>> {
        self.as_str().parsed(simulator)
    }
}

// NOTE: Only the atoms of another molecule are taken, its charge is left behind
impl<'a> Operand<'a> for Molecule<'a> {
    fn parsed(&self, _simulator: &Simulator<'a>) -> Result<ParsedFormula<'a>> {
        Ok(self.composition().clone().into())
    }
}

#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum MutationError {
    #[error("can't remove {0} from a molecule that doesn't contain any")]
    MissingSpecies(String),

    #[error("can't remove {removed} {species} from a molecule that only contains {present}")]
    NegativeCount {
        species: String,
        present: u32,
        removed: u32,
    },

    #[error("can't multiply or divide a molecule by zero")]
    ZeroFactor,

    #[diagnostic(help("only molecules whose atom counts share a common factor can be divided"))]
    #[error("{count} {species} can't be divided evenly by {factor}")]
    NotDivisible {
        species: String,
        count: u32,
        factor: u32,
    },

    #[diagnostic(help("molecules can only be multiplied or divided by positive whole numbers, like 2 or 3"))]
    #[error("{0:?} is not a positive whole number")]
    NonIntegerFactor(String),

    #[error("an atom count in the resulting molecule would be too large to represent")]
    Overflow,

    #[error("the subtraction would leave a molecule without any atoms")]
    EmptyResult,
}

/// Reads a multiplication or division factor from user input
///
/// # Errors
///
/// If `text` isn't a whole number that fits in a `u32`
pub fn parse_factor(text: &str) -> Result<u32, MutationError> {
    text.trim()
        .parse()
        .map_err(|_| MutationError::NonIntegerFactor(text.to_owned()))
}

// NOTE: Every mutation builds a complete replacement state before touching `self`, so a failure at any step leaves
// the molecule exactly as it was
impl<'a> Molecule<'a> {
    /// Adds the atoms of `operand`, returning the new canonical formula. A charge in `operand` replaces this
    /// molecule's charge.
    ///
    /// # Errors
    ///
    /// If `operand` can't be parsed, or an atom count would overflow
    pub fn add<O: Operand<'a> + ?Sized>(&mut self, operand: &O) -> Result<String> {
        let ParsedFormula { composition, charge } = operand.parsed(&self.simulator)?;
        let mut sum = self.state.composition.clone();
        sum.checked_extend(&composition, Count::default())
            .ok_or(MutationError::Overflow)?;
        self.replace_state("add", sum, charge)
    }

    /// Removes the atoms of `operand`, returning the new canonical formula. Species whose count reaches zero are
    /// dropped. A charge in `operand` replaces this molecule's charge.
    ///
    /// # Errors
    ///
    /// If `operand` can't be parsed, contains a species this molecule lacks (or has too few of), or would remove
    /// every atom
    pub fn subtract<O: Operand<'a> + ?Sized>(&mut self, operand: &O) -> Result<String> {
        let ParsedFormula { composition, charge } = operand.parsed(&self.simulator)?;
        let difference = self.state.composition.checked_difference(&composition)?;
        self.replace_state("subtract", difference, charge)
    }

    /// Scales every atom count by `factor`, returning the new canonical formula
    ///
    /// # Errors
    ///
    /// If `factor` is zero, or an atom count would overflow
    pub fn multiply(&mut self, factor: u32) -> Result<String> {
        let factor = Count::new(factor).ok_or(MutationError::ZeroFactor)?;
        let product = self
            .state
            .composition
            .checked_scale(factor)
            .ok_or(MutationError::Overflow)?;
        self.replace_state("multiply", product, None)
    }

    /// Divides every atom count by `factor`, returning the new canonical formula
    ///
    /// # Errors
    ///
    /// If `factor` is zero, or doesn't evenly divide every atom count
    pub fn divide(&mut self, factor: u32) -> Result<String> {
        let factor = Count::new(factor).ok_or(MutationError::ZeroFactor)?;
        let quotient = self.state.composition.checked_quotient(factor)?;
        self.replace_state("divide", quotient, None)
    }

    fn replace_state(
        &mut self,
        operation: &str,
        composition: Composition<'a>,
        charge: Option<Charge>,
    ) -> Result<String> {
        let charge = charge.unwrap_or(self.state.charge);
        let formula = composition.to_string();
        let state = MoleculeState::new(&self.simulator.config, formula.clone(), composition, charge)?;

        debug!(operation, from = %self.state.composition, to = %formula, %charge, "mutated molecule");
        self.state = state;
        Ok(formula)
    }
}

impl<'a> Composition<'a> {
    fn checked_difference(&self, other: &Self) -> Result<Self, MutationError> {
        let mut difference = self.0.clone();
        for (element, &removed) in &other.0 {
            let species = || element.designator();
            let Some(&present) = difference.get(element) else {
                return Err(MutationError::MissingSpecies(species()));
            };

            match present.cmp(&removed) {
                Ordering::Less => {
                    return Err(MutationError::NegativeCount {
                        species: species(),
                        present: present.get(),
                        removed: removed.get(),
                    });
                }
                Ordering::Equal => {
                    difference.remove(element);
                }
                Ordering::Greater => {
                    // SAFETY: `present` is strictly greater than `removed`, so the difference is positive
                    difference.insert(*element, present.checked_sub(removed).unwrap());
                }
            }
        }

        if difference.is_empty() {
            return Err(MutationError::EmptyResult);
        }
        Ok(Self(difference))
    }

    fn checked_quotient(&self, factor: Count) -> Result<Self, MutationError> {
        self.0
            .iter()
            .map(|(&element, &count)| {
                let quotient = count.checked_div(factor).ok_or_else(|| MutationError::NotDivisible {
                    species: element.designator(),
                    count: count.get(),
                    factor: factor.get(),
                })?;
                Ok((element, quotient))
            })
            .collect::<Result<_, _>>()
            .map(Self)
    }
}
