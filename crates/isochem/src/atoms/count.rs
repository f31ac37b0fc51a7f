use std::{
    fmt::{self, Display, Formatter},
    num::NonZeroU32,
    ops::Mul,
};

use rust_decimal::Decimal;

use crate::{Count, Mass};

impl Count {
    #[must_use]
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    pub(crate) fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.get()).map(Self)
    }

    pub(crate) fn checked_mul(self, rhs: Self) -> Option<Self> {
        self.0.checked_mul(rhs.0).map(Self)
    }

    /// Returns `None` if the result would be zero or negative
    pub(crate) fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.get().checked_sub(rhs.get()).and_then(Self::new)
    }

    /// Returns `None` unless `rhs` divides this count exactly
    pub(crate) fn checked_div(self, rhs: Self) -> Option<Self> {
        (self.get() % rhs.get() == 0).then(|| Self::new(self.get() / rhs.get()))?
    }
}

impl From<Count> for u32 {
    fn from(count: Count) -> Self {
        count.get()
    }
}

impl Mul<Mass> for Count {
    type Output = Mass;

    fn mul(self, rhs: Mass) -> Self::Output {
        Mass(Decimal::from(self.get()) * rhs.0)
    }
}

impl Display for Count {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let count = self.get();
        if count > 1 {
            write!(f, "{count}")?;
        }
        Ok(())
    }
}

impl Default for Count {
    fn default() -> Self {
        Self(NonZeroU32::MIN)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn count(n: u32) -> Count {
        Count::new(n).unwrap()
    }

    #[test]
    fn checked_arithmetic() {
        assert_eq!(count(2).checked_add(count(3)), Some(count(5)));
        assert_eq!(count(u32::MAX).checked_add(count(1)), None);
        assert_eq!(count(4).checked_mul(count(3)), Some(count(12)));
        assert_eq!(count(u32::MAX).checked_mul(count(2)), None);
        assert_eq!(count(5).checked_sub(count(2)), Some(count(3)));
        assert_eq!(count(5).checked_sub(count(5)), None);
        assert_eq!(count(5).checked_sub(count(6)), None);
        assert_eq!(count(6).checked_div(count(3)), Some(count(2)));
        assert_eq!(count(7).checked_div(count(3)), None);
        assert_eq!(count(3).checked_div(count(6)), None);
    }

    #[test]
    fn count_display() {
        assert_eq!(Count::default().to_string(), "");
        assert_eq!(count(1).to_string(), "");
        assert_eq!(count(42).to_string(), "42");
    }

    #[test]
    fn count_times_mass() {
        assert_eq!(count(3) * Mass(dec!(1.007825)), Mass(dec!(3.023475)));
    }
}
