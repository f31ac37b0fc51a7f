use std::ops::Mul;

use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::{Abundance, Mass};

impl Mass {
    #[must_use]
    pub fn to_f64(self) -> f64 {
        // SAFETY: Converting a `Decimal` to an `f64` can lose precision, but never fails
        self.0.to_f64().unwrap()
    }

    #[must_use]
    pub fn round_dp(self, dp: u32) -> Self {
        Self(self.0.round_dp(dp))
    }

    /// This mass rounded to `decimals` places, counted in units of `10^-decimals`
    // NOTE: `decimals` is capped at 10 by `Config::validate()`, so any realistic mass fits comfortably in an `i64`
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn ticks(self, decimals: u32) -> i64 {
        let mut rounded = self.0.round_dp(decimals);
        rounded.rescale(decimals);
        rounded.mantissa() as i64
    }
}

impl Mul<Abundance> for Mass {
    type Output = Mass;

    fn mul(self, rhs: Abundance) -> Self::Output {
        Mass(self.0 * rhs.0)
    }
}

impl Abundance {
    #[must_use]
    pub fn to_f64(self) -> f64 {
        // SAFETY: Converting a `Decimal` to an `f64` can lose precision, but never fails
        self.0.to_f64().unwrap()
    }

    pub(crate) fn is_zero(self) -> bool {
        self.0.is_zero()
    }
}

impl From<Mass> for f64 {
    fn from(mass: Mass) -> Self {
        mass.to_f64()
    }
}
