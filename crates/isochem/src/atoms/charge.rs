use std::fmt::{self, Display, Formatter};

use crate::Charge;

impl Charge {
    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Renders the charge the way it's written in a formula, e.g. `2+` or `1-`
    #[must_use]
    pub fn signed(self) -> impl Display {
        SignedCharge(self.0)
    }
}

impl Default for Charge {
    fn default() -> Self {
        Self(1)
    }
}

struct SignedCharge(i64);

impl Display for SignedCharge {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { '-' } else { '+' };
        write!(f, "{}{sign}", self.0.unsigned_abs())
    }
}
