use std::num::NonZeroU32;

use crate::{Count, MassNumber};

impl MassNumber {
    #[must_use]
    pub fn new(mass_number: u32) -> Option<Self> {
        NonZeroU32::new(mass_number).map(Self)
    }
}

impl From<Count> for MassNumber {
    fn from(count: Count) -> Self {
        Self(count.0)
    }
}
