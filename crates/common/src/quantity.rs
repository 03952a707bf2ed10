//! Quantity value type.

use serde::{Deserialize, Serialize};

/// A stock quantity, counted in whole units.
///
/// Quantities are signed so the same type can express deltas (a shipment is
/// a negative delta) as well as absolute levels, which must themselves stay
/// non-negative unless a location allows negative stock.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quantity(i64);

impl Quantity {
    /// Creates a quantity from a raw unit count.
    pub fn new(units: i64) -> Self {
        Self(units)
    }

    /// Returns zero units.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the raw unit count.
    pub fn units(&self) -> i64 {
        self.0
    }

    /// Returns the magnitude of the quantity.
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Returns the negated quantity.
    pub fn negated(&self) -> Self {
        Self(-self.0)
    }

    /// Returns true if the quantity is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Returns true if the quantity is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns true if the quantity is negative.
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Quantity {
    fn from(units: i64) -> Self {
        Self(units)
    }
}

impl From<Quantity> for i64 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl std::ops::Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Self) -> Self::Output {
        Quantity(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Self) -> Self::Output {
        Quantity(self.0 - rhs.0)
    }
}

impl std::ops::Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Self::Output {
        Quantity(-self.0)
    }
}

impl std::ops::AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::ops::SubAssign for Quantity {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}
