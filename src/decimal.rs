//! Fixed-scale peso amount used for penalties and the net balance.
//!
//! Fares and change are whole pesos, but missed-stop penalties accrue per
//! second of tick time, so the penalty side of the ledger needs fractions.
//! Uses `rust_decimal` internally with scale enforcement so accrual over many
//! short ticks does not drift the way `f64` sums do.

use rust_decimal::Decimal;
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// A peso amount with exactly 4 decimal places of precision.
///
/// Arithmetic saturates at the representable range instead of panicking.
///
/// # Examples
///
/// ```
/// use jeepney_fares::Pesos;
///
/// let rate = Pesos::from_whole(50);
/// assert_eq!(rate.per_second(0.5).to_string(), "25.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Pesos(Decimal);

impl Pesos {
    /// The number of decimal places to maintain.
    pub const SCALE: u32 = 4;

    /// Zero value.
    pub const ZERO: Self = Pesos(Decimal::ZERO);

    /// Largest representable amount.
    pub const MAX: Self = Pesos(Decimal::MAX);

    /// Smallest representable amount.
    pub const MIN: Self = Pesos(Decimal::MIN);

    /// Creates a new `Pesos` from a `Decimal`, normalizing to 4 decimal places.
    pub fn new(value: Decimal) -> Self {
        let mut normalized = value;
        normalized.rescale(Self::SCALE);
        Pesos(normalized)
    }

    /// Whole peso amount.
    pub fn from_whole(value: i64) -> Self {
        Pesos::new(Decimal::from(value))
    }

    /// Treats `self` as a per-second rate and returns the amount accrued over
    /// `seconds`. Non-finite or negative durations accrue nothing; durations
    /// too long to represent saturate.
    pub fn per_second(self, seconds: f64) -> Self {
        if !seconds.is_finite() || seconds <= 0.0 || self.is_zero() {
            return Pesos::ZERO;
        }
        match Decimal::from_f64_retain(seconds) {
            Some(secs) => Pesos::new(self.0.saturating_mul(secs)),
            None if self.0.is_sign_negative() => Pesos::MIN,
            None => Pesos::MAX,
        }
    }

    /// Returns `true` if this value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Pesos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Pesos {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Pesos::new(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Pesos {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Pesos {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Pesos::new(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Pesos {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}
