use std::fmt;

use serde::{Deserialize, Serialize};

/// Non-negative quantity in the smallest unit of the funding asset.
///
/// Use this type for **all** amounts in the engine (goals, pledges, raised
/// totals) so that arithmetic never wraps: additions fail above
/// [`Amount::CEILING`], subtractions fail below zero.
///
/// The ceiling is `i64::MAX` because amounts are persisted in signed 64-bit
/// columns.
///
/// # Examples
///
/// ```rust
/// use engine::Amount;
///
/// let pledge = Amount::from_minor(400).unwrap();
/// let raised = pledge.checked_add(Amount::from_minor(700).unwrap()).unwrap();
/// assert_eq!(raised.minor(), 1100);
/// assert!(Amount::CEILING.checked_add(pledge).is_none());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Largest representable amount (the supply ceiling).
    pub const CEILING: Amount = Amount(i64::MAX as u64);

    /// Creates an amount from minor units (returns `None` above the ceiling).
    #[must_use]
    pub const fn from_minor(minor: u64) -> Option<Amount> {
        if minor > Self::CEILING.0 {
            None
        } else {
            Some(Amount(minor))
        }
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> u64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Checked addition (returns `None` above [`Amount::CEILING`]).
    #[must_use]
    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        match self.0.checked_add(rhs.0) {
            Some(total) if total <= Self::CEILING.0 => Some(Amount(total)),
            _ => None,
        }
    }

    /// Checked subtraction (returns `None` if `rhs` exceeds `self`).
    #[must_use]
    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    /// The storage representation (signed 64-bit column value).
    #[must_use]
    pub const fn stored(self) -> i64 {
        self.0 as i64
    }

    /// Reads an amount back from storage (returns `None` for negative values).
    #[must_use]
    pub const fn from_stored(value: i64) -> Option<Amount> {
        if value < 0 {
            None
        } else {
            Some(Amount(value as u64))
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_within_ceiling() {
        let a = Amount::from_minor(400).unwrap();
        let b = Amount::from_minor(700).unwrap();
        assert_eq!(a.checked_add(b), Amount::from_minor(1100));
    }

    #[test]
    fn add_over_ceiling_fails() {
        let one = Amount::from_minor(1).unwrap();
        assert!(Amount::CEILING.checked_add(one).is_none());
    }

    #[test]
    fn sub_below_zero_fails() {
        let a = Amount::from_minor(300).unwrap();
        let b = Amount::from_minor(301).unwrap();
        assert!(a.checked_sub(b).is_none());
        assert_eq!(b.checked_sub(a), Amount::from_minor(1));
    }

    #[test]
    fn from_minor_rejects_values_over_ceiling() {
        assert!(Amount::from_minor(u64::MAX).is_none());
        assert_eq!(Amount::from_minor(i64::MAX as u64), Some(Amount::CEILING));
    }

    #[test]
    fn stored_roundtrip() {
        let a = Amount::from_minor(1100).unwrap();
        assert_eq!(Amount::from_stored(a.stored()), Some(a));
        assert!(Amount::from_stored(-1).is_none());
    }
}
