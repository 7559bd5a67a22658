//! Dual-currency amounts. Every price and total is carried in EUR and SYP side by side.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Reported when a price, line total or conversion leaves the representable range
pub const AMOUNT_OUT_OF_RANGE: &str = "المبلغ يتجاوز الحد المسموح";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Money {
    pub eur: Decimal,
    pub syp: Decimal,
}

impl Money {
    #[must_use]
    pub const fn new(eur: Decimal, syp: Decimal) -> Self {
        Self { eur, syp }
    }

    /// Line total for `quantity` units, `None` when either side leaves the `Decimal` range
    #[must_use]
    pub fn times(self, quantity: i32) -> Option<Self> {
        let quantity = Decimal::from(quantity);
        Some(Self {
            eur: self.eur.checked_mul(quantity)?,
            syp: self.syp.checked_mul(quantity)?,
        })
    }

    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        Some(Self {
            eur: self.eur.checked_add(rhs.eur)?,
            syp: self.syp.checked_add(rhs.syp)?,
        })
    }

    /// SYP per EUR implied by the two prices, when the EUR side is non-zero
    #[must_use]
    pub fn implied_rate(&self) -> Option<Decimal> {
        if self.eur.is_zero() {
            return None;
        }
        self.syp.checked_div(self.eur).map(|rate| rate.round_dp(2))
    }
}

// Report totals saturate; stored amounts are already range checked on write.
impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            eur: self.eur.saturating_add(rhs.eur),
            syp: self.syp.saturating_add(rhs.syp),
        }
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Round to the nearest multiple of `step`, halves away from zero. A non-positive step
/// leaves the value at two decimals. `None` when the result does not fit a `Decimal`.
#[must_use]
pub fn round_to_step(value: Decimal, step: Decimal) -> Option<Decimal> {
    if step <= Decimal::ZERO {
        return Some(value.round_dp(2));
    }
    value
        .checked_div(step)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .checked_mul(step)
}

/// SYP price for `eur` at `rate`, rounded to `step`
#[must_use]
pub fn convert_to_syp(eur: Decimal, rate: Decimal, step: Decimal) -> Option<Decimal> {
    round_to_step(eur.checked_mul(rate)?, step)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total_and_sum() {
        let unit = Money::new(Decimal::new(125, 2), Decimal::from(1500));
        let lines = [unit.times(4).unwrap(), unit.times(2).unwrap()];
        let total: Money = lines.into_iter().sum();
        assert_eq!(total.eur, Decimal::new(750, 2));
        assert_eq!(total.syp, Decimal::from(9000));
    }

    #[test]
    fn test_round_to_step() {
        assert_eq!(round_to_step(Decimal::from(14_949), Decimal::from(100)), Some(Decimal::from(14_900)));
        assert_eq!(round_to_step(Decimal::from(14_950), Decimal::from(100)), Some(Decimal::from(15_000)));
        assert_eq!(round_to_step(Decimal::new(12_345, 1), Decimal::from(50)), Some(Decimal::from(1_250)));
        assert_eq!(round_to_step(Decimal::new(1_006, 3), Decimal::ZERO), Some(Decimal::new(101, 2)));
    }

    #[test]
    fn test_overflow_is_reported() {
        let unit = Money::new(Decimal::MAX, Decimal::ONE);
        assert_eq!(unit.times(2), None);
        assert_eq!(Money::new(Decimal::MAX, Decimal::ZERO).checked_add(Money::new(Decimal::ONE, Decimal::ZERO)), None);
        assert_eq!(convert_to_syp(Decimal::from(10), Decimal::MAX, Decimal::from(100)), None);
        assert_eq!(Money::new(Decimal::new(1, 28), Decimal::MAX).implied_rate(), None);
    }

    #[test]
    fn test_report_totals_saturate() {
        let total: Money = [Money::new(Decimal::MAX, Decimal::ONE), Money::new(Decimal::ONE, Decimal::ONE)]
            .into_iter()
            .sum();
        assert_eq!(total.eur, Decimal::MAX);
        assert_eq!(total.syp, Decimal::from(2));
    }

    #[test]
    fn test_implied_rate() {
        assert_eq!(Money::new(Decimal::ZERO, Decimal::from(100)).implied_rate(), None);
        assert_eq!(
            Money::new(Decimal::from(2), Decimal::from(30_000)).implied_rate(),
            Some(Decimal::from(15_000))
        );
    }
}
