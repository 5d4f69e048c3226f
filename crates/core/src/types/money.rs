//! Money helpers.
//!
//! Prices come from the catalog as decimal amounts in the shop currency. Charges
//! are made in minor units (cents). Conversion rounds half away from zero, which
//! matches how card processors round a decimal total.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// The single currency the shop charges in (ISO 4217, lower-case as the payment
/// provider expects it).
pub const CURRENCY: &str = "usd";

/// Smallest charge the payment provider accepts, in minor units.
pub const MINIMUM_CHARGE: MinorUnits = MinorUnits(50);

/// An amount in the currency's minor unit (cents for USD).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinorUnits(i64);

impl MinorUnits {
    /// Wrap a raw minor-unit amount.
    #[must_use]
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Get the raw amount.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Convert a decimal amount to minor units, rounding half away from zero.
    ///
    /// Returns `None` if the amount does not fit in an `i64` of cents.
    #[must_use]
    pub fn from_decimal(amount: Decimal) -> Option<Self> {
        use rust_decimal::prelude::ToPrimitive;

        let cents = (amount * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        cents.to_i64().map(Self)
    }

    /// Convert back to a decimal amount with two decimal places.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Whether the amount meets the provider's minimum charge.
    #[must_use]
    pub const fn is_chargeable(self) -> bool {
        self.0 >= MINIMUM_CHARGE.0
    }
}

impl core::fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Round a decimal amount to currency precision (two places, half away from zero).
#[must_use]
pub fn round_to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format a decimal amount for display, e.g. `$19.99`.
#[must_use]
pub fn format_price(amount: Decimal) -> String {
    format!("${:.2}", round_to_cents(amount))
}
