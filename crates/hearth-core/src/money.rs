//! # Money Module
//!
//! Integer-cent money for wallet balances, meal prices and transactions.
//!
//! ## Where Money Flows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Reservation.total_price ──► pay() ──► Transaction.amount              │
//! │                                  │                                      │
//! │                                  ├──► Wallet.balance   (debited)       │
//! │                                  └──► Wallet.total_spent (credited)    │
//! │                                                                         │
//! │  top_up() / refund() ──────────────► Wallet.balance   (credited)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use hearth_core::money::Money;
//!
//! let meal = Money::from_cents(1250); // 12.50
//! let two = meal * 2;
//! assert_eq!(two.cents(), 2500);
//! assert_eq!(two.to_string(), "$25.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

/// A monetary value in the smallest currency unit.
///
/// Newtype over `i64`, so stored JSON stays `{"amount": 1250}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Adds `other`, returning `None` on overflow.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Subtracts `other`, returning `None` if the result would go negative.
    ///
    /// Wallet debits go through this so a balance never drops below zero.
    ///
    /// ```rust
    /// use hearth_core::money::Money;
    ///
    /// let balance = Money::from_cents(1000);
    /// assert_eq!(balance.checked_debit(Money::from_cents(400)), Some(Money::from_cents(600)));
    /// assert_eq!(balance.checked_debit(Money::from_cents(1001)), None);
    /// ```
    pub fn checked_debit(&self, other: Money) -> Option<Money> {
        let remaining = self.0.checked_sub(other.0)?;
        if remaining < 0 {
            None
        } else {
            Some(Money(remaining))
        }
    }

    /// Formats with an explicit currency symbol.
    pub fn format_with(&self, symbol: &str) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}{}.{:02}", sign, symbol, self.major().abs(), self.minor())
    }
}

/// Display uses `$`; the UI localizes for real rendering.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_with("$"))
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by a portion count.
impl Mul<u32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: u32) -> Self {
        Money(self.0 * qty as i64)
    }
}
