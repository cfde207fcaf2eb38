//! [`Money`]-related definitions.

use std::{fmt, iter, ops, str::FromStr};

#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::{Decimal, RoundingStrategy};

/// Amount of money, kept in fixed-point with [`Money::SCALE`] fractional
/// digits (minor currency units).
///
/// Every arithmetic operation producing a [`Money`] rounds its result half
/// away from zero, so no floating-point drift can ever accumulate.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Money(Decimal);

impl Money {
    /// Number of fractional digits kept by [`Money`].
    pub const SCALE: u32 = 2;

    /// Zero amount of [`Money`].
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a new [`Money`] rounding the provided `amount` to
    /// [`Money::SCALE`] fractional digits.
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        let mut amount = amount.round_dp_with_strategy(
            Self::SCALE,
            RoundingStrategy::MidpointAwayFromZero,
        );
        amount.rescale(Self::SCALE);
        Self(amount)
    }

    /// Returns the underlying amount of this [`Money`].
    #[must_use]
    pub fn amount(self) -> Decimal {
        self.0
    }

    /// Adds the provided [`Money`] to this one, returning [`None`] on
    /// overflow.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self::new)
    }

    /// Multiplies this [`Money`] by the provided factor, returning [`None`]
    /// on overflow.
    #[must_use]
    pub fn checked_mul(self, rhs: Decimal) -> Option<Self> {
        self.0.checked_mul(rhs).map(Self::new)
    }

    /// Indicates whether this [`Money`] is below zero.
    #[must_use]
    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str(s).map_err(|_| "invalid amount")?;
        if amount.scale() > Self::SCALE {
            return Err("too many fractional digits");
        }
        Ok(Self::new(amount))
    }
}

impl ops::Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.0 + rhs.0)
    }
}

impl ops::Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.0 - rhs.0)
    }
}

impl ops::Mul<Decimal> for Money {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self::new(self.0 * rhs)
    }
}

impl iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, ops::Add::add)
    }
}

impl<'a> iter::Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use std::str::FromStr as _;

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Money in `{major}.{minor}` format, where:
    /// - `major` is an integer;
    /// - `minor` is an optional integer of at most 2 digits.
    #[graphql_scalar(with = Self, parse_token(String))]
    type Money = super::Money;

    impl Money {
        fn to_output<S: ScalarValue>(m: &Money) -> Value<S> {
            Value::scalar(m.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `Money` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!("Cannot parse `Money` input scalar: {e}")
                    })
                })
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use super::Money;

    fn decimal(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn from_str() {
        assert_eq!(
            Money::from_str("123.45").unwrap(),
            Money::new(decimal("123.45")),
        );
        assert_eq!(
            Money::from_str("123").unwrap(),
            Money::new(decimal("123.00")),
        );
        assert_eq!(
            Money::from_str("-0.5").unwrap(),
            Money::new(decimal("-0.5")),
        );

        assert!(Money::from_str("123.456").is_err());
        assert!(Money::from_str("12,3").is_err());
        assert!(Money::from_str("EUR").is_err());
        assert!(Money::from_str("").is_err());
    }

    #[test]
    fn to_string() {
        assert_eq!(Money::new(decimal("123.45")).to_string(), "123.45");
        assert_eq!(Money::new(decimal("123")).to_string(), "123.00");
        assert_eq!(Money::new(decimal("123.4")).to_string(), "123.40");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn checked_arithmetic() {
        let price = Money::new(decimal("0.33"));

        assert_eq!(
            price.checked_mul(decimal("1.5")),
            Some(Money::new(decimal("0.50"))),
        );
        assert_eq!(
            price.checked_add(price),
            Some(Money::new(decimal("0.66"))),
        );

        let huge = Money::new(Decimal::MAX / Decimal::TEN);
        assert_eq!(huge.checked_mul(Decimal::ONE_HUNDRED), None);
        assert_eq!(
            Money::new(Decimal::MAX).checked_add(Money::new(Decimal::MAX)),
            None,
        );
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(Money::new(decimal("0.005")), Money::new(decimal("0.01")));
        assert_eq!(Money::new(decimal("0.004")), Money::ZERO);
        assert_eq!(
            Money::new(decimal("-0.005")),
            Money::new(decimal("-0.01")),
        );
        assert_eq!(Money::new(decimal("2.675")).to_string(), "2.68");
    }

    #[test]
    fn arithmetic_stays_exact() {
        let cents = Money::new(decimal("0.10"));
        let sum = [cents, cents, cents].into_iter().sum::<Money>();

        assert_eq!(sum, Money::new(decimal("0.30")));
        assert_eq!(sum - cents, Money::new(decimal("0.20")));
        assert_eq!(cents * decimal("3.333"), Money::new(decimal("0.33")));
    }

    #[test]
    fn sign() {
        assert!(Money::new(decimal("-1")).is_negative());
        assert!(!Money::ZERO.is_negative());
        assert!(!Money::new(decimal("-0.001")).is_negative());
    }
}
