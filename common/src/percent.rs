//! [`Percent`]-related definitions.

use std::str::FromStr;

use derive_more::Display;
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;

use crate::Money;

/// Percentage in the `[0, 100]` range.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Percent(Decimal);

impl Percent {
    /// Creates a new [`Percent`] by checking the provided value is in the
    /// `[0, 100]` range.
    #[must_use]
    pub fn new(val: Decimal) -> Option<Self> {
        (Decimal::ZERO..=Decimal::ONE_HUNDRED)
            .contains(&val)
            .then_some(Self(val))
    }

    /// Returns the underlying value of this [`Percent`].
    #[must_use]
    pub fn value(self) -> Decimal {
        self.0
    }

    /// Returns this [`Percent`] as a fraction of `1`.
    #[must_use]
    pub fn fraction(self) -> Decimal {
        self.0 / Decimal::ONE_HUNDRED
    }

    /// Calculates this [`Percent`] of the provided [`Money`] amount.
    #[must_use]
    pub fn of(self, amount: Money) -> Money {
        amount * self.fraction()
    }
}

impl FromStr for Percent {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s)
            .ok()
            .and_then(Self::new)
            .ok_or("invalid percent value")
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use std::str::FromStr as _;

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Decimal percentage in the `[0, 100]` range.
    #[graphql_scalar(with = Self, parse_token(String))]
    type Percent = super::Percent;

    impl Percent {
        fn to_output<S: ScalarValue>(m: &Percent) -> Value<S> {
            Value::scalar(m.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `Percent` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!("Cannot parse `Percent` input scalar: {e}")
                    })
                })
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use crate::Money;

    use super::Percent;

    fn decimal(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn bounds() {
        assert!(Percent::new(decimal("0")).is_some());
        assert!(Percent::new(decimal("100")).is_some());
        assert!(Percent::new(decimal("5.5")).is_some());

        assert!(Percent::new(decimal("-0.01")).is_none());
        assert!(Percent::new(decimal("100.01")).is_none());

        assert!(Percent::from_str("20").is_ok());
        assert!(Percent::from_str("101").is_err());
        assert!(Percent::from_str("twenty").is_err());
    }

    #[test]
    fn of_money() {
        let rate = Percent::from_str("20").unwrap();

        assert_eq!(
            rate.of(Money::new(decimal("300"))),
            Money::new(decimal("60")),
        );
        assert_eq!(
            Percent::from_str("5.5").unwrap().of(Money::new(decimal("0.99"))),
            Money::new(decimal("0.05")),
        );
        assert_eq!(
            Percent::from_str("0").unwrap().of(Money::new(decimal("10"))),
            Money::ZERO,
        );
    }
}
