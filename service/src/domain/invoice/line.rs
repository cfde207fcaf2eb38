//! [`Line`] definitions.

use common::Money;
use derive_more::{AsRef, Display};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;

use super::{Invoice, ValidationError};

/// Billable entry of an [`Invoice`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Line {
    /// [`Description`] of this [`Line`].
    pub description: Description,

    /// [`Quantity`] billed by this [`Line`].
    pub quantity: Quantity,

    /// Price of a single unit billed by this [`Line`].
    ///
    /// Never negative.
    pub unit_price: Money,
}

impl Line {
    /// Returns the total amount of this [`Line`], rounded to the currency
    /// precision.
    ///
    /// Never exceeds [`Invoice::MAX_AMOUNT`] for a [`Line`] produced by
    /// [`Draft::validate()`].
    #[must_use]
    pub fn total(&self) -> Money {
        self.unit_price * self.quantity.value()
    }
}

/// Unvalidated [`Line`] as provided by a caller.
#[derive(Clone, Debug)]
pub struct Draft {
    /// Description of the billed work.
    pub description: String,

    /// Billed quantity.
    pub quantity: Decimal,

    /// Price of a single unit.
    pub unit_price: Money,
}

impl Draft {
    /// Validates this [`Draft`] placed at the provided `position` of an
    /// [`Invoice`].
    ///
    /// # Errors
    ///
    /// With a [`ValidationError`] if any of the fields is invalid.
    pub fn validate(self, position: usize) -> Result<Line, ValidationError> {
        use ValidationError as E;

        let description = Description::new(self.description)
            .ok_or(E::InvalidDescription(position))?;
        let quantity = Quantity::new(self.quantity)
            .ok_or(E::NonPositiveQuantity(position))?;
        if self.unit_price.is_negative() {
            return Err(E::NegativeUnitPrice(position));
        }
        let within_bounds = self
            .unit_price
            .checked_mul(quantity.value())
            .is_some_and(|total| total.amount() <= Invoice::MAX_AMOUNT);
        if self.unit_price.amount() > Invoice::MAX_AMOUNT || !within_bounds {
            return Err(E::AmountTooLarge(position));
        }

        Ok(Line {
            description,
            quantity,
            unit_price: self.unit_price,
        })
    }
}

impl From<Line> for Draft {
    fn from(line: Line) -> Self {
        Self {
            description: line.description.into_inner(),
            quantity: line.quantity.value(),
            unit_price: line.unit_price,
        }
    }
}

/// Description of a [`Line`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Description(String);

impl Description {
    /// Maximum number of characters in a [`Description`].
    pub const MAX_LEN: usize = 512;

    /// Creates a new [`Description`] out of the provided trimmed `text`, if
    /// it's neither empty nor too long.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        let trimmed = text.trim();
        (!trimmed.is_empty() && trimmed.chars().count() <= Self::MAX_LEN)
            .then(|| Self(trimmed.to_owned()))
    }

    /// Returns the underlying [`String`] of this [`Description`].
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Strictly positive quantity billed by a [`Line`].
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Quantity(Decimal);

impl Quantity {
    /// Creates a new [`Quantity`] if the provided `value` is above zero.
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        (value > Decimal::ZERO).then_some(Self(value))
    }

    /// Returns the underlying value of this [`Quantity`].
    #[must_use]
    pub fn value(self) -> Decimal {
        self.0
    }
}

#[cfg(test)]
mod spec {
    use common::Money;
    use rust_decimal::Decimal;

    use super::{Description, Draft, Invoice, ValidationError};

    fn draft(description: &str, quantity: &str, unit_price: &str) -> Draft {
        Draft {
            description: description.into(),
            quantity: quantity.parse().unwrap(),
            unit_price: unit_price.parse().unwrap(),
        }
    }

    #[test]
    fn validates_draft() {
        let line = draft("  Consult ", "2", "150.00").validate(0).unwrap();

        assert_eq!(AsRef::<str>::as_ref(&line.description), "Consult");
        assert_eq!(line.total(), "300.00".parse::<Money>().unwrap());
    }

    #[test]
    fn free_lines_are_allowed() {
        let line = draft("Courtesy call", "1", "0").validate(0).unwrap();

        assert_eq!(line.total(), Money::ZERO);
    }

    #[test]
    fn rejects_invalid_draft() {
        assert_eq!(
            draft(" \t", "1", "1").validate(3).unwrap_err(),
            ValidationError::InvalidDescription(3),
        );
        assert_eq!(
            draft("Consult", "0", "1").validate(1).unwrap_err(),
            ValidationError::NonPositiveQuantity(1),
        );
        assert_eq!(
            draft("Consult", "-1.5", "1").validate(0).unwrap_err(),
            ValidationError::NonPositiveQuantity(0),
        );
        assert_eq!(
            draft("Consult", "1", "-0.01").validate(2).unwrap_err(),
            ValidationError::NegativeUnitPrice(2),
        );
    }

    #[test]
    fn rejects_oversized_amounts() {
        let huge = "100000000000000000000";
        assert_eq!(
            draft("Retainer", huge, huge).validate(0).unwrap_err(),
            ValidationError::AmountTooLarge(0),
        );
        assert_eq!(
            draft("Retainer", "1", "1000000000000").validate(1).unwrap_err(),
            ValidationError::AmountTooLarge(1),
        );
        assert_eq!(
            draft("Retainer", "2", "500000000000").validate(2).unwrap_err(),
            ValidationError::AmountTooLarge(2),
        );

        let line = draft("Retainer", "1", "999999999999.99")
            .validate(0)
            .unwrap();
        assert_eq!(line.total().amount(), Invoice::MAX_AMOUNT);
    }

    #[test]
    fn description_is_bounded() {
        let long = "x".repeat(Description::MAX_LEN);

        assert!(Description::new(long.clone()).is_some());
        assert!(Description::new(format!("{long}x")).is_none());
    }

    #[test]
    fn rounds_line_total() {
        let line = Draft {
            description: "Copies".into(),
            quantity: Decimal::new(3, 0),
            unit_price: "0.33".parse().unwrap(),
        }
        .validate(0)
        .unwrap();

        assert_eq!(line.total(), "0.99".parse::<Money>().unwrap());

        let line = draft("Hours", "1.5", "0.33").validate(0).unwrap();

        assert_eq!(line.total(), "0.50".parse::<Money>().unwrap());
    }
}
