//! [`Totals`] computation.

use common::{Money, Percent};
use rust_decimal::Decimal;

use super::{Invoice, Line, ValidationError};

/// Monetary amounts of an [`Invoice`] derived from its [`Line`]s and tax
/// rate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Totals {
    /// Sum of all the [`Line::total()`]s.
    pub subtotal: Money,

    /// Tax amount added on top of the [`Totals::subtotal`].
    pub tax: Money,

    /// Grand total, including the [`Totals::tax`].
    pub total: Money,
}

impl Totals {
    /// Computes [`Totals`] of the provided [`Line`]s taxed with the provided
    /// `tax_rate`.
    ///
    /// The `total` is `subtotal * (1 + tax_rate / 100)` rounded to the
    /// currency precision, and the `tax` is the difference between them, so
    /// `subtotal + tax == total` always holds exactly.
    ///
    /// # Errors
    ///
    /// With a [`ValidationError::TotalTooLarge`] if the `total` exceeds
    /// [`Invoice::MAX_AMOUNT`].
    pub fn compute(
        lines: &[Line],
        tax_rate: Percent,
    ) -> Result<Self, ValidationError> {
        let bounded =
            |m: Money| (m.amount() <= Invoice::MAX_AMOUNT).then_some(m);

        let subtotal = lines
            .iter()
            .try_fold(Money::ZERO, |sum, l| {
                sum.checked_add(l.unit_price.checked_mul(l.quantity.value())?)
            })
            .and_then(bounded)
            .ok_or(ValidationError::TotalTooLarge)?;
        let total = subtotal
            .checked_mul(Decimal::ONE + tax_rate.fraction())
            .and_then(bounded)
            .ok_or(ValidationError::TotalTooLarge)?;
        Ok(Self {
            subtotal,
            tax: total - subtotal,
            total,
        })
    }
}

#[cfg(test)]
mod spec {
    use common::{Money, Percent};

    use super::{super::line::Draft, Line, Totals, ValidationError};

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn lines(items: &[(&str, &str)]) -> Vec<Line> {
        items
            .iter()
            .enumerate()
            .map(|(i, (quantity, unit_price))| {
                Draft {
                    description: format!("Line {i}"),
                    quantity: quantity.parse().unwrap(),
                    unit_price: money(unit_price),
                }
                .validate(i)
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn computes_with_tax() {
        let totals = Totals::compute(
            &lines(&[("2", "150.00")]),
            "20".parse::<Percent>().unwrap(),
        )
        .unwrap();

        assert_eq!(totals.subtotal, money("300.00"));
        assert_eq!(totals.tax, money("60.00"));
        assert_eq!(totals.total, money("360.00"));
    }

    #[test]
    fn sums_rounded_line_totals() {
        let totals = Totals::compute(
            &lines(&[("1.5", "0.33"), ("3", "0.33"), ("1", "10")]),
            "5.5".parse::<Percent>().unwrap(),
        )
        .unwrap();

        // 0.50 + 0.99 + 10.00
        assert_eq!(totals.subtotal, money("11.49"));
        // 11.49 * 1.055 = 12.12195
        assert_eq!(totals.total, money("12.12"));
        assert_eq!(totals.tax, money("0.63"));
        assert_eq!(totals.subtotal + totals.tax, totals.total);
    }

    #[test]
    fn zero_tax_rate() {
        let totals = Totals::compute(
            &lines(&[("4", "12.25")]),
            "0".parse::<Percent>().unwrap(),
        )
        .unwrap();

        assert_eq!(totals.subtotal, totals.total);
        assert_eq!(totals.tax, Money::ZERO);
    }

    #[test]
    fn is_idempotent() {
        let lines = lines(&[("3", "33.33"), ("0.25", "199.99")]);
        let rate = "19.6".parse::<Percent>().unwrap();

        assert_eq!(
            Totals::compute(&lines, rate),
            Totals::compute(&lines, rate),
        );

        let recomputed = Totals::compute(
            &lines
                .iter()
                .cloned()
                .map(|l| Draft::from(l).validate(0).unwrap())
                .collect::<Vec<_>>(),
            rate,
        );
        assert_eq!(Totals::compute(&lines, rate), recomputed);
    }

    #[test]
    fn rejects_oversized_total() {
        let max = "999999999999.99";

        assert_eq!(
            Totals::compute(
                &lines(&[("1", max), ("1", "0.01")]),
                "0".parse::<Percent>().unwrap(),
            ),
            Err(ValidationError::TotalTooLarge),
        );
        assert_eq!(
            Totals::compute(
                &lines(&[("1", max)]),
                "20".parse::<Percent>().unwrap(),
            ),
            Err(ValidationError::TotalTooLarge),
        );

        let totals = Totals::compute(
            &lines(&[("1", max)]),
            "0".parse::<Percent>().unwrap(),
        )
        .unwrap();
        assert_eq!(totals.total, money(max));
    }

    #[test]
    fn empty_lines_total_zero() {
        let totals =
            Totals::compute(&[], "20".parse::<Percent>().unwrap()).unwrap();

        assert_eq!(totals.total, Money::ZERO);
    }
}
