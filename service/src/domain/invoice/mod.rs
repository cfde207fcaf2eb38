//! [`Invoice`] definitions.

pub mod line;
pub mod number;
mod totals;

use common::{define_kind, unit, DateTime, DateTimeOf, Money, Percent};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{case, client, tenant};
#[cfg(doc)]
use crate::domain::Case;

pub use self::{
    line::Line,
    number::{Number, Sequence},
    totals::Totals,
};

/// Billing document issued by a tenant against one of its [`Case`]s.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Invoice {
    /// ID of this [`Invoice`].
    pub id: Id,

    /// ID of the tenant owning this [`Invoice`].
    pub tenant_id: tenant::Id,

    /// [`Number`] of this [`Invoice`].
    pub number: Number,

    /// ID of the [`Case`] this [`Invoice`] bills.
    pub case_id: case::Id,

    /// ID of the client this [`Invoice`] is addressed to, if any.
    pub client_id: Option<client::Id>,

    /// [`Line`]s of this [`Invoice`].
    ///
    /// Never empty.
    pub lines: Vec<Line>,

    /// Tax rate applied to the [`Invoice::subtotal`].
    pub tax_rate: Percent,

    /// Sum of all the [`Line::total()`]s.
    pub subtotal: Money,

    /// Tax amount of this [`Invoice`].
    pub tax: Money,

    /// Grand total of this [`Invoice`].
    pub total: Money,

    /// [`Status`] of this [`Invoice`].
    pub status: Status,

    /// [`DateTime`] when this [`Invoice`] was issued.
    pub issued_at: IssueDateTime,

    /// [`DateTime`] this [`Invoice`] should be paid by.
    pub due_at: DueDateTime,

    /// [`DateTime`] when this [`Invoice`] was paid.
    ///
    /// Present if and only if the [`Invoice::status`] is [`Status::Paid`].
    pub paid_at: Option<PaymentDateTime>,

    /// [`Notes`] of this [`Invoice`].
    pub notes: Option<Notes>,

    /// Indicator whether this [`Invoice`] is archived.
    pub archived: bool,

    /// [`DateTime`] when this [`Invoice`] was last modified.
    pub updated_at: ModificationDateTime,
}

impl Invoice {
    /// Default tax rate of an [`Invoice`], in percents.
    pub const DEFAULT_TAX_RATE: Decimal =
        Decimal::from_parts(20, 0, 0, false, 0);

    /// Maximum monetary amount an [`Invoice`] may carry, being
    /// `999999999999.99`.
    pub const MAX_AMOUNT: Decimal =
        Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

    /// Maximum number of [`Line`]s in an [`Invoice`].
    pub const MAX_LINES: usize = 500;

    /// Returns the default tax rate of an [`Invoice`].
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn default_tax_rate() -> Percent {
        Percent::new(Self::DEFAULT_TAX_RATE).expect("within `[0, 100]`")
    }

    /// Replaces [`Line`]s and the tax rate of this [`Invoice`], recomputing
    /// its [`Totals`].
    ///
    /// # Errors
    ///
    /// With a [`ValidationError::TotalTooLarge`] if the recomputed
    /// [`Totals`] are out of bounds, leaving this [`Invoice`] untouched.
    pub fn set_billing(
        &mut self,
        lines: Vec<Line>,
        tax_rate: Percent,
    ) -> Result<(), ValidationError> {
        let Totals {
            subtotal,
            tax,
            total,
        } = Totals::compute(&lines, tax_rate)?;

        self.lines = lines;
        self.tax_rate = tax_rate;
        self.subtotal = subtotal;
        self.tax = tax;
        self.total = total;
        Ok(())
    }

    /// Sets the [`Status`] of this [`Invoice`], maintaining the
    /// [`Invoice::paid_at`] accordingly.
    ///
    /// Any [`Status`] may follow any other one.
    pub fn set_status(&mut self, status: Status, now: DateTime) {
        if status == Status::Paid {
            if self.paid_at.is_none() {
                self.paid_at = Some(now.coerce());
            }
        } else {
            self.paid_at = None;
        }
        self.status = status;
    }

    /// Returns [`Totals`] of this [`Invoice`].
    #[must_use]
    pub fn totals(&self) -> Totals {
        Totals {
            subtotal: self.subtotal,
            tax: self.tax,
            total: self.total,
        }
    }
}

/// ID of an [`Invoice`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Free-text notes of an [`Invoice`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Notes(String);

impl Notes {
    /// Maximum number of characters in [`Notes`].
    pub const MAX_LEN: usize = 2000;

    /// Creates new [`Notes`] if the provided `text` isn't too long.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        (text.chars().count() <= Self::MAX_LEN).then_some(Self(text))
    }
}

define_kind! {
    #[doc = "Status of an [`Invoice`]."]
    enum Status {
        #[doc = "[`Invoice`] is being prepared."]
        Draft = 1,

        #[doc = "[`Invoice`] is sent to the client."]
        Sent = 2,

        #[doc = "[`Invoice`] is paid."]
        Paid = 3,

        #[doc = "[`Invoice`] is not paid in time."]
        Overdue = 4,
    }
}

/// Error of validating [`Invoice`] data.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum ValidationError {
    /// [`Invoice`] has no [`Line`]s.
    #[display("`Invoice` must have at least one line")]
    NoLines,

    /// [`Invoice`] has more than [`Invoice::MAX_LINES`] [`Line`]s.
    #[display("`Invoice` must have at most {} lines", Invoice::MAX_LINES)]
    TooManyLines,

    /// [`Line`] at the position has an empty or too long description.
    #[display(
        "Line #{_0} must have a non-empty description of at most {} \
         characters",
        line::Description::MAX_LEN,
    )]
    InvalidDescription(#[error(not(source))] usize),

    /// [`Line`] at the position has a quantity not above zero.
    #[display("Line #{_0} must have a positive quantity")]
    NonPositiveQuantity(#[error(not(source))] usize),

    /// [`Line`] at the position has a negative unit price.
    #[display("Line #{_0} must not have a negative unit price")]
    NegativeUnitPrice(#[error(not(source))] usize),

    /// [`Line`] at the position has its unit price or total above
    /// [`Invoice::MAX_AMOUNT`].
    #[display("Line #{_0} amount must not exceed {}", Invoice::MAX_AMOUNT)]
    AmountTooLarge(#[error(not(source))] usize),

    /// [`Totals`] of an [`Invoice`] exceed [`Invoice::MAX_AMOUNT`].
    #[display("`Invoice` total must not exceed {}", Invoice::MAX_AMOUNT)]
    TotalTooLarge,

    /// Tax rate is out of the `[0, 100]` range.
    #[display("Tax rate {_0} is out of the [0, 100] range")]
    TaxRateOutOfRange(#[error(not(source))] Decimal),

    /// Tax rate has more than 2 fractional digits.
    #[display("Tax rate {_0} must have at most 2 fractional digits")]
    TaxRateTooPrecise(#[error(not(source))] Decimal),

    /// [`Notes`] are too long.
    #[display("Notes must be at most {} characters long", Notes::MAX_LEN)]
    NotesTooLong,
}

/// Validates the provided [`line::Draft`]s as [`Line`]s of an [`Invoice`].
///
/// # Errors
///
/// With a [`ValidationError`] if there are no [`Line`]s, too many of them,
/// or any of them is invalid.
pub fn validate_lines(
    drafts: impl IntoIterator<Item = line::Draft>,
) -> Result<Vec<Line>, ValidationError> {
    let lines = drafts
        .into_iter()
        .enumerate()
        .map(|(pos, draft)| draft.validate(pos))
        .collect::<Result<Vec<_>, _>>()?;
    if lines.is_empty() {
        return Err(ValidationError::NoLines);
    }
    if lines.len() > Invoice::MAX_LINES {
        return Err(ValidationError::TooManyLines);
    }
    Ok(lines)
}

/// Validates the provided tax rate of an [`Invoice`].
///
/// # Errors
///
/// With a [`ValidationError::TaxRateOutOfRange`] if the rate isn't in the
/// `[0, 100]` range, or with a [`ValidationError::TaxRateTooPrecise`] if it
/// has more than 2 significant fractional digits.
pub fn validate_tax_rate(rate: Decimal) -> Result<Percent, ValidationError> {
    let percent =
        Percent::new(rate).ok_or(ValidationError::TaxRateOutOfRange(rate))?;
    if rate.normalize().scale() > 2 {
        return Err(ValidationError::TaxRateTooPrecise(rate));
    }
    Ok(percent)
}

/// Validates the provided [`Notes`] of an [`Invoice`].
///
/// # Errors
///
/// With a [`ValidationError::NotesTooLong`] if the `text` is too long.
pub fn validate_notes(text: String) -> Result<Notes, ValidationError> {
    Notes::new(text).ok_or(ValidationError::NotesTooLong)
}

/// [`DateTime`] when an [`Invoice`] was issued.
pub type IssueDateTime = DateTimeOf<(Invoice, unit::Creation)>;

/// [`DateTime`] an [`Invoice`] should be paid by.
pub type DueDateTime = DateTimeOf<(Invoice, unit::Deadline)>;

/// [`DateTime`] when an [`Invoice`] was paid.
pub type PaymentDateTime = DateTimeOf<(Invoice, unit::Settlement)>;

/// [`DateTime`] when an [`Invoice`] was last modified.
pub type ModificationDateTime = DateTimeOf<(Invoice, unit::Modification)>;
