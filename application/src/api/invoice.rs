//! [`Invoice`]-related definitions.

use common::{DateTime, Money, Percent};
use derive_more::{AsRef, Display, From, Into};
use juniper::{
    graphql_object, GraphQLEnum, GraphQLInputObject, GraphQLScalar, Nullable,
};
use service::{
    command::update_invoice,
    domain::{self, invoice::line},
    query::quota,
    read,
};
use uuid::Uuid;

use crate::{api::scalar, Context};

/// Saturating conversion of a count into a GraphQL `Int`.
fn int(count: u32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

/// An invoice billing a case of the current cabinet.
#[derive(Clone, Debug, From)]
pub struct Invoice(domain::Invoice);

/// An invoice billing a case of the current cabinet.
#[graphql_object(context = Context)]
impl Invoice {
    /// Unique identifier of this `Invoice`.
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// Sequential public number of this `Invoice`, unique per cabinet.
    pub fn number(&self) -> Number {
        self.0.number.into()
    }

    /// ID of the case this `Invoice` bills.
    pub fn case_id(&self) -> CaseId {
        self.0.case_id.into()
    }

    /// ID of the client this `Invoice` is addressed to.
    pub fn client_id(&self) -> Option<ClientId> {
        self.0.client_id.map(Into::into)
    }

    /// Billed lines of this `Invoice`, in their order.
    pub fn lines(&self) -> Vec<Line> {
        self.0.lines.iter().cloned().map(Line).collect()
    }

    /// Tax rate of this `Invoice`, in percents.
    pub fn tax_rate(&self) -> Percent {
        self.0.tax_rate
    }

    /// Sum of all the line totals of this `Invoice`.
    pub fn subtotal(&self) -> Money {
        self.0.subtotal
    }

    /// Tax amount of this `Invoice`.
    pub fn tax(&self) -> Money {
        self.0.tax
    }

    /// Grand total of this `Invoice`, including the tax.
    pub fn total(&self) -> Money {
        self.0.total
    }

    /// Status of this `Invoice`.
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// `DateTime` when this `Invoice` was issued.
    pub fn issued_at(&self) -> DateTime {
        self.0.issued_at.coerce()
    }

    /// `DateTime` this `Invoice` should be paid by.
    pub fn due_at(&self) -> DateTime {
        self.0.due_at.coerce()
    }

    /// `DateTime` when this `Invoice` was paid.
    ///
    /// Present only if the `Invoice` is `PAID`.
    pub fn paid_at(&self) -> Option<DateTime> {
        self.0.paid_at.map(|at| at.coerce())
    }

    /// Free-text notes of this `Invoice`.
    pub fn notes(&self) -> Option<&str> {
        self.0.notes.as_ref().map(AsRef::<str>::as_ref)
    }

    /// Indicator whether this `Invoice` is archived.
    pub fn archived(&self) -> bool {
        self.0.archived
    }

    /// `DateTime` when this `Invoice` was last modified.
    pub fn updated_at(&self) -> DateTime {
        self.0.updated_at.coerce()
    }
}

/// A billed line of an `Invoice`.
#[derive(Clone, Debug)]
pub struct Line(line::Line);

/// A billed line of an `Invoice`.
#[graphql_object(name = "InvoiceLine", context = Context)]
impl Line {
    /// Description of the billed work.
    pub fn description(&self) -> &str {
        AsRef::<str>::as_ref(&self.0.description)
    }

    /// Billed quantity.
    pub fn quantity(&self) -> Decimal {
        self.0.quantity.value().into()
    }

    /// Price of a single unit.
    pub fn unit_price(&self) -> Money {
        self.0.unit_price
    }

    /// Total amount of this line.
    pub fn total(&self) -> Money {
        self.0.total()
    }
}

/// A line of an `Invoice` to bill.
#[derive(Clone, Debug, GraphQLInputObject)]
#[graphql(name = "InvoiceLineInput")]
pub struct LineInput {
    /// Description of the billed work.
    pub description: String,

    /// Billed quantity, above zero.
    pub quantity: Decimal,

    /// Price of a single unit, not negative.
    pub unit_price: Money,
}

impl From<LineInput> for line::Draft {
    fn from(input: LineInput) -> Self {
        let LineInput {
            description,
            quantity,
            unit_price,
        } = input;
        Self {
            description,
            quantity: quantity.into(),
            unit_price,
        }
    }
}

/// Changes of an `Invoice`.
///
/// Omitted fields are left untouched.
#[derive(Debug, GraphQLInputObject)]
#[graphql(name = "InvoicePatch")]
pub struct Patch {
    /// New lines, recomputing the totals.
    pub lines: Option<Vec<LineInput>>,

    /// New tax rate in percents, recomputing the totals.
    pub tax_rate: Option<Decimal>,

    /// New due `DateTime`.
    pub due_at: Option<DateTime>,

    /// New status.
    pub status: Option<Status>,

    /// New notes, or `null` to remove them.
    pub notes: Nullable<String>,

    /// New client, or `null` to remove it.
    pub client_id: Nullable<ClientId>,

    /// Current number. Cannot be changed.
    pub number: Option<Number>,

    /// Current case. Cannot be changed.
    pub case_id: Option<CaseId>,

    /// Current issue `DateTime`. Cannot be changed.
    pub issued_at: Option<DateTime>,
}

impl From<Patch> for update_invoice::Patch {
    fn from(patch: Patch) -> Self {
        let Patch {
            lines,
            tax_rate,
            due_at,
            status,
            notes,
            client_id,
            number,
            case_id,
            issued_at,
        } = patch;
        Self {
            lines: lines.map(|l| l.into_iter().map(Into::into).collect()),
            tax_rate: tax_rate.map(Into::into),
            due_at: due_at.map(DateTime::coerce),
            status: status.map(Into::into),
            notes: notes.explicit(),
            client_id: client_id.explicit().map(|id| id.map(Into::into)),
            number: number.map(Into::into),
            case_id: case_id.map(Into::into),
            tenant_id: None,
            issued_at: issued_at.map(DateTime::coerce),
        }
    }
}

/// Status of an `Invoice`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "InvoiceStatus")]
pub enum Status {
    /// `Invoice` is being prepared.
    Draft,

    /// `Invoice` is sent to the client.
    Sent,

    /// `Invoice` is paid.
    Paid,

    /// `Invoice` is not paid in time.
    Overdue,
}

impl From<domain::invoice::Status> for Status {
    fn from(status: domain::invoice::Status) -> Self {
        use domain::invoice::Status as S;

        match status {
            S::Draft => Self::Draft,
            S::Sent => Self::Sent,
            S::Paid => Self::Paid,
            S::Overdue => Self::Overdue,
        }
    }
}

impl From<Status> for domain::invoice::Status {
    fn from(status: Status) -> Self {
        match status {
            Status::Draft => Self::Draft,
            Status::Sent => Self::Sent,
            Status::Paid => Self::Paid,
            Status::Overdue => Self::Overdue,
        }
    }
}

/// Per-status summary of the active `Invoice`s of the current cabinet.
#[derive(Clone, Debug, From)]
pub struct Summary(read::invoice::Summary);

/// Per-status summary of the active `Invoice`s of the current cabinet.
#[graphql_object(name = "InvoiceSummary", context = Context)]
impl Summary {
    /// Summaries of every `InvoiceStatus`.
    pub fn statuses(&self) -> Vec<StatusSummary> {
        self.0.statuses().iter().copied().map(StatusSummary).collect()
    }

    /// Total number of the active `Invoice`s.
    pub fn count(&self) -> i32 {
        int(self.0.count())
    }

    /// Sum of the active `Invoice` totals.
    pub fn total(&self) -> Money {
        self.0.total()
    }
}

/// Summary of the active `Invoice`s having a single status.
#[derive(Clone, Copy, Debug)]
pub struct StatusSummary(read::invoice::StatusSummary);

/// Summary of the active `Invoice`s having a single status.
#[graphql_object(name = "InvoiceStatusSummary", context = Context)]
impl StatusSummary {
    /// Status of the summarized `Invoice`s.
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// Number of the summarized `Invoice`s.
    pub fn count(&self) -> i32 {
        int(self.0.count)
    }

    /// Sum of the summarized `Invoice` totals.
    pub fn total(&self) -> Money {
        self.0.total
    }
}

/// Usage of the `Invoice`s quota of the current cabinet plan.
#[derive(Clone, Copy, Debug, From)]
pub struct Quota(quota::Quota);

/// Usage of the `Invoice`s quota of the current cabinet plan.
#[graphql_object(name = "InvoiceQuota", context = Context)]
impl Quota {
    /// Indicator whether one more `Invoice` may be created.
    pub fn allowed(&self) -> bool {
        self.0.allowed
    }

    /// Number of the active `Invoice`s.
    pub fn current_count(&self) -> i32 {
        int(self.0.current_count)
    }

    /// Maximum number of the active `Invoice`s, if limited.
    pub fn limit(&self) -> Option<i32> {
        self.0.limit.map(int)
    }
}

/// Unique identifier of an `Invoice`.
#[derive(Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[from(domain::invoice::Id)]
#[into(domain::invoice::Id)]
#[graphql(name = "InvoiceId", transparent)]
pub struct Id(Uuid);

/// Unique identifier of a case.
#[derive(Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[from(domain::case::Id)]
#[into(domain::case::Id)]
#[graphql(name = "CaseId", transparent)]
pub struct CaseId(Uuid);

/// Unique identifier of a client.
#[derive(Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[from(domain::client::Id)]
#[into(domain::client::Id)]
#[graphql(name = "ClientId", transparent)]
pub struct ClientId(Uuid);

/// Public number of an `Invoice` in `FAC-{year}-{seq}` format.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "InvoiceNumber",
    with = scalar::Via::<domain::invoice::Number>,
)]
pub struct Number(domain::invoice::Number);

/// Arbitrary precision decimal number, as a string.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(with = scalar::Via::<rust_decimal::Decimal>)]
pub struct Decimal(rust_decimal::Decimal);

#[cfg(test)]
mod spec {
    use juniper::Nullable;
    use service::{command::update_invoice, domain};

    use super::{ClientId, Patch, Status};

    fn patch() -> Patch {
        Patch {
            lines: None,
            tax_rate: None,
            due_at: None,
            status: None,
            notes: Nullable::ImplicitNull,
            client_id: Nullable::ImplicitNull,
            number: None,
            case_id: None,
            issued_at: None,
        }
    }

    #[test]
    fn omitted_fields_are_left_untouched() {
        let patch = update_invoice::Patch::from(patch());

        assert_eq!(patch.notes, None);
        assert_eq!(patch.client_id, None);
        assert_eq!(patch.tenant_id, None);
    }

    #[test]
    fn explicit_null_removes_value() {
        let patch = update_invoice::Patch::from(Patch {
            notes: Nullable::ExplicitNull,
            client_id: Nullable::ExplicitNull,
            ..patch()
        });

        assert_eq!(patch.notes, Some(None));
        assert_eq!(patch.client_id, Some(None));
    }

    #[test]
    fn provided_value_replaces() {
        let client = domain::client::Id::new();
        let patch = update_invoice::Patch::from(Patch {
            notes: Nullable::Some("Paid by wire".to_owned()),
            client_id: Nullable::Some(ClientId::from(client)),
            status: Some(Status::Paid),
            ..patch()
        });

        assert_eq!(patch.notes, Some(Some("Paid by wire".to_owned())));
        assert_eq!(patch.client_id, Some(Some(client)));
        assert_eq!(patch.status, Some(domain::invoice::Status::Paid));
    }

    #[test]
    fn status_converts_both_ways() {
        for &status in domain::invoice::Status::ALL {
            assert_eq!(
                domain::invoice::Status::from(Status::from(status)),
                status,
            );
        }
    }
}
