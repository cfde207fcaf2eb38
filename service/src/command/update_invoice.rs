//! [`Command`] for updating an existing [`Invoice`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    Clock,
};
use derive_more::{Display, Error, From};
use rust_decimal::Decimal;
use tracerr::Traced;

use crate::{
    domain::{
        case, client,
        invoice::{self, line, Number, Status, ValidationError},
        tenant, Invoice,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating an existing [`Invoice`].
#[derive(Clone, Debug)]
pub struct UpdateInvoice {
    /// ID of the tenant owning the [`Invoice`].
    pub tenant_id: tenant::Id,

    /// ID of the [`Invoice`] to be updated.
    pub invoice_id: invoice::Id,

    /// [`Patch`] to apply.
    pub patch: Patch,
}

/// Changes of an [`Invoice`].
///
/// [`None`] fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct Patch {
    /// New lines of the [`Invoice`].
    pub lines: Option<Vec<line::Draft>>,

    /// New tax rate of the [`Invoice`], in percents.
    pub tax_rate: Option<Decimal>,

    /// New due date of the [`Invoice`].
    pub due_at: Option<invoice::DueDateTime>,

    /// New [`Status`] of the [`Invoice`].
    pub status: Option<Status>,

    /// New notes of the [`Invoice`], or [`Some`]`(`[`None`]`)` to remove
    /// them.
    pub notes: Option<Option<String>>,

    /// New client of the [`Invoice`], or [`Some`]`(`[`None`]`)` to remove
    /// it.
    pub client_id: Option<Option<client::Id>>,

    /// [`Number`] of the [`Invoice`].
    ///
    /// Immutable, so is accepted only when matches the current one.
    pub number: Option<Number>,

    /// ID of the [`Case`] of the [`Invoice`].
    ///
    /// Immutable, so is accepted only when matches the current one.
    ///
    /// [`Case`]: crate::domain::Case
    pub case_id: Option<case::Id>,

    /// ID of the tenant owning the [`Invoice`].
    ///
    /// Immutable, so is accepted only when matches the current one.
    pub tenant_id: Option<tenant::Id>,

    /// Issue date of the [`Invoice`].
    ///
    /// Immutable, so is accepted only when matches the current one.
    pub issued_at: Option<invoice::IssueDateTime>,
}

impl<Db, Clk> Command<UpdateInvoice> for Service<Db, Clk>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Invoice, (tenant::Id, invoice::Id)>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Invoice>, (tenant::Id, invoice::Id)>>,
            Ok = Option<Invoice>,
            Err = Traced<database::Error>,
        > + Database<Update<Invoice>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Clk: Clock,
{
    type Ok = Invoice;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: UpdateInvoice) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateInvoice {
            tenant_id,
            invoice_id,
            patch:
                Patch {
                    lines,
                    tax_rate,
                    due_at,
                    status,
                    notes,
                    client_id,
                    number,
                    case_id,
                    tenant_id: new_tenant_id,
                    issued_at,
                },
        } = cmd;

        let lines = lines
            .map(invoice::validate_lines)
            .transpose()
            .map_err(tracerr::from_and_wrap!(=> E))?;
        let tax_rate = tax_rate
            .map(invoice::validate_tax_rate)
            .transpose()
            .map_err(tracerr::from_and_wrap!(=> E))?;
        let notes = notes
            .map(|n| n.map(invoice::validate_notes).transpose())
            .transpose()
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent modifications.
        tx.execute(Lock(By::new((tenant_id, invoice_id))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut invoice = tx
            .execute(Select(By::<Option<Invoice>, _>::new((
                tenant_id, invoice_id,
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::InvoiceNotExists(invoice_id))
            .map_err(tracerr::wrap!())?;

        if number.is_some_and(|n| n != invoice.number) {
            return Err(tracerr::new!(E::ImmutableField("number")));
        }
        if case_id.is_some_and(|id| id != invoice.case_id) {
            return Err(tracerr::new!(E::ImmutableField("case_id")));
        }
        if new_tenant_id.is_some_and(|id| id != invoice.tenant_id) {
            return Err(tracerr::new!(E::ImmutableField("tenant_id")));
        }
        if issued_at.is_some_and(|at| at != invoice.issued_at) {
            return Err(tracerr::new!(E::ImmutableField("issued_at")));
        }

        let now = self.clock().now();

        if lines.is_some() || tax_rate.is_some() {
            let lines = lines.unwrap_or_else(|| invoice.lines.clone());
            let tax_rate = tax_rate.unwrap_or(invoice.tax_rate);
            invoice
                .set_billing(lines, tax_rate)
                .map_err(tracerr::from_and_wrap!(=> E))?;
        }
        if let Some(due_at) = due_at {
            invoice.due_at = due_at;
        }
        if let Some(notes) = notes {
            invoice.notes = notes;
        }
        if let Some(client_id) = client_id {
            invoice.client_id = client_id;
        }
        if let Some(status) = status {
            let previous = invoice.status;
            invoice.set_status(status, now);
            if previous != status {
                tracing::info!(
                    %tenant_id,
                    %invoice_id,
                    from = %previous,
                    to = %status,
                    "invoice status changed"
                );
            }
        }
        invoice.updated_at = now.coerce();

        tx.execute(Update(invoice.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(invoice)
    }
}

/// Error of [`UpdateInvoice`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Immutable field of an [`Invoice`] is attempted to be changed.
    #[display("`Invoice.{_0}` cannot be changed")]
    ImmutableField(#[error(not(source))] &'static str),

    /// [`Invoice`] with the provided ID does not exist.
    #[display("`Invoice(id: {_0})` does not exist")]
    InvoiceNotExists(#[error(not(source))] invoice::Id),

    /// Provided data is invalid.
    #[display("Invalid `Invoice`: {_0}")]
    #[from]
    Validation(ValidationError),
}

#[cfg(test)]
mod spec {
    use common::{Handler as _, Money};

    use crate::{
        command::{
            spec::{at, create, later, service},
            MarkInvoicePaid,
        },
        domain::{
            case, client,
            invoice::{line, Number, Status, ValidationError},
            tenant,
        },
    };

    use super::{ExecutionError, Patch, UpdateInvoice};

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn paid_at_follows_status() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;
        let inv = svc.execute(create(&case)).await.unwrap();

        let paid = later(&svc, "2024-03-10T09:00:00Z")
            .execute(MarkInvoicePaid {
                tenant_id: case.tenant_id,
                invoice_id: inv.id,
            })
            .await
            .unwrap();
        assert_eq!(paid.status, Status::Paid);
        assert_eq!(paid.paid_at, Some(at("2024-03-10T09:00:00Z").coerce()));
        assert!(paid.paid_at.unwrap().coerce() >= inv.issued_at);

        let sent = later(&svc, "2024-03-11T09:00:00Z")
            .execute(UpdateInvoice {
                tenant_id: case.tenant_id,
                invoice_id: inv.id,
                patch: Patch {
                    status: Some(Status::Sent),
                    ..Patch::default()
                },
            })
            .await
            .unwrap();
        assert_eq!(sent.status, Status::Sent);
        assert_eq!(sent.paid_at, None);
        assert_eq!(sent.updated_at, at("2024-03-11T09:00:00Z").coerce());
    }

    #[tokio::test]
    async fn recomputes_totals() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;
        let inv = svc.execute(create(&case)).await.unwrap();

        let updated = svc
            .execute(UpdateInvoice {
                tenant_id: case.tenant_id,
                invoice_id: inv.id,
                patch: Patch {
                    tax_rate: Some(0.into()),
                    ..Patch::default()
                },
            })
            .await
            .unwrap();
        assert_eq!(updated.subtotal, money("300.00"));
        assert_eq!(updated.total, money("300.00"));

        let updated = svc
            .execute(UpdateInvoice {
                tenant_id: case.tenant_id,
                invoice_id: inv.id,
                patch: Patch {
                    lines: Some(vec![line::Draft {
                        description: "Hearing".into(),
                        quantity: "1.5".parse().unwrap(),
                        unit_price: money("200.00"),
                    }]),
                    ..Patch::default()
                },
            })
            .await
            .unwrap();
        assert_eq!(updated.lines.len(), 1);
        assert_eq!(updated.subtotal, money("300.00"));
        assert_eq!(updated.tax_rate, "0".parse().unwrap());
        assert_eq!(updated.total, money("300.00"));
        assert_eq!(updated.number, inv.number);
    }

    #[tokio::test]
    async fn patches_optional_fields() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;
        let inv = svc
            .execute(super::super::CreateInvoice {
                notes: Some("Net 30".into()),
                ..create(&case)
            })
            .await
            .unwrap();
        let client_id = client::Id::new();

        let updated = svc
            .execute(UpdateInvoice {
                tenant_id: case.tenant_id,
                invoice_id: inv.id,
                patch: Patch {
                    due_at: Some(at("2024-05-01T00:00:00Z").coerce()),
                    notes: Some(None),
                    client_id: Some(Some(client_id)),
                    number: Some(inv.number),
                    case_id: Some(case.id),
                    ..Patch::default()
                },
            })
            .await
            .unwrap();

        assert_eq!(updated.due_at, at("2024-05-01T00:00:00Z").coerce());
        assert_eq!(updated.notes, None);
        assert_eq!(updated.client_id, Some(client_id));
        assert_eq!(updated.lines, inv.lines);
        assert_eq!(updated.total, inv.total);
    }

    #[tokio::test]
    async fn rejects_immutable_changes() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;
        let inv = svc.execute(create(&case)).await.unwrap();

        for (patch, field) in [
            (
                Patch {
                    number: Some(Number::new(2024, 7).unwrap()),
                    ..Patch::default()
                },
                "number",
            ),
            (
                Patch {
                    case_id: Some(case::Id::new()),
                    ..Patch::default()
                },
                "case_id",
            ),
            (
                Patch {
                    tenant_id: Some(tenant::Id::new()),
                    ..Patch::default()
                },
                "tenant_id",
            ),
            (
                Patch {
                    issued_at: Some(at("2023-01-01T00:00:00Z").coerce()),
                    ..Patch::default()
                },
                "issued_at",
            ),
        ] {
            let err = svc
                .execute(UpdateInvoice {
                    tenant_id: case.tenant_id,
                    invoice_id: inv.id,
                    patch,
                })
                .await
                .unwrap_err();

            assert!(
                matches!(
                    err.as_ref(),
                    ExecutionError::ImmutableField(f) if *f == field,
                ),
                "{err}",
            );
        }
    }

    #[tokio::test]
    async fn rejects_invalid_data() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;
        let inv = svc.execute(create(&case)).await.unwrap();

        let err = svc
            .execute(UpdateInvoice {
                tenant_id: case.tenant_id,
                invoice_id: inv.id,
                patch: Patch {
                    lines: Some(vec![line::Draft {
                        description: "Refund".into(),
                        quantity: 1.into(),
                        unit_price: money("-10.00"),
                    }]),
                    ..Patch::default()
                },
            })
            .await
            .unwrap_err();

        assert!(
            matches!(
                err.as_ref(),
                ExecutionError::Validation(
                    ValidationError::NegativeUnitPrice(0),
                ),
            ),
            "{err}",
        );
    }

    #[tokio::test]
    async fn is_scoped_by_tenant() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;
        let inv = svc.execute(create(&case)).await.unwrap();

        let err = svc
            .execute(UpdateInvoice {
                tenant_id: tenant::Id::new(),
                invoice_id: inv.id,
                patch: Patch {
                    status: Some(Status::Overdue),
                    ..Patch::default()
                },
            })
            .await
            .unwrap_err();
        assert!(
            matches!(
                err.as_ref(),
                ExecutionError::InvoiceNotExists(id) if *id == inv.id,
            ),
            "{err}",
        );

        let err = svc
            .execute(MarkInvoicePaid {
                tenant_id: tenant::Id::new(),
                invoice_id: inv.id,
            })
            .await
            .unwrap_err();
        assert!(
            matches!(err.as_ref(), ExecutionError::InvoiceNotExists(_)),
            "{err}",
        );
    }

    #[tokio::test]
    async fn paid_at_invariant_holds_for_any_transitions() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;
        let inv = svc.execute(create(&case)).await.unwrap();

        for status in [
            Status::Paid,
            Status::Overdue,
            Status::Paid,
            Status::Paid,
            Status::Draft,
            Status::Sent,
            Status::Paid,
        ] {
            let updated = svc
                .execute(UpdateInvoice {
                    tenant_id: case.tenant_id,
                    invoice_id: inv.id,
                    patch: Patch {
                        status: Some(status),
                        ..Patch::default()
                    },
                })
                .await
                .unwrap();

            assert_eq!(updated.status, status);
            assert_eq!(updated.paid_at.is_some(), status == Status::Paid);
        }
    }
}
