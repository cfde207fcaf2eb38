//! [`Command`] for creating a new [`Invoice`].

use common::{
    operations::{Allocate, By, Commit, Insert, Select, Transact, Transacted},
    Clock,
};
use derive_more::{Display, Error, From};
use rust_decimal::Decimal;
use tracerr::Traced;

use crate::{
    domain::{
        case, client,
        invoice::{self, line, Sequence, Totals, ValidationError},
        tenant, Case, Invoice,
    },
    infra::{
        database::{self, INVOICE_NUMBER_CONSTRAINT},
        Database,
    },
    numbering,
    query::{quota, CheckQuota},
    read, Service,
};

use super::Command;

/// [`Command`] for creating a new [`Invoice`].
#[derive(Clone, Debug)]
pub struct CreateInvoice {
    /// ID of the tenant issuing the [`Invoice`].
    pub tenant_id: tenant::Id,

    /// [`tenant::Plan`] of the tenant issuing the [`Invoice`].
    pub plan: tenant::Plan,

    /// ID of the [`Case`] the [`Invoice`] bills.
    pub case_id: case::Id,

    /// ID of the client the [`Invoice`] is addressed to.
    ///
    /// Defaults to the client of the [`Case`].
    pub client_id: Option<client::Id>,

    /// [`line::Draft`]s of the [`Invoice`] lines.
    pub lines: Vec<line::Draft>,

    /// Tax rate of the [`Invoice`], in percents.
    ///
    /// Defaults to [`Invoice::DEFAULT_TAX_RATE`].
    pub tax_rate: Option<Decimal>,

    /// [`DateTime`] the [`Invoice`] should be paid by.
    ///
    /// [`DateTime`]: common::DateTime
    pub due_at: invoice::DueDateTime,

    /// Notes of the [`Invoice`].
    pub notes: Option<String>,
}

impl<Db, Clk> Command<CreateInvoice> for Service<Db, Clk>
where
    Db: Database<
            Select<By<read::invoice::ActiveCount, tenant::Id>>,
            Ok = read::invoice::ActiveCount,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Case>, (tenant::Id, case::Id)>>,
            Ok = Option<Case>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Allocate<By<Sequence, (tenant::Id, i32)>>,
            Ok = u32,
            Err = Traced<database::Error>,
        > + Database<Insert<Invoice>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Clk: Clock,
{
    type Ok = Invoice;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateInvoice) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateInvoice {
            tenant_id,
            plan,
            case_id,
            client_id,
            lines,
            tax_rate,
            due_at,
            notes,
        } = cmd;

        let lines = invoice::validate_lines(lines)
            .map_err(tracerr::from_and_wrap!(=> E))?;
        let tax_rate = tax_rate
            .map(invoice::validate_tax_rate)
            .transpose()
            .map_err(tracerr::from_and_wrap!(=> E))?
            .unwrap_or_else(Invoice::default_tax_rate);
        let notes = notes
            .map(invoice::validate_notes)
            .transpose()
            .map_err(tracerr::from_and_wrap!(=> E))?;
        let Totals {
            subtotal,
            tax,
            total,
        } = Totals::compute(&lines, tax_rate)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let quota = self
            .execute(CheckQuota {
                tenant_id,
                plan,
                resource: quota::Resource::Invoices,
            })
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !quota.allowed {
            return Err(tracerr::new!(E::QuotaExceeded {
                current_count: quota.current_count,
                limit: quota.limit.unwrap_or(quota.current_count),
            }));
        }

        let case = self
            .database()
            .execute(Select(By::<Option<Case>, _>::new((tenant_id, case_id))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CaseNotExists(case_id))
            .map_err(tracerr::wrap!())?;

        let now = self.clock().now();

        let max_attempts = self.config().numbering.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            let tx = self
                .database()
                .execute(Transact)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            let number = numbering::allocate(&tx, tenant_id, now)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            let invoice = Invoice {
                id: invoice::Id::new(),
                tenant_id,
                number,
                case_id: case.id,
                client_id: client_id.or(case.client_id),
                lines: lines.clone(),
                tax_rate,
                subtotal,
                tax,
                total,
                status: invoice::Status::Sent,
                issued_at: now.coerce(),
                due_at,
                paid_at: None,
                notes: notes.clone(),
                archived: false,
                updated_at: now.coerce(),
            };

            if let Err(e) = tx.execute(Insert(invoice.clone())).await {
                if e.as_ref()
                    .is_unique_violation(Some(INVOICE_NUMBER_CONSTRAINT))
                {
                    tracing::warn!(
                        %tenant_id,
                        %number,
                        attempt,
                        "invoice number is taken already, retrying"
                    );
                    continue;
                }
                return Err(e).map_err(tracerr::map_from_and_wrap!(=> E));
            }

            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            tracing::info!(
                %tenant_id,
                invoice_id = %invoice.id,
                %number,
                total = %invoice.total,
                "invoice created"
            );
            return Ok(invoice);
        }

        Err(tracerr::new!(E::NumberConflict(max_attempts)))
    }
}

/// Error of [`CreateInvoice`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Case`] with the provided ID does not exist.
    #[display("`Case(id: {_0})` does not exist")]
    CaseNotExists(#[error(not(source))] case::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Allocated [`invoice::Number`]s kept being taken.
    #[display("Failed to allocate a free invoice number in {_0} attempts")]
    NumberConflict(#[error(not(source))] u32),

    /// [`invoice::Number`] allocation failed.
    #[display("Failed to allocate an invoice number: {_0}")]
    #[from]
    Numbering(numbering::Error),

    /// Plan quota of the tenant is reached.
    #[display("Invoices quota is reached: {current_count} of {limit}")]
    QuotaExceeded {
        /// Number of the active [`Invoice`]s of the tenant.
        current_count: u32,

        /// Maximum number of the active [`Invoice`]s of the tenant.
        limit: u32,
    },

    /// Provided data is invalid.
    #[display("Invalid `Invoice`: {_0}")]
    #[from]
    Validation(ValidationError),
}

#[cfg(test)]
mod spec {
    use std::collections::HashSet;

    use common::{Handler as _, Money};

    use crate::{
        command::spec::{at, create, later, service},
        domain::{
            case, client,
            invoice::{line, Status, ValidationError},
            tenant,
        },
        query,
        read::invoice::list,
    };

    use super::ExecutionError;

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn creates_first_invoice_of_year() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;

        let inv = svc.execute(create(&case)).await.unwrap();

        assert_eq!(inv.number.to_string(), "FAC-2024-0001");
        assert_eq!(inv.tenant_id, case.tenant_id);
        assert_eq!(inv.case_id, case.id);
        assert_eq!(inv.client_id, case.client_id);
        assert_eq!(inv.subtotal, money("300.00"));
        assert_eq!(inv.tax, money("60.00"));
        assert_eq!(inv.total, money("360.00"));
        assert_eq!(inv.status, Status::Sent);
        assert_eq!(inv.paid_at, None);
        assert_eq!(inv.issued_at, at("2024-03-01T10:00:00Z").coerce());
        assert!(!inv.archived);

        let stored = svc
            .execute(query::invoice::ById::by((case.tenant_id, inv.id)))
            .await
            .unwrap();
        assert_eq!(stored, Some(inv));
    }

    #[tokio::test]
    async fn numbers_sequentially() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;

        let first = svc.execute(create(&case)).await.unwrap();
        let second = svc.execute(create(&case)).await.unwrap();
        let next_year = later(&svc, "2025-01-02T08:00:00Z")
            .execute(create(&case))
            .await
            .unwrap();

        assert_eq!(first.number.to_string(), "FAC-2024-0001");
        assert_eq!(second.number.to_string(), "FAC-2024-0002");
        assert_eq!(next_year.number.to_string(), "FAC-2025-0001");
    }

    #[tokio::test]
    async fn uses_provided_fields() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;
        let client_id = client::Id::new();

        let inv = svc
            .execute(super::CreateInvoice {
                client_id: Some(client_id),
                tax_rate: Some(5.into()),
                notes: Some("Bank transfer only".into()),
                ..create(&case)
            })
            .await
            .unwrap();

        assert_eq!(inv.client_id, Some(client_id));
        assert_eq!(inv.total, money("315.00"));
        assert_eq!(
            inv.notes.as_ref().map(AsRef::<str>::as_ref),
            Some("Bank transfer only"),
        );
    }

    #[tokio::test]
    async fn rejects_invalid_data() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;

        let err = svc
            .execute(super::CreateInvoice {
                lines: vec![],
                ..create(&case)
            })
            .await
            .unwrap_err();
        assert!(
            matches!(
                err.as_ref(),
                ExecutionError::Validation(ValidationError::NoLines),
            ),
            "{err}",
        );

        let err = svc
            .execute(super::CreateInvoice {
                tax_rate: Some(101.into()),
                ..create(&case)
            })
            .await
            .unwrap_err();
        assert!(
            matches!(
                err.as_ref(),
                ExecutionError::Validation(
                    ValidationError::TaxRateOutOfRange(_),
                ),
            ),
            "{err}",
        );

        let invoices = svc
            .execute(query::invoices::List::by(list::Selector {
                tenant_id: case.tenant_id,
                filter: list::Filter::default(),
            }))
            .await
            .unwrap();
        assert!(invoices.is_empty());
    }

    #[tokio::test]
    async fn rejects_oversized_amounts() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;
        let huge = "100000000000000000000";

        let err = svc
            .execute(super::CreateInvoice {
                lines: vec![line::Draft {
                    description: "Retainer".into(),
                    quantity: huge.parse().unwrap(),
                    unit_price: money(huge),
                }],
                ..create(&case)
            })
            .await
            .unwrap_err();
        assert!(
            matches!(
                err.as_ref(),
                ExecutionError::Validation(ValidationError::AmountTooLarge(0)),
            ),
            "{err}",
        );

        let err = svc
            .execute(super::CreateInvoice {
                lines: vec![line::Draft {
                    description: "Retainer".into(),
                    quantity: 1.into(),
                    unit_price: money("999999999999.99"),
                }],
                ..create(&case)
            })
            .await
            .unwrap_err();
        assert!(
            matches!(
                err.as_ref(),
                ExecutionError::Validation(ValidationError::TotalTooLarge),
            ),
            "{err}",
        );
    }

    #[tokio::test]
    async fn keeps_tax_rate_within_two_decimals() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;

        let err = svc
            .execute(super::CreateInvoice {
                tax_rate: Some("19.625".parse().unwrap()),
                ..create(&case)
            })
            .await
            .unwrap_err();
        assert!(
            matches!(
                err.as_ref(),
                ExecutionError::Validation(
                    ValidationError::TaxRateTooPrecise(_),
                ),
            ),
            "{err}",
        );

        let inv = svc
            .execute(super::CreateInvoice {
                tax_rate: Some("19.60".parse().unwrap()),
                ..create(&case)
            })
            .await
            .unwrap();
        assert_eq!(inv.tax_rate, "19.6".parse().unwrap());
        assert_eq!(inv.total, money("358.80"));
    }

    #[tokio::test]
    async fn requires_own_case() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;

        let unknown = case::Id::new();
        let err = svc
            .execute(super::CreateInvoice {
                case_id: unknown,
                ..create(&case)
            })
            .await
            .unwrap_err();
        assert!(
            matches!(
                err.as_ref(),
                ExecutionError::CaseNotExists(id) if *id == unknown,
            ),
            "{err}",
        );

        let err = svc
            .execute(super::CreateInvoice {
                tenant_id: tenant::Id::new(),
                ..create(&case)
            })
            .await
            .unwrap_err();
        assert!(
            matches!(err.as_ref(), ExecutionError::CaseNotExists(_)),
            "{err}",
        );
    }

    #[tokio::test]
    async fn respects_quota() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;
        for _ in 0..10 {
            _ = svc.execute(create(&case)).await.unwrap();
        }

        let err = svc.execute(create(&case)).await.unwrap_err();
        assert!(
            matches!(
                err.as_ref(),
                ExecutionError::QuotaExceeded {
                    current_count: 10,
                    limit: 10,
                },
            ),
            "{err}",
        );

        let all = list::Selector {
            tenant_id: case.tenant_id,
            filter: list::Filter {
                include_archived: true,
                ..list::Filter::default()
            },
        };
        assert_eq!(
            svc.execute(query::invoices::List::by(all))
                .await
                .unwrap()
                .len(),
            10,
        );

        let inv = svc
            .execute(super::CreateInvoice {
                plan: tenant::Plan::Premium,
                ..create(&case)
            })
            .await
            .unwrap();
        assert_eq!(inv.number.to_string(), "FAC-2024-0011");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creations_get_distinct_numbers() {
        const N: u32 = 20;

        let (svc, case) = service("2024-03-01T10:00:00Z").await;

        let tasks = (0..N)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move {
                    svc.execute(super::CreateInvoice {
                        plan: tenant::Plan::Premium,
                        ..create(&case)
                    })
                    .await
                    .unwrap()
                    .number
                    .seq()
                })
            })
            .collect::<Vec<_>>();
        let seqs = futures::future::try_join_all(tasks)
            .await
            .unwrap()
            .into_iter()
            .collect::<HashSet<_>>();

        assert_eq!(seqs, (1..=N).collect::<HashSet<_>>());
    }
}
