//! [`Command`] definition.

pub mod archive_invoice;
pub mod create_invoice;
pub mod mark_invoice_paid;
pub mod update_invoice;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    archive_invoice::ArchiveInvoice, create_invoice::CreateInvoice,
    mark_invoice_paid::MarkInvoicePaid, update_invoice::UpdateInvoice,
};

#[cfg(test)]
pub(crate) mod spec {
    use common::{clock, operations::Insert, DateTime, Handler as _};

    use crate::{
        domain::{case, client, invoice::line, tenant, Case},
        infra::Memory,
        Config, Service,
    };

    use super::CreateInvoice;

    /// [`Service`] used in tests.
    pub(crate) type TestService = Service<Memory, clock::Fixed>;

    pub(crate) fn at(s: &str) -> DateTime {
        DateTime::from_rfc3339(s).unwrap()
    }

    /// Creates a new [`TestService`] frozen at the provided moment with a
    /// single [`Case`] of a new tenant.
    pub(crate) async fn service(now: &str) -> (TestService, Case) {
        let db = Memory::new();
        let case = Case {
            id: case::Id::new(),
            tenant_id: tenant::Id::new(),
            client_id: Some(client::Id::new()),
        };
        db.execute(Insert(case)).await.unwrap();
        (
            Service::new(Config::default(), db, clock::Fixed(at(now))),
            case,
        )
    }

    /// Returns the same [`TestService`] frozen at another moment.
    pub(crate) fn later(svc: &TestService, now: &str) -> TestService {
        Service::new(
            *svc.config(),
            svc.database().clone(),
            clock::Fixed(at(now)),
        )
    }

    pub(crate) fn consult() -> Vec<line::Draft> {
        vec![line::Draft {
            description: "Consult".into(),
            quantity: 2.into(),
            unit_price: "150.00".parse().unwrap(),
        }]
    }

    /// Returns a valid [`CreateInvoice`] for the provided [`Case`].
    pub(crate) fn create(case: &Case) -> CreateInvoice {
        CreateInvoice {
            tenant_id: case.tenant_id,
            plan: tenant::Plan::Basic,
            case_id: case.id,
            client_id: None,
            lines: consult(),
            tax_rate: None,
            due_at: at("2024-04-01T00:00:00Z").coerce(),
            notes: None,
        }
    }
}
