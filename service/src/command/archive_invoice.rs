//! [`Command`] for archiving an [`Invoice`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    Clock,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{invoice, tenant, Invoice},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for archiving an [`Invoice`].
///
/// Archived [`Invoice`]s are not deleted, but excluded from default
/// listings. Archiving an already archived [`Invoice`] does nothing.
///
/// Returns the archived [`Invoice`].
#[derive(Clone, Copy, Debug)]
pub struct ArchiveInvoice {
    /// ID of the tenant owning the [`Invoice`].
    pub tenant_id: tenant::Id,

    /// ID of the [`Invoice`] to be archived.
    pub invoice_id: invoice::Id,
}

impl<Db, Clk> Command<ArchiveInvoice> for Service<Db, Clk>
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

    async fn execute(
        &self,
        cmd: ArchiveInvoice,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ArchiveInvoice {
            tenant_id,
            invoice_id,
        } = cmd;

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

        if invoice.archived {
            return Ok(invoice);
        }

        invoice.archived = true;
        invoice.updated_at = self.clock().now().coerce();

        tx.execute(Update(invoice.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tracing::info!(%tenant_id, %invoice_id, "invoice archived");

        Ok(invoice)
    }
}

/// Error of [`ArchiveInvoice`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Invoice`] with the provided ID does not exist.
    #[display("`Invoice(id: {_0})` does not exist")]
    InvoiceNotExists(#[error(not(source))] invoice::Id),
}

#[cfg(test)]
mod spec {
    use common::Handler as _;

    use crate::{
        command::spec::{create, service},
        domain::tenant,
        query,
        read::invoice::list,
    };

    use super::{ArchiveInvoice, ExecutionError};

    #[tokio::test]
    async fn archival_is_non_destructive() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;
        let archived = svc.execute(create(&case)).await.unwrap();
        let kept = svc.execute(create(&case)).await.unwrap();

        let returned = svc
            .execute(ArchiveInvoice {
                tenant_id: case.tenant_id,
                invoice_id: archived.id,
            })
            .await
            .unwrap();
        assert!(returned.archived);
        assert_eq!(returned.number, archived.number);

        let listed = svc
            .execute(query::invoices::List::by(list::Selector {
                tenant_id: case.tenant_id,
                filter: list::Filter::default(),
            }))
            .await
            .unwrap();
        assert_eq!(
            listed.iter().map(|i| i.id).collect::<Vec<_>>(),
            [kept.id],
        );

        let stored = svc
            .execute(query::invoice::ById::by((case.tenant_id, archived.id)))
            .await
            .unwrap()
            .unwrap();
        assert!(stored.archived);
        assert_eq!(stored.number, archived.number);
        assert_eq!(stored.lines, archived.lines);
        assert_eq!(stored.total, archived.total);

        let all = svc
            .execute(query::invoices::List::by(list::Selector {
                tenant_id: case.tenant_id,
                filter: list::Filter {
                    include_archived: true,
                    ..list::Filter::default()
                },
            }))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn is_idempotent() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;
        let inv = svc.execute(create(&case)).await.unwrap();
        let cmd = ArchiveInvoice {
            tenant_id: case.tenant_id,
            invoice_id: inv.id,
        };

        let first = svc.execute(cmd).await.unwrap();
        let second = svc.execute(cmd).await.unwrap();
        assert_eq!(first, second);

        let stored = svc
            .execute(query::invoice::ById::by((case.tenant_id, inv.id)))
            .await
            .unwrap()
            .unwrap();
        assert!(stored.archived);
    }

    #[tokio::test]
    async fn is_scoped_by_tenant() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;
        let inv = svc.execute(create(&case)).await.unwrap();

        let err = svc
            .execute(ArchiveInvoice {
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
}
