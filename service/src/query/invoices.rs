//! [`Query`] collection related to the multiple [`Invoice`]s.

use common::operations::By;

use crate::{
    domain::{tenant, Invoice},
    read,
};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a list of [`Invoice`]s, most recently issued first.
pub type List = DatabaseQuery<By<Vec<Invoice>, read::invoice::list::Selector>>;

/// Queries a per-status summary of non-archived [`Invoice`]s of a tenant.
pub type Summary = DatabaseQuery<By<read::invoice::Summary, tenant::Id>>;

#[cfg(test)]
mod spec {
    use common::{operations::Insert, Handler as _, Money};

    use crate::{
        command::{
            spec::{create, later, service},
            ArchiveInvoice, MarkInvoicePaid,
        },
        domain::{case, invoice::Status, tenant, Case},
        query::invoice::ById,
        read::invoice::list,
    };

    use super::{List, Summary};

    #[tokio::test]
    async fn lists_most_recent_first() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;
        let first = svc.execute(create(&case)).await.unwrap();
        let second = later(&svc, "2024-03-02T10:00:00Z")
            .execute(create(&case))
            .await
            .unwrap();
        let third = later(&svc, "2024-02-01T10:00:00Z")
            .execute(create(&case))
            .await
            .unwrap();

        let listed = svc
            .execute(List::by(list::Selector {
                tenant_id: case.tenant_id,
                filter: list::Filter::default(),
            }))
            .await
            .unwrap();

        assert_eq!(
            listed.iter().map(|i| i.id).collect::<Vec<_>>(),
            [second.id, first.id, third.id],
        );
    }

    #[tokio::test]
    async fn filters_by_status() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;
        let paid = svc.execute(create(&case)).await.unwrap();
        let sent = svc.execute(create(&case)).await.unwrap();
        _ = svc
            .execute(MarkInvoicePaid {
                tenant_id: case.tenant_id,
                invoice_id: paid.id,
            })
            .await
            .unwrap();

        let listed = svc
            .execute(List::by(list::Selector {
                tenant_id: case.tenant_id,
                filter: list::Filter {
                    status: Some(Status::Sent),
                    ..list::Filter::default()
                },
            }))
            .await
            .unwrap();

        assert_eq!(listed.iter().map(|i| i.id).collect::<Vec<_>>(), [sent.id]);
    }

    #[tokio::test]
    async fn never_lists_other_tenants() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;
        let other_case = Case {
            id: case::Id::new(),
            tenant_id: tenant::Id::new(),
            client_id: None,
        };
        svc.database().execute(Insert(other_case)).await.unwrap();
        let own = svc.execute(create(&case)).await.unwrap();
        let foreign = svc.execute(create(&other_case)).await.unwrap();

        let listed = svc
            .execute(List::by(list::Selector {
                tenant_id: case.tenant_id,
                filter: list::Filter {
                    include_archived: true,
                    ..list::Filter::default()
                },
            }))
            .await
            .unwrap();
        assert_eq!(listed.iter().map(|i| i.id).collect::<Vec<_>>(), [own.id]);

        let found = svc
            .execute(ById::by((case.tenant_id, foreign.id)))
            .await
            .unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn summarizes_active_invoices() {
        let (svc, case) = service("2024-03-01T10:00:00Z").await;
        let paid = svc.execute(create(&case)).await.unwrap();
        let archived = svc.execute(create(&case)).await.unwrap();
        _ = svc.execute(create(&case)).await.unwrap();
        _ = svc
            .execute(MarkInvoicePaid {
                tenant_id: case.tenant_id,
                invoice_id: paid.id,
            })
            .await
            .unwrap();
        _ = svc
            .execute(ArchiveInvoice {
                tenant_id: case.tenant_id,
                invoice_id: archived.id,
            })
            .await
            .unwrap();

        let summary = svc.execute(Summary::by(case.tenant_id)).await.unwrap();

        let of = |s| summary.of(s).copied().unwrap();
        assert_eq!(of(Status::Paid).count, 1);
        assert_eq!(of(Status::Paid).total, "360.00".parse::<Money>().unwrap());
        assert_eq!(of(Status::Sent).count, 1);
        assert_eq!(of(Status::Overdue).count, 0);
        assert_eq!(summary.count(), 2);
        assert_eq!(summary.total(), "720.00".parse::<Money>().unwrap());
    }
}
