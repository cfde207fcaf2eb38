//! [`Database`] implementations.

use std::cmp::Reverse;

use common::operations::{
    Allocate, By, Commit, Insert, Lock, Select, Transact, Update,
};
use tracerr::Traced;

use crate::{
    domain::{case, invoice, tenant, Case, Invoice},
    infra::{
        database::{self, INVOICE_NUMBER_CONSTRAINT},
        Database,
    },
    read,
};

use super::{Error, Memory, NonTx, Storage, Tx};

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(Memory(Tx::from_non_tx(&self.0).await))
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.0.commit().await;
        Ok(())
    }
}

impl<S: Storage> Database<Insert<Case>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(case): Insert<Case>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .with(|s| drop(s.cases.insert(case.id, case)))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S: Storage> Database<Select<By<Option<Case>, (tenant::Id, case::Id)>>>
    for Memory<S>
{
    type Ok = Option<Case>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Case>, (tenant::Id, case::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (tenant_id, id) = by.into_inner();
        self.0
            .with(|s| {
                s.cases
                    .get(&id)
                    .filter(|c| c.tenant_id == tenant_id)
                    .copied()
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S: Storage>
    Database<Select<By<Option<Invoice>, (tenant::Id, invoice::Id)>>>
    for Memory<S>
{
    type Ok = Option<Invoice>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Invoice>, (tenant::Id, invoice::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (tenant_id, id) = by.into_inner();
        self.0
            .with(|s| {
                s.invoices
                    .get(&id)
                    .filter(|i| i.tenant_id == tenant_id)
                    .cloned()
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl Database<Lock<By<Invoice, (tenant::Id, invoice::Id)>>> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Invoice, (tenant::Id, invoice::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        // `Tx` already holds the whole `State` exclusively.
        self.0.with(|_| ()).await.map_err(tracerr::wrap!())
    }
}

impl<S: Storage> Database<Insert<Invoice>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(invoice): Insert<Invoice>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .with(|s| {
                let taken = s.invoices.values().any(|i| {
                    i.tenant_id == invoice.tenant_id
                        && i.number == invoice.number
                });
                if taken {
                    return Err(Error::UniqueViolation(
                        INVOICE_NUMBER_CONSTRAINT,
                    ));
                }
                if s.invoices.contains_key(&invoice.id) {
                    return Err(Error::UniqueViolation("invoices_pkey"));
                }
                drop(s.invoices.insert(invoice.id, invoice));
                Ok(())
            })
            .await
            .map_err(tracerr::wrap!())?
            .map_err(tracerr::wrap!())
            .map_err(tracerr::map_from)
    }
}

impl<S: Storage> Database<Update<Invoice>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(invoice): Update<Invoice>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .with(|s| {
                if let Some(stored) = s
                    .invoices
                    .get_mut(&invoice.id)
                    .filter(|i| i.tenant_id == invoice.tenant_id)
                {
                    *stored = invoice;
                }
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S: Storage>
    Database<Allocate<By<invoice::Sequence, (tenant::Id, i32)>>>
    for Memory<S>
{
    type Ok = u32;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Allocate(by): Allocate<By<invoice::Sequence, (tenant::Id, i32)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (tenant_id, year) = by.into_inner();
        self.0
            .with(|s| {
                let stored = s
                    .invoices
                    .values()
                    .filter(|i| {
                        i.tenant_id == tenant_id && i.number.year() == year
                    })
                    .map(|i| i.number.seq())
                    .max()
                    .unwrap_or_default();
                let last = s.counters.entry((tenant_id, year)).or_default();
                *last = (*last).max(stored).saturating_add(1);
                *last
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S: Storage>
    Database<Select<By<Vec<Invoice>, read::invoice::list::Selector>>>
    for Memory<S>
{
    type Ok = Vec<Invoice>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Invoice>, read::invoice::list::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::invoice::list::Selector { tenant_id, filter } =
            by.into_inner();
        self.0
            .with(|s| {
                let mut invoices = s
                    .invoices
                    .values()
                    .filter(|i| i.tenant_id == tenant_id && filter.matches(i))
                    .cloned()
                    .collect::<Vec<_>>();
                invoices.sort_by_key(|i| Reverse((i.issued_at, i.id)));
                invoices
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S: Storage> Database<Select<By<read::invoice::ActiveCount, tenant::Id>>>
    for Memory<S>
{
    type Ok = read::invoice::ActiveCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::invoice::ActiveCount, tenant::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let tenant_id = by.into_inner();
        self.0
            .with(|s| {
                let count = s
                    .invoices
                    .values()
                    .filter(|i| i.tenant_id == tenant_id && !i.archived)
                    .count();
                u32::try_from(count).unwrap_or(u32::MAX).into()
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S: Storage> Database<Select<By<read::invoice::Summary, tenant::Id>>>
    for Memory<S>
{
    type Ok = read::invoice::Summary;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::invoice::Summary, tenant::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let tenant_id = by.into_inner();
        self.0
            .with(|s| {
                read::invoice::Summary::new(
                    s.invoices
                        .values()
                        .filter(|i| i.tenant_id == tenant_id && !i.archived)
                        .map(read::invoice::StatusSummary::from),
                )
            })
            .await
            .map_err(tracerr::wrap!())
    }
}
