//! [`Case`]-related [`Database`] implementations.

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::{case, tenant, Case},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Select<By<Option<Case>, (tenant::Id, case::Id)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Case>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Case>, (tenant::Id, case::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (tenant_id, id) = by.into_inner();

        const SQL: &str = "\
            SELECT id, tenant_id, client_id \
            FROM cases \
            WHERE id = $1::UUID \
              AND tenant_id = $2::UUID";
        Ok(self
            .query_opt(SQL, &[&id, &tenant_id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| Case {
                id: row.get("id"),
                tenant_id: row.get("tenant_id"),
                client_id: row.get("client_id"),
            }))
    }
}
