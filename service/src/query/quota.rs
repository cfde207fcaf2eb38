//! [`CheckQuota`] definitions.

use common::operations::{By, Select};
use serde::Deserialize;
use smart_default::SmartDefault;
use tracerr::Traced;

use crate::{
    domain::tenant::{self, Plan},
    infra::{database, Database},
    read, Service,
};
#[cfg(doc)]
use crate::domain::Invoice;

use super::Query;

/// Configuration of [`CheckQuota`].
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Config {
    /// Maximum number of active [`Invoice`]s of a [`Plan::Basic`] tenant.
    ///
    /// [`None`] means unlimited.
    #[default(Some(10))]
    pub basic: Option<u32>,

    /// Maximum number of active [`Invoice`]s of a [`Plan::Premium`] tenant.
    ///
    /// [`None`] means unlimited.
    pub premium: Option<u32>,
}

impl Config {
    /// Returns the limit of the provided [`Plan`].
    #[must_use]
    pub fn limit(&self, plan: Plan) -> Option<u32> {
        match plan {
            Plan::Basic => self.basic,
            Plan::Premium => self.premium,
        }
    }
}

/// Resource limited by a [`Plan`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Resource {
    /// Non-archived [`Invoice`]s.
    Invoices,
}

/// [`Query`] checking whether a tenant may create one more [`Resource`].
#[derive(Clone, Copy, Debug)]
pub struct CheckQuota {
    /// ID of the tenant to check.
    pub tenant_id: tenant::Id,

    /// [`Plan`] of the tenant.
    pub plan: Plan,

    /// [`Resource`] to check.
    pub resource: Resource,
}

/// Result of a [`CheckQuota`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Quota {
    /// Indicator whether one more [`Resource`] may be created.
    pub allowed: bool,

    /// Number of the [`Resource`]s the tenant has currently.
    pub current_count: u32,

    /// Maximum number of the [`Resource`]s, if limited.
    pub limit: Option<u32>,
}

impl<Db, Clk> Query<CheckQuota> for Service<Db, Clk>
where
    Db: Database<
        Select<By<read::invoice::ActiveCount, tenant::Id>>,
        Ok = read::invoice::ActiveCount,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Quota;
    type Err = Traced<database::Error>;

    async fn execute(&self, query: CheckQuota) -> Result<Self::Ok, Self::Err> {
        let CheckQuota {
            tenant_id,
            plan,
            resource,
        } = query;

        let current_count: u32 = match resource {
            Resource::Invoices => self
                .database()
                .execute(Select(By::<read::invoice::ActiveCount, _>::new(
                    tenant_id,
                )))
                .await
                .map_err(tracerr::wrap!())?
                .into(),
        };
        let limit = self.config().quota.limit(plan);

        Ok(Quota {
            allowed: limit.map_or(true, |l| current_count < l),
            current_count,
            limit,
        })
    }
}
