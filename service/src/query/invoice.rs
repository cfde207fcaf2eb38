//! [`Query`] collection related to a single [`Invoice`].

use common::operations::By;

use crate::domain::{invoice, tenant, Invoice};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries an [`Invoice`] of a tenant by its ID.
///
/// Archived [`Invoice`]s are returned too.
pub type ById = DatabaseQuery<By<Option<Invoice>, (tenant::Id, invoice::Id)>>;
