//! Sequential [`Number`] allocation.

use common::{
    operations::{Allocate, By},
    DateTime,
};
use derive_more::{Display, Error as StdError, From};
use serde::Deserialize;
use smart_default::SmartDefault;
use tracerr::Traced;

use crate::{
    domain::{
        invoice::{Number, Sequence},
        tenant,
    },
    infra::{database, Database},
};
#[cfg(doc)]
use crate::domain::Invoice;

/// Configuration of [`Number`] allocation.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Config {
    /// Number of attempts to create an [`Invoice`] when its allocated
    /// [`Number`] turns out to be taken already.
    #[default = 3]
    pub max_attempts: u32,
}

/// Allocates the next [`Number`] of the provided tenant for the year of
/// the provided `now` moment (in UTC).
///
/// Should be executed in the same transaction the [`Invoice`] is inserted
/// in, so an aborted creation doesn't leave a gap in the sequence.
///
/// # Errors
///
/// - With [`Error::Exhausted`] if all the [`Number`]s of the year are used.
/// - With [`Error::Db`] if the [`Database`] operation fails.
pub async fn allocate<Db>(
    db: &Db,
    tenant_id: tenant::Id,
    now: DateTime,
) -> Result<Number, Traced<Error>>
where
    Db: Database<
        Allocate<By<Sequence, (tenant::Id, i32)>>,
        Ok = u32,
        Err = Traced<database::Error>,
    >,
{
    let year = now.year();
    let seq = db
        .execute(Allocate(By::new((tenant_id, year))))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> Error))?;
    Number::new(year, seq)
        .ok_or(Error::Exhausted(year))
        .map_err(tracerr::wrap!())
}

/// Error of [`allocate()`]ing a [`Number`].
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// All the [`Number`]s of the year are used.
    #[display("All invoice numbers of {_0} year are used")]
    Exhausted(#[error(not(source))] i32),
}
