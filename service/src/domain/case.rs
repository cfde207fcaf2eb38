//! [`Case`] definitions.

use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{client, tenant};

/// Legal matter (dossier) an invoice bills against.
///
/// Cases are owned by another part of the system, so only the fields
/// required for invoicing are exposed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Case {
    /// ID of this [`Case`].
    pub id: Id,

    /// ID of the tenant owning this [`Case`].
    pub tenant_id: tenant::Id,

    /// ID of the client this [`Case`] is conducted for, if any.
    pub client_id: Option<client::Id>,
}

/// ID of a [`Case`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}
