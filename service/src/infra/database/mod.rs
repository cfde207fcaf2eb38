//! [`Database`]-related implementations.

#[cfg(any(test, feature = "memory"))]
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

#[cfg(any(test, feature = "memory"))]
pub use self::memory::Memory;
#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// Name of the constraint keeping invoice numbers unique per tenant.
pub const INVOICE_NUMBER_CONSTRAINT: &str = "invoices_tenant_number_key";

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(any(test, feature = "memory"))]
    /// [`Memory`] error.
    Memory(memory::Error),

    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint,
    /// regardless of the [`Database`] backend.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match *self {
            #[cfg(any(test, feature = "memory"))]
            Self::Memory(ref e) => e.is_unique_violation(constraint),
            #[cfg(feature = "postgres")]
            Self::Postgres(ref e) => e.is_unique_violation(constraint),
        }
    }

    /// Checks if the [`Database`] is temporarily unreachable, so the failed
    /// operation may succeed on retry.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        match *self {
            #[cfg(any(test, feature = "memory"))]
            Self::Memory(_) => false,
            #[cfg(feature = "postgres")]
            Self::Postgres(ref e) => e.is_unavailable(),
        }
    }
}
