//! [`Handler`] abstractions.

use std::future::Future;

/// Asynchronous handler of `Args`.
///
/// Commands, queries and database operations are all expressed as
/// [`Handler`]s parametrized by their arguments type.
pub trait Handler<Args = ()> {
    /// Type of successful [`Handler`] result.
    type Ok;

    /// Type of this [`Handler`] error.
    type Err;

    /// Executes this [`Handler`] with the provided `args`.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
