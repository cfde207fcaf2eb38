//! In-memory [`Database`] implementation.
//!
//! Keeps all the data in a process-local state, so is suitable for tests
//! and prototyping only.

mod impls;

use std::{collections::HashMap, fmt, future::Future, sync::Arc};

use derive_more::{Display, Error as StdError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracerr::Traced;

use crate::{
    domain::{case, invoice, tenant, Case, Invoice},
    infra::database,
};
#[cfg(doc)]
use crate::infra::Database;

/// In-memory [`Database`] client.
#[derive(Clone, Debug, Default)]
pub struct Memory<T = NonTx>(T);

impl Memory {
    /// Creates a new empty [`Memory`] client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Data kept by a [`Memory`] client.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// Stored [`Case`]s.
    cases: HashMap<case::Id, Case>,

    /// Stored [`Invoice`]s.
    invoices: HashMap<invoice::Id, Invoice>,

    /// Last allocated [`invoice::Sequence`] values per tenant and year.
    counters: HashMap<(tenant::Id, i32), u32>,
}

/// Non-transactional [`Memory`] client.
#[derive(Clone, Debug, Default)]
pub struct NonTx {
    /// Shared [`State`].
    state: Arc<Mutex<State>>,
}

/// Transactional [`Memory`] client.
///
/// Holds the shared [`State`] exclusively until committed or dropped, so
/// transactions are fully serialized. Dropping without a [`Tx::commit()`]
/// discards all the changes.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`Staged`] changes of this transaction, until it's finished.
    staged: Arc<Mutex<Option<Staged>>>,
}

/// Changes staged by a [`Tx`].
struct Staged {
    /// Exclusive access to the shared [`State`].
    guard: OwnedMutexGuard<State>,

    /// Working copy of the shared [`State`].
    state: State,
}

impl fmt::Debug for Staged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Staged")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Tx {
    /// Starts a new [`Tx`] from the provided [`NonTx`] client, waiting for
    /// other transactions to finish.
    async fn from_non_tx(client: &NonTx) -> Self {
        let guard = Arc::clone(&client.state).lock_owned().await;
        let state = guard.clone();
        Self {
            staged: Arc::new(Mutex::new(Some(Staged { guard, state }))),
        }
    }

    /// Commits this [`Tx`], publishing its changes.
    ///
    /// Does nothing if this [`Tx`] is already committed.
    pub async fn commit(&self) {
        if let Some(Staged { mut guard, state }) =
            self.staged.lock().await.take()
        {
            *guard = state;
        }
    }
}

/// Storage of a [`State`] a [`Memory`] client operates on.
pub trait Storage {
    /// Runs the provided function upon the [`State`] of this [`Storage`].
    ///
    /// # Errors
    ///
    /// If the [`State`] cannot be accessed anymore.
    fn with<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> impl Future<Output = Result<R, Traced<database::Error>>>;
}

impl Storage for NonTx {
    async fn with<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        Ok(f(&mut *self.state.lock().await))
    }
}

impl Storage for Tx {
    async fn with<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        let mut staged = self.staged.lock().await;
        let staged = staged
            .as_mut()
            .ok_or(Error::TxFinished)
            .map_err(tracerr::wrap!())
            .map_err(tracerr::map_from)?;
        Ok(f(&mut staged.state))
    }
}

/// [`Memory`] database [`Error`].
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Transaction is already committed.
    #[display("Transaction is already committed")]
    TxFinished,

    /// Unique constraint is violated.
    #[display("Unique constraint `{_0}` is violated")]
    UniqueViolation(#[error(not(source))] &'static str),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::UniqueViolation(c) => constraint.map_or(true, |v| v == *c),
            Self::TxFinished => false,
        }
    }
}
