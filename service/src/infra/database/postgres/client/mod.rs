//! Postgres database client definitions.

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{self, connection, Connection},
};

/// Implements [`Connection`] for the provided client type by delegating to
/// its lazily initialized `connection()`.
macro_rules! impl_connection {
    ($ty:ty) => {
        impl Connection for $ty {
            async fn query<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<Vec<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .query(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn query_opt<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<Option<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .query_opt(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn exec<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<u64, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .exec(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }
        }
    };
}

/// Non-transactional Postgres database client.
///
/// Takes a [`connection::NonTx`] from the [`connection::Pool`] on the first
/// use only.
#[derive(Clone, Debug)]
pub struct NonTx {
    /// [`connection::Pool`] to take [`Connection`]s from.
    pub(crate) pool: connection::Pool,

    /// Lazily taken [`Connection`].
    connection: Arc<RwLock<Option<connection::NonTx>>>,
}

impl NonTx {
    /// Creates a new [`NonTx`] client taking [`Connection`]s from the
    /// provided [`connection::Pool`].
    #[must_use]
    pub(crate) fn from_pool(pool: connection::Pool) -> Self {
        Self {
            pool,
            connection: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the underlying [`Connection`] of this [`NonTx`] client,
    /// taking it from the [`connection::Pool`] if there is none yet.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::NonTx>, Traced<database::Error>>
    {
        if let Ok(guard) = RwLockReadGuard::try_map(
            self.connection.read().await,
            Option::as_ref,
        ) {
            return Ok(guard);
        }

        let mut conn = self.connection.write().await;
        if conn.is_none() {
            *conn = Some(
                self.pool
                    .get()
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)?,
            );
        }
        Ok(RwLockReadGuard::map(conn.downgrade(), |c| {
            c.as_ref().expect("just initialized")
        }))
    }

    /// Takes the underlying [`Connection`] out of this [`NonTx`] client, if
    /// any.
    async fn take_connection(&self) -> Option<connection::NonTx> {
        self.connection.write().await.take()
    }
}

impl_connection!(NonTx);

/// Transactional Postgres database client.
///
/// Starts the transaction on the first use only, reusing the [`Connection`]
/// of the [`NonTx`] client it's created from, if there is one. Dropping this
/// client without a [`Tx::commit()`] rolls the transaction back.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`connection::Pool`] to take a [`Connection`] from.
    pool: connection::Pool,

    /// [`NonTx`] client to reuse the [`Connection`] of, until the
    /// transaction is started.
    non_tx: Arc<RwLock<Option<NonTx>>>,

    /// Lazily started [`connection::Tx`].
    tx: Arc<RwLock<Option<connection::Tx>>>,
}

impl Tx {
    /// Creates a new [`Tx`] client out of the provided [`NonTx`] client.
    #[must_use]
    pub fn from_non_tx(client: NonTx) -> Self {
        Self {
            pool: client.pool.clone(),
            non_tx: Arc::new(RwLock::new(Some(client))),
            tx: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the underlying [`connection::Tx`] of this [`Tx`] client,
    /// starting it if there is none yet.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::Tx>, Traced<database::Error>>
    {
        if let Ok(guard) =
            RwLockReadGuard::try_map(self.tx.read().await, Option::as_ref)
        {
            return Ok(guard);
        }

        let mut tx = self.tx.write().await;
        if tx.is_none() {
            let reused = match self.non_tx.write().await.take() {
                Some(client) => client.take_connection().await,
                None => None,
            };
            let conn = match reused {
                Some(conn) => conn,
                None => self
                    .pool
                    .get()
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)?,
            };
            *tx = Some(
                connection::Tx::begin(conn)
                    .await
                    .map_err(tracerr::wrap!())?,
            );
        }
        Ok(RwLockReadGuard::map(tx.downgrade(), |c| {
            c.as_ref().expect("just initialized")
        }))
    }

    /// Commits this [`Tx`] client.
    ///
    /// Does nothing if the transaction hasn't been started.
    ///
    /// # Errors
    ///
    /// If failed to commit the transaction.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let Some(tx) = self.tx.write().await.take() else {
            return Ok(());
        };
        tx.commit().await.map_err(tracerr::wrap!())
    }
}

impl_connection!(Tx);
