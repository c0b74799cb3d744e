use super::{DatabaseConnectionProvider, DatabaseError};

/// A wrapper around [`sea_orm::DatabaseTransaction`] used to perform atomic writes.
#[derive(Debug)]
pub struct DatabaseTransaction {
    /// The underlying database transaction.
    tx: sea_orm::DatabaseTransaction,
}

impl DatabaseTransaction {
    /// Creates a new [`DatabaseTransaction`] instance associated with the provided
    /// [`sea_orm::DatabaseTransaction`].
    pub const fn new(tx: sea_orm::DatabaseTransaction) -> Self {
        Self { tx }
    }

    /// Commits the transaction.
    pub async fn commit(self) -> Result<(), DatabaseError> {
        tracing::trace!(target: "postman::db", "Committing transaction");
        self.tx.commit().await?;
        Ok(())
    }

    /// Rolls back the transaction.
    pub async fn rollback(self) -> Result<(), DatabaseError> {
        tracing::trace!(target: "postman::db", "Rolling back transaction");
        self.tx.rollback().await?;
        Ok(())
    }
}

impl DatabaseConnectionProvider for DatabaseTransaction {
    type Connection = sea_orm::DatabaseTransaction;

    fn get_connection(&self) -> &Self::Connection {
        &self.tx
    }
}
