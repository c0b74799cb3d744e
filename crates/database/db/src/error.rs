use alloy_primitives::B256;
use postman_primitives::MessageStatus;

/// The error type for database operations.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// A database error occurred.
    #[error("database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),
    /// The message was not found in the database.
    #[error("message with hash [{0}] not found in database")]
    MessageNotFound(B256),
    /// The requested status transition is not part of the status graph.
    #[error("invalid status transition for message [{hash}]: {from} -> {to}")]
    InvalidTransition {
        /// The message hash.
        hash: B256,
        /// The expected current status.
        from: MessageStatus,
        /// The requested status.
        to: MessageStatus,
    },
    /// A message can only be created in an initial status.
    #[error("message [{0}] cannot be created with status {1}")]
    InvalidInitialStatus(B256, MessageStatus),
    /// A stored column could not be decoded.
    #[error("invalid value {value:?} in column {column}")]
    InvalidColumn {
        /// The column name.
        column: &'static str,
        /// The stored value.
        value: String,
    },
}
