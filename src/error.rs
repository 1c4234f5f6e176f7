use thiserror::Error;

/// Main error type for rel2graph
#[derive(Error, Debug)]
pub enum MigrationError {
    /// Source database or graph store cannot be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// Identity column holds a value that cannot identify a node
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// Entity or relation name cannot be turned into a table, column or label
    #[error("Invalid entity name: {0}")]
    InvalidEntityName(String),

    /// Intermediate-table row without a usable endpoint identity
    #[error("Malformed row {row} in {table}: {reason}")]
    MalformedRow {
        table: String,
        row: u64,
        reason: String,
    },

    /// Uniqueness constraint could not be created
    #[error("Failed to create uniqueness constraint on {label}: {message}")]
    ConstraintCreation { label: String, message: String },

    /// Uniqueness constraint could not be dropped
    #[error("Failed to drop uniqueness constraint on {label}: {message}")]
    ConstraintDrop { label: String, message: String },

    /// Graph statement failed
    #[error("Query error: {0}")]
    Query(String),

    /// Relational statement failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenient Result type using MigrationError
pub type Result<T> = std::result::Result<T, MigrationError>;
