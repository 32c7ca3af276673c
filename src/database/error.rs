use thiserror::Error;

/// Result type for database operations
pub type DbResult<T> = Result<T, DatabaseError>;

/// Database error, classified from SQLx at the repository boundary.
#[derive(Debug, Clone, Error)]
pub enum DatabaseError {
    #[error("Database connection pool exhausted. Please try again.")]
    PoolExhausted,

    #[error("Record not found")]
    NotFound,

    #[error("A record with {column} '{value}' already exists")]
    UniqueConstraintViolation { column: String, value: String },

    #[error("Database query failed: {message}")]
    QueryError { message: String },

    #[error("Database connection error: {message}")]
    ConnectionError { message: String },

    #[error("Database configuration error: {message}")]
    ConfigError { message: String },

    #[error("Unknown database error: {message}")]
    Unknown { message: String },
}

impl DatabaseError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DatabaseError::PoolExhausted | DatabaseError::ConnectionError { .. }
        )
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, DatabaseError::UniqueConstraintViolation { .. })
    }

    /// Map a SQLx error to our error type
    pub fn from_sqlx(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => DatabaseError::NotFound,
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::PoolClosed => DatabaseError::ConnectionError {
                message: "Connection pool is closed".to_string(),
            },
            sqlx::Error::Configuration(msg) => DatabaseError::ConfigError {
                message: msg.to_string(),
            },
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                // Postgres unique_violation
                Some("23505") => DatabaseError::UniqueConstraintViolation {
                    column: "unknown".to_string(),
                    value: "provided value".to_string(),
                },
                _ => DatabaseError::QueryError {
                    message: db_err.message().to_string(),
                },
            },
            sqlx::Error::Io(io_err) => DatabaseError::ConnectionError {
                message: io_err.to_string(),
            },
            _ => DatabaseError::Unknown {
                message: error.to_string(),
            },
        }
    }
}
