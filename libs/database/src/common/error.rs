/// Error type for connection management and health checks
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Error reported by SeaORM / the driver
    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sea_orm::DbErr),

    /// Every connection attempt failed
    #[error("Connection failed after {attempts} attempts: {message}")]
    ConnectionFailed { attempts: u32, message: String },

    /// Health check query failed
    #[error("Health check failed: {0}")]
    HealthCheckFailed(String),

    /// Schema migration failed
    #[error("Migration failed for {app}: {message}")]
    MigrationFailed { app: String, message: String },
}

/// Result type alias for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;
