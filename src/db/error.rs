use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Row not found")]
    NotFound,

    #[error("Database error: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Migration error: {0}")]
    Migration(String),
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => DbError::NotFound,
            other => DbError::Query(other.to_string()),
        }
    }
}
