use thiserror::Error;

/// Unified error type for usage source reads
#[derive(Error, Debug)]
pub enum DbError {
    /// Rows came back in a shape the aggregation cannot use
    #[error("Unexpected value in column {column}: {message}")]
    SchemaMismatch { column: String, message: String },

    /// Catch-all for non-recoverable errors (connection loss, timeouts, ...)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convert from sqlx::Error using proper sqlx error categorization
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::ColumnNotFound(column) => DbError::SchemaMismatch {
                column: column.clone(),
                message: "column missing from result".to_string(),
            },
            sqlx::Error::ColumnDecode { index, source } => DbError::SchemaMismatch {
                column: index.clone(),
                message: source.to_string(),
            },
            sqlx::Error::Decode(source) => DbError::SchemaMismatch {
                column: "<unknown>".to_string(),
                message: source.to_string(),
            },
            sqlx::Error::TypeNotFound { type_name } => DbError::SchemaMismatch {
                column: "<unknown>".to_string(),
                message: format!("type {type_name} not found"),
            },
            // All other sqlx errors are non-recoverable - convert to anyhow with context
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_errors_are_schema_mismatches() {
        let err: DbError = sqlx::Error::ColumnNotFound("tokens".to_string()).into();
        assert!(matches!(err, DbError::SchemaMismatch { ref column, .. } if column == "tokens"));
    }

    #[test]
    fn test_connection_errors_are_opaque() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, DbError::Other(_)));
    }
}
