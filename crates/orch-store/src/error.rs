use std::fmt;

/// Store-level error taxonomy. Kept as a plain enum with manual `Display`/
/// `Error` impls rather than a derive macro, matching the rest of the
/// orchestrator's error handling.
#[derive(Debug)]
pub enum StoreError {
    NotFound,
    UniqueViolation { constraint: Option<String> },
    Db(sqlx::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "row not found"),
            StoreError::UniqueViolation { constraint } => {
                write!(f, "unique constraint violated: {:?}", constraint)
            }
            StoreError::Db(e) => write!(f, "database error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Db(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if is_unique_violation(&e) {
            let constraint = match &e {
                sqlx::Error::Database(db_err) => db_err.constraint().map(|s| s.to_string()),
                _ => None,
            };
            return StoreError::UniqueViolation { constraint };
        }
        if matches!(e, sqlx::Error::RowNotFound) {
            return StoreError::NotFound;
        }
        StoreError::Db(e)
    }
}

/// Detect a Postgres unique-constraint violation (SQLSTATE 23505).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
