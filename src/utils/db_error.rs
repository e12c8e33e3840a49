//! Helpers for classifying PostgreSQL errors.

/// Name of the partial unique index over live short URL codes.
pub const CODE_UNIQUE_INDEX: &str = "short_urls_code_live_key";

/// Returns true if `e` is a unique violation on the short URL code index.
pub fn is_unique_violation_on_code(e: &sqlx::Error) -> bool {
    let Some(db_err) = e.as_database_error() else {
        return false;
    };

    if !db_err.is_unique_violation() {
        return false;
    }

    matches!(db_err.constraint(), Some(CODE_UNIQUE_INDEX))
}

/// Returns true if `e` is a foreign key violation.
pub fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db_err| db_err.is_foreign_key_violation())
}
