//! Shared Postgres plumbing for the sqlx-backed adapters.

use std::future::Future;

use sqlx::PgPool;

const SCHEMA: &str = include_str!("../migrations/0001_receiving.sql");

/// Create the ledger and idempotency tables if they do not exist.
pub async fn apply_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

/// Run an async store call from the synchronous adapter traits.
///
/// Requires a multi-threaded tokio runtime (the API server runs on one).
/// Returns `None` when called outside a runtime.
pub(crate) fn block_on<F: Future>(fut: F) -> Option<F::Output> {
    let handle = tokio::runtime::Handle::try_current().ok()?;
    Some(tokio::task::block_in_place(|| handle.block_on(fut)))
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}
