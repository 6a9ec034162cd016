//! Database migration command.
//!
//! Migrations live in `crates/api/migrations/` and are embedded at compile
//! time.
//!
//! ```bash
//! looks-lab-cli migrate
//! ```

use looks_lab_api::db;

use super::{CommandError, database_url};

/// Apply every pending migration.
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is unset, the database is unreachable
/// or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
