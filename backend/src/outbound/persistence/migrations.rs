//! Embedded schema migrations, applied at startup.

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

/// Embedded migrations from the backend/migrations directory.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Apply pending migrations over a dedicated synchronous connection.
///
/// The migration harness is synchronous, so the call is pushed onto the
/// blocking pool rather than stalling the runtime.
pub async fn run_pending_migrations(database_url: &str) -> Result<(), String> {
    let url = database_url.to_owned();
    let applied = tokio::task::spawn_blocking(move || {
        let mut conn =
            PgConnection::establish(&url).map_err(|err| format!("connect for migrations: {err}"))?;
        let versions = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|err| format!("apply migrations: {err}"))?;
        Ok::<_, String>(versions.len())
    })
    .await
    .map_err(|err| format!("migration task failed: {err}"))??;

    if applied > 0 {
        info!(applied, "schema migrations applied");
    }
    Ok(())
}
