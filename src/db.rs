use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};

use crate::error::AppResult;

const MIGRATION_001: &str = include_str!("../migrations/001_initial.sql");

// One pooled connection: all writes serialize at the store boundary, and the
// WAL keeps committed state visible to readers.
pub async fn connect_and_migrate(database_url: &str) -> AppResult<DatabaseConnection> {
    let mut opts = ConnectOptions::new(database_url.to_string());
    opts.max_connections(1).sqlx_logging(false);

    let db = Database::connect(opts).await?;

    for pragma in [
        "PRAGMA foreign_keys=ON",
        "PRAGMA journal_mode=WAL",
        "PRAGMA synchronous=NORMAL",
        "PRAGMA busy_timeout=5000",
    ] {
        db.execute(Statement::from_string(db.get_database_backend(), pragma.to_string())).await?;
    }

    run_sql(&db, MIGRATION_001).await?;
    Ok(db)
}

async fn run_sql(db: &DatabaseConnection, sql: &str) -> AppResult<()> {
    for stmt in sql.split(';') {
        let stmt = stmt.trim();
        if stmt.is_empty() {
            continue;
        }
        db.execute(Statement::from_string(db.get_database_backend(), stmt.to_string())).await?;
    }
    Ok(())
}
