use crate::config::DatabaseConfig;
use crate::error::AppResult;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, SqlErr};

pub type DbPool = DatabaseConnection;

pub async fn create_pool(config: &DatabaseConfig) -> AppResult<DbPool> {
    let mut opts = ConnectOptions::new(config.url.clone());
    opts.max_connections(config.max_connections);
    let pool = Database::connect(opts).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> AppResult<()> {
    Migrator::up(pool, None).await?;
    Ok(())
}

/// Postgres reports serialization failures (SQLSTATE 40001) and deadlocks as
/// generic query errors; match on the message so callers can retry the
/// transaction instead of surfacing a corrupted-state error.
pub fn is_serialization_conflict(err: &DbErr) -> bool {
    let msg = err.to_string();
    msg.contains("40001")
        || msg.contains("could not serialize")
        || msg.contains("deadlock detected")
}

pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_conflict_detection() {
        let err = DbErr::Custom(
            "could not serialize access due to concurrent update (SQLSTATE 40001)".to_string(),
        );
        assert!(is_serialization_conflict(&err));

        let other = DbErr::Custom("relation does not exist".to_string());
        assert!(!is_serialization_conflict(&other));
    }
}
