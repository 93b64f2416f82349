use sqlx::{Pool, Postgres};

// Embed SQL migrations at compile time for deterministic startup
const MIG_0001: &str = include_str!("migrations/0001_create_users.sql");
const MIG_0002: &str = include_str!("migrations/0002_create_conversations.sql");
const MIG_0003: &str = include_str!("migrations/0003_create_messages.sql");

pub async fn run_all(db: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    // Every statement is IF NOT EXISTS, so re-running on an up-to-date
    // database is a no-op. Any other failure is fatal to startup.
    for (label, sql) in [(1, MIG_0001), (2, MIG_0002), (3, MIG_0003)] {
        sqlx::raw_sql(sql).execute(db).await?;
        tracing::debug!(migration = %label, "migration applied");
    }
    Ok(())
}
