use anyhow::Result;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use std::sync::Arc;

const DATABASE_URL: &str = "sqlite:target_console.db";

/// DbConnection manages the SQLite pool and schema setup.
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    pub async fn new(url: &str) -> Result<Self> {
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?
        }

        let pool = SqlitePool::connect(url).await?;
        Self::setup_schema(&pool).await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub async fn init() -> Result<Self> {
        let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| DATABASE_URL.to_string());
        Self::new(&url).await
    }

    /// Unique shared-cache in-memory database per test.
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        let test_id = uuid::Uuid::new_v4().to_string();
        let db_url = format!("file:memdb_{}?mode=memory&cache=shared", test_id);

        Self::new(&db_url).await
    }

    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'USER'
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS regions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT ''
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS branches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT '',
                region_id INTEGER NOT NULL REFERENCES regions(id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS targets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                branch_id INTEGER NOT NULL REFERENCES branches(id),
                year INTEGER NOT NULL,
                month INTEGER NOT NULL,
                amount REAL NOT NULL,
                UNIQUE(branch_id, year, month)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                branch_id INTEGER NOT NULL REFERENCES branches(id),
                year INTEGER NOT NULL,
                month INTEGER NOT NULL,
                amount REAL NOT NULL,
                UNIQUE(branch_id, year, month)
            )
            "#,
        ];
        for statement in statements {
            sqlx::query(statement).execute(pool).await?;
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn schema_enforces_one_target_per_branch_period() {
        let db = DbConnection::init_test().await.expect("test db");

        sqlx::query("INSERT INTO regions (name) VALUES ('WESTERN')")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO branches (name, region_id) VALUES ('COLOMBO', 1)")
            .execute(db.pool())
            .await
            .unwrap();

        sqlx::query("INSERT INTO targets (branch_id, year, month, amount) VALUES (1, 2025, 6, 1000.0)")
            .execute(db.pool())
            .await
            .unwrap();

        let duplicate =
            sqlx::query("INSERT INTO targets (branch_id, year, month, amount) VALUES (1, 2025, 6, 500.0)")
                .execute(db.pool())
                .await;
        assert!(duplicate.is_err(), "unique index must reject a second target");

        // A different period for the same branch is fine.
        sqlx::query("INSERT INTO targets (branch_id, year, month, amount) VALUES (1, 2025, 7, 500.0)")
            .execute(db.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let db = DbConnection::init_test().await.expect("test db");

        sqlx::query(
            "INSERT INTO users (name, email, username, password_hash, role) \
             VALUES ('A', 'a@x', 'admin', 'h', 'ADMIN')",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let duplicate = sqlx::query(
            "INSERT INTO users (name, email, username, password_hash, role) \
             VALUES ('B', 'b@x', 'admin', 'h', 'USER')",
        )
        .execute(db.pool())
        .await;
        assert!(duplicate.is_err());

        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(db.pool())
            .await
            .unwrap()
            .get("n");
        assert_eq!(count, 1);
    }
}
