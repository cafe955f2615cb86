//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all application data. Ownership
//! chains (leitner → level → question → statistic/tag links/synonym
//! membership) cascade through foreign keys.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Create tables if they don't exist
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            schema_version INTEGER NOT NULL DEFAULT 1,
            revision_id INTEGER NOT NULL DEFAULT 0,
            generated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        INSERT OR IGNORE INTO meta (id, schema_version, revision_id, generated_at)
        VALUES (1, 1, 0, datetime('now'));
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leitners (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            back_to_top_level_on_fail INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS levels (
            id TEXT PRIMARY KEY,
            leitner_id TEXT NOT NULL REFERENCES leitners(id) ON DELETE CASCADE,
            level_number INTEGER NOT NULL,
            days_to_recommend INTEGER NOT NULL,
            UNIQUE (leitner_id, level_number)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questions (
            id TEXT PRIMARY KEY,
            level_id TEXT NOT NULL REFERENCES levels(id) ON DELETE CASCADE,
            question TEXT NOT NULL,
            answer TEXT NOT NULL,
            detail TEXT,
            completed INTEGER NOT NULL DEFAULT 0,
            favorite INTEGER NOT NULL DEFAULT 0,
            pass_time TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            id TEXT PRIMARY KEY,
            leitner_id TEXT NOT NULL REFERENCES leitners(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            color TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS question_tags (
            question_id TEXT NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
            tag_id TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            PRIMARY KEY (question_id, tag_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS synonyms (
            id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // One group per question: membership is keyed by the question.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS synonym_members (
            question_id TEXT PRIMARY KEY REFERENCES questions(id) ON DELETE CASCADE,
            synonym_id TEXT NOT NULL REFERENCES synonyms(id) ON DELETE CASCADE
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS statistics (
            id TEXT PRIMARY KEY,
            question_id TEXT NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
            is_passed INTEGER NOT NULL,
            action_date TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_levels_leitner ON levels(leitner_id);
        CREATE INDEX IF NOT EXISTS idx_questions_level ON questions(level_id);
        CREATE INDEX IF NOT EXISTS idx_questions_pass_time ON questions(pass_time);
        CREATE INDEX IF NOT EXISTS idx_tags_leitner ON tags(leitner_id);
        CREATE INDEX IF NOT EXISTS idx_question_tags_tag ON question_tags(tag_id);
        CREATE INDEX IF NOT EXISTS idx_synonym_members_group ON synonym_members(synonym_id);
        CREATE INDEX IF NOT EXISTS idx_statistics_question ON statistics(question_id);
        CREATE INDEX IF NOT EXISTS idx_statistics_action_date ON statistics(action_date);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
