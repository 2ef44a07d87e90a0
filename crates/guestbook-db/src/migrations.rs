use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Idempotent schema setup. Runs once when the database is opened at
/// startup, never on the request path; every statement is a
/// "create if absent" form, so racing processes are harmless.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS identities (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            image       TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS sessions (
            token       TEXT PRIMARY KEY,
            identity_id TEXT NOT NULL REFERENCES identities(id),
            expires_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_identity
            ON sessions(identity_id);

        -- AUTOINCREMENT keeps ids monotonic: a deleted id is never handed
        -- out again, so a stale delete can only miss, not hit a new row.
        CREATE TABLE IF NOT EXISTS messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            text        TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            owner_id    TEXT REFERENCES identities(id)
        );

        CREATE INDEX IF NOT EXISTS idx_messages_created
            ON messages(created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
