use crate::models::{FeedMessageRow, IdentityRow, MessageRow};
use crate::Database;
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Identities --

    /// Insert an identity or refresh its display fields. The OAuth flow
    /// re-sends the profile on every login, so name and image track the
    /// provider; the id never changes.
    pub fn upsert_identity(&self, id: &str, name: &str, image: Option<&str>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO identities (id, name, image) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, image = excluded.image",
                rusqlite::params![id, name, image],
            )?;
            Ok(())
        })
    }

    pub fn get_identity(&self, id: &str) -> Result<Option<IdentityRow>> {
        self.with_conn(|conn| query_identity(conn, id))
    }

    // -- Sessions --

    pub fn create_session(&self, token: &str, identity_id: &str, expires_at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (token, identity_id, expires_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![token, identity_id, expires_at],
            )?;
            Ok(())
        })
    }

    /// Resolve a session token to its identity. Expired sessions resolve to
    /// none, exactly like unknown tokens.
    pub fn resolve_session(&self, token: &str) -> Result<Option<IdentityRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT i.id, i.name, i.image, i.created_at
                     FROM sessions s
                     JOIN identities i ON s.identity_id = i.id
                     WHERE s.token = ?1 AND s.expires_at > datetime('now')",
                    [token],
                    |row| {
                        Ok(IdentityRow {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            image: row.get(2)?,
                            created_at: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Remove a session. Returns how many rows went away (0 or 1).
    pub fn delete_session(&self, token: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM sessions WHERE token = ?1", [token])?;
            Ok(n)
        })
    }

    /// Drop sessions already past their expiry. Resolution filters on
    /// expiry anyway; this is startup hygiene so dead rows don't pile up.
    pub fn purge_expired_sessions(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM sessions WHERE expires_at <= datetime('now')",
                [],
            )?;
            Ok(n)
        })
    }

    // -- Messages --

    /// Insert a message and hand back the stored row. `id` and `created_at`
    /// are assigned by the database, so the insert uses RETURNING rather
    /// than a separate read-back.
    pub fn insert_message(&self, text: &str, owner_id: &str) -> Result<MessageRow> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                "INSERT INTO messages (text, owner_id) VALUES (?1, ?2)
                 RETURNING id, text, created_at, owner_id",
                rusqlite::params![text, owner_id],
                |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        text: row.get(1)?,
                        created_at: row.get(2)?,
                        owner_id: row.get(3)?,
                    })
                },
            )?;
            Ok(row)
        })
    }

    /// Every message with its owner's display fields, newest first.
    pub fn list_messages(&self) -> Result<Vec<FeedMessageRow>> {
        self.with_conn(query_feed)
    }

    /// Conditional delete keyed on both id and owner, the atomic form of
    /// "check ownership, then delete". Returns the affected-row count:
    /// 1 means the caller owned the row and it is gone, 0 means the row is
    /// missing or owned by someone else; the caller decides which by a
    /// follow-up read.
    pub fn delete_message_owned(&self, id: i64, owner_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM messages WHERE id = ?1 AND owner_id = ?2",
                rusqlite::params![id, owner_id],
            )?;
            Ok(n)
        })
    }

    /// Owner of a message: `None` if the row is gone, `Some(None)` for an
    /// ownerless (anonymous-era) row.
    pub fn get_message_owner(&self, id: i64) -> Result<Option<Option<String>>> {
        self.with_conn(|conn| {
            let owner = conn
                .query_row(
                    "SELECT owner_id FROM messages WHERE id = ?1",
                    [id],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()?;
            Ok(owner)
        })
    }

    pub fn count_messages(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let n = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
            Ok(n)
        })
    }

    /// Cheap connectivity probe for the health endpoint.
    pub fn ping(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok(())
        })
    }
}

fn query_identity(conn: &Connection, id: &str) -> Result<Option<IdentityRow>> {
    let mut stmt =
        conn.prepare("SELECT id, name, image, created_at FROM identities WHERE id = ?1")?;

    let row = stmt
        .query_row([id], |row| {
            Ok(IdentityRow {
                id: row.get(0)?,
                name: row.get(1)?,
                image: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_feed(conn: &Connection) -> Result<Vec<FeedMessageRow>> {
    // LEFT JOIN so ownerless rows still appear, with null owner fields.
    // `id DESC` breaks created_at ties in insertion order: datetime('now')
    // has second resolution, so back-to-back posts tie constantly.
    let mut stmt = conn.prepare(
        "SELECT m.id, m.text, m.created_at, m.owner_id, i.name, i.image
         FROM messages m
         LEFT JOIN identities i ON m.owner_id = i.id
         ORDER BY m.created_at DESC, m.id DESC",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(FeedMessageRow {
                id: row.get(0)?,
                text: row.get(1)?,
                created_at: row.get(2)?,
                owner_id: row.get(3)?,
                owner_name: row.get(4)?,
                owner_image: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
