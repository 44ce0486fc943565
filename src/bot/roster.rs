//! Persistent record of who has been seen in each group.
//!
//! The Telegram Bot API cannot list the members of a group, so `tagall`
//! mentions everyone the bot has seen post or join, minus those who left.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

/// A group member as remembered by the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: String,
}

impl RosterEntry {
    /// `username` when set, otherwise the first name.
    pub fn handle(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.first_name)
    }
}

pub struct Roster {
    conn: Mutex<Connection>,
}

impl Roster {
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        let roster = Self::init(Connection::open(path)?)?;
        info!("Loaded roster from {:?} ({} members)", path, roster.count()?);
        Ok(roster)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> rusqlite::Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS members (
                chat_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                username TEXT,
                first_name TEXT NOT NULL,
                first_seen TEXT NOT NULL,
                last_seen TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'member',
                PRIMARY KEY (chat_id, user_id)
            );

            CREATE INDEX IF NOT EXISTS idx_members_username ON members(chat_id, username COLLATE NOCASE);
            "#,
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn count(&self) -> rusqlite::Result<usize> {
        let conn = self.lock();
        conn.query_row("SELECT COUNT(*) FROM members WHERE status = 'member'", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n as usize)
    }

    /// Record that `entry` is present in `chat_id`. Keeps first-seen order.
    pub fn record_seen(&self, chat_id: i64, entry: &RosterEntry) -> rusqlite::Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.lock().execute(
            "INSERT INTO members (chat_id, user_id, username, first_name, first_seen, last_seen, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5, 'member')
             ON CONFLICT(chat_id, user_id) DO UPDATE SET
                username = excluded.username,
                first_name = excluded.first_name,
                last_seen = excluded.last_seen,
                status = 'member'",
            params![chat_id, entry.user_id, entry.username, entry.first_name, now],
        )?;
        Ok(())
    }

    /// Mark a user as gone (left, kicked or banned).
    pub fn mark_gone(&self, chat_id: i64, user_id: i64, status: &str) -> rusqlite::Result<()> {
        self.lock().execute(
            "UPDATE members SET status = ?3 WHERE chat_id = ?1 AND user_id = ?2",
            params![chat_id, user_id, status],
        )?;
        Ok(())
    }

    /// Current members of `chat_id`, in the order they were first seen.
    pub fn members(&self, chat_id: i64) -> rusqlite::Result<Vec<RosterEntry>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT user_id, username, first_name FROM members
             WHERE chat_id = ?1 AND status = 'member'
             ORDER BY first_seen, rowid",
        )?;
        let rows = stmt.query_map(params![chat_id], |row| {
            Ok(RosterEntry {
                user_id: row.get(0)?,
                username: row.get(1)?,
                first_name: row.get(2)?,
            })
        })?;
        let members = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(members)
    }

    /// Look up a current member by `@username` (case-insensitive, `@` optional).
    /// Usernames are stored as written so mentions keep their case.
    pub fn find_by_username(&self, chat_id: i64, username: &str) -> rusqlite::Result<Option<RosterEntry>> {
        let username = username.trim_start_matches('@');
        let conn = self.lock();
        let found = conn
            .query_row(
                "SELECT user_id, username, first_name FROM members
                 WHERE chat_id = ?1 AND username = ?2 COLLATE NOCASE AND status = 'member'",
                params![chat_id, username],
                |row| {
                    Ok(RosterEntry {
                        user_id: row.get(0)?,
                        username: row.get(1)?,
                        first_name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(user_id: i64, username: Option<&str>, first_name: &str) -> RosterEntry {
        RosterEntry {
            user_id,
            username: username.map(String::from),
            first_name: first_name.to_string(),
        }
    }

    #[test]
    fn test_members_in_first_seen_order() {
        let roster = Roster::open_in_memory().unwrap();
        roster.record_seen(-1, &entry(3, Some("carol"), "Carol")).unwrap();
        roster.record_seen(-1, &entry(1, Some("alice"), "Alice")).unwrap();
        roster.record_seen(-1, &entry(3, Some("carol"), "Carol")).unwrap();
        roster.record_seen(-1, &entry(2, None, "Bob")).unwrap();

        let ids: Vec<i64> = roster.members(-1).unwrap().iter().map(|m| m.user_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_members_are_per_chat() {
        let roster = Roster::open_in_memory().unwrap();
        roster.record_seen(-1, &entry(1, None, "Alice")).unwrap();
        roster.record_seen(-2, &entry(2, None, "Bob")).unwrap();

        assert_eq!(roster.members(-1).unwrap().len(), 1);
        assert_eq!(roster.members(-2).unwrap()[0].user_id, 2);
        assert!(roster.members(-3).unwrap().is_empty());
    }

    #[test]
    fn test_gone_members_are_hidden_until_seen_again() {
        let roster = Roster::open_in_memory().unwrap();
        roster.record_seen(-1, &entry(1, Some("alice"), "Alice")).unwrap();
        roster.mark_gone(-1, 1, "left").unwrap();
        assert!(roster.members(-1).unwrap().is_empty());
        assert_eq!(roster.find_by_username(-1, "alice").unwrap(), None);

        roster.record_seen(-1, &entry(1, Some("alice"), "Alice")).unwrap();
        assert_eq!(roster.members(-1).unwrap().len(), 1);
    }

    #[test]
    fn test_find_by_username_ignores_case_and_at() {
        let roster = Roster::open_in_memory().unwrap();
        roster.record_seen(-1, &entry(1, Some("Alice_W"), "Alice")).unwrap();

        let found = roster.find_by_username(-1, "@ALICE_w").unwrap().unwrap();
        assert_eq!(found.user_id, 1);
        assert_eq!(found.handle(), "Alice_W");
        assert_eq!(roster.find_by_username(-1, "bob").unwrap(), None);
    }

    #[test]
    fn test_members_keep_username_case() {
        let roster = Roster::open_in_memory().unwrap();
        roster.record_seen(-1, &entry(1, Some("Alice_W"), "Alice")).unwrap();

        let members = roster.members(-1).unwrap();
        assert_eq!(members[0].handle(), "Alice_W");
    }

    #[test]
    fn test_handle_prefers_username() {
        assert_eq!(entry(1, Some("alice"), "Alice").handle(), "alice");
        assert_eq!(entry(2, None, "Bob").handle(), "Bob");
    }

    #[test]
    fn test_open_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.db");
        {
            let roster = Roster::open(&path).unwrap();
            roster.record_seen(-5, &entry(9, Some("zed"), "Zed")).unwrap();
        }
        let roster = Roster::open(&path).unwrap();
        assert_eq!(roster.members(-5).unwrap()[0].username.as_deref(), Some("zed"));
    }
}
