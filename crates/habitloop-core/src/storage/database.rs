//! SQLite-backed local document store.
//!
//! Provides persistent storage for:
//! - Accepted check-ins (one per challenge and day)
//! - Reflection notes
//! - Milestones already celebrated
//!
//! It implements the collaborator traits, so the CLI (or an offline build of
//! the app) can run the whole check-in flow without a remote service.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::data_dir;
use crate::error::{DatabaseError, RemoteError, Result};
use crate::remote::{CheckInRecord, CheckInSubmitter, MilestoneStore, NoteRecord};

/// SQLite database for check-in storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/habitloop.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("habitloop.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests and dry runs).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS checkins (
                    id            INTEGER PRIMARY KEY AUTOINCREMENT,
                    challenge_id  TEXT NOT NULL,
                    day_number    INTEGER NOT NULL,
                    duration_secs INTEGER,
                    checked_in_at TEXT NOT NULL,
                    UNIQUE (challenge_id, day_number)
                );

                CREATE TABLE IF NOT EXISTS notes (
                    id           INTEGER PRIMARY KEY AUTOINCREMENT,
                    challenge_id TEXT NOT NULL,
                    day_number   INTEGER NOT NULL,
                    text         TEXT NOT NULL,
                    created_at   TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS milestones_seen (
                    challenge_id TEXT NOT NULL,
                    day_number   INTEGER NOT NULL,
                    seen_at      TEXT NOT NULL,
                    PRIMARY KEY (challenge_id, day_number)
                );

                CREATE INDEX IF NOT EXISTS idx_notes_challenge ON notes(challenge_id, day_number);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Record a check-in. A second check-in for the same day is rejected.
    pub fn record_check_in(
        &self,
        challenge_id: &str,
        day: u32,
        duration_secs: Option<u64>,
        checked_in_at: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        let duration = duration_secs
            .map(i64::try_from)
            .transpose()
            .map_err(|_| {
                DatabaseError::QueryFailed(format!("duration out of range: {duration_secs:?}"))
            })?;
        self.conn.execute(
            "INSERT INTO checkins (challenge_id, day_number, duration_secs, checked_in_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                challenge_id,
                day,
                duration,
                checked_in_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Check-ins for a challenge, ordered by day.
    pub fn check_ins(&self, challenge_id: &str) -> Result<Vec<CheckInRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT challenge_id, day_number, duration_secs, checked_in_at
             FROM checkins
             WHERE challenge_id = ?1
             ORDER BY day_number",
        )?;
        let rows = stmt.query_map(params![challenge_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (challenge_id, day, duration, at) = row?;
            records.push(CheckInRecord {
                challenge_id,
                day,
                duration_secs: duration.and_then(|s| u64::try_from(s).ok()),
                checked_in_at: parse_timestamp(&at)?,
            });
        }
        Ok(records)
    }

    pub fn record_note(
        &self,
        challenge_id: &str,
        day: u32,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO notes (challenge_id, day_number, text, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![challenge_id, day, text, created_at.to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn notes(&self, challenge_id: &str) -> Result<Vec<NoteRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT challenge_id, day_number, text, created_at
             FROM notes
             WHERE challenge_id = ?1
             ORDER BY day_number, id",
        )?;
        let rows = stmt.query_map(params![challenge_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut notes = Vec::new();
        for row in rows {
            let (challenge_id, day, text, at) = row?;
            notes.push(NoteRecord {
                challenge_id,
                day,
                text,
                created_at: parse_timestamp(&at)?,
            });
        }
        Ok(notes)
    }

    /// Idempotent: marking an already seen day keeps the original timestamp.
    pub fn mark_milestone_seen(
        &self,
        challenge_id: &str,
        day: u32,
        seen_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO milestones_seen (challenge_id, day_number, seen_at)
             VALUES (?1, ?2, ?3)",
            params![challenge_id, day, seen_at.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn seen_milestones(&self, challenge_id: &str) -> Result<BTreeSet<u32>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT day_number FROM milestones_seen WHERE challenge_id = ?1")?;
        let rows = stmt.query_map(params![challenge_id], |row| row.get::<_, u32>(0))?;
        let mut days = BTreeSet::new();
        for day in rows {
            days.insert(day?);
        }
        Ok(days)
    }

    /// Forget celebrated milestones for a challenge. Returns rows removed.
    pub fn reset_milestones(&self, challenge_id: &str) -> Result<usize, DatabaseError> {
        Ok(self.conn.execute(
            "DELETE FROM milestones_seen WHERE challenge_id = ?1",
            params![challenge_id],
        )?)
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::QueryFailed(format!("bad timestamp '{raw}': {e}")))
}

impl CheckInSubmitter for Database {
    async fn submit_check_in(
        &self,
        challenge_id: &str,
        day: u32,
        duration_secs: Option<u64>,
    ) -> Result<(), RemoteError> {
        self.record_check_in(challenge_id, day, duration_secs, Utc::now())
            .map(|_| ())
            .map_err(|e| RemoteError::new("submit_check_in", e.to_string()))
    }

    async fn save_note(&self, challenge_id: &str, day: u32, text: &str) -> Result<(), RemoteError> {
        self.record_note(challenge_id, day, text, Utc::now())
            .map(|_| ())
            .map_err(|e| RemoteError::new("save_note", e.to_string()))
    }
}

impl MilestoneStore for Database {
    async fn fetch_seen_milestones(&self, challenge_id: &str) -> Result<BTreeSet<u32>, RemoteError> {
        self.seen_milestones(challenge_id)
            .map_err(|e| RemoteError::new("fetch_seen_milestones", e.to_string()))
    }

    async fn record_milestone_seen(&self, challenge_id: &str, day: u32) -> Result<(), RemoteError> {
        self.mark_milestone_seen(challenge_id, day, Utc::now())
            .map_err(|e| RemoteError::new("record_milestone_seen", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_in_roundtrip_and_duplicate() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        db.record_check_in("yoga", 2, Some(600), now).unwrap();
        db.record_check_in("yoga", 1, None, now).unwrap();

        let err = db.record_check_in("yoga", 2, None, now).unwrap_err();
        assert!(matches!(err, DatabaseError::Duplicate(_)));

        let records = db.check_ins("yoga").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].day, 1);
        assert_eq!(records[1].duration_secs, Some(600));
    }

    #[test]
    fn milestones_are_idempotent_and_resettable() {
        let db = Database::open_memory().unwrap();
        db.mark_milestone_seen("yoga", 7, Utc::now()).unwrap();
        db.mark_milestone_seen("yoga", 7, Utc::now()).unwrap();
        db.mark_milestone_seen("yoga", 3, Utc::now()).unwrap();
        assert_eq!(db.seen_milestones("yoga").unwrap(), BTreeSet::from([3, 7]));
        assert!(db.seen_milestones("piano").unwrap().is_empty());

        assert_eq!(db.reset_milestones("yoga").unwrap(), 2);
        assert!(db.seen_milestones("yoga").unwrap().is_empty());
    }

    #[test]
    fn notes_are_listed_by_day() {
        let db = Database::open_memory().unwrap();
        db.record_note("yoga", 4, "stiff back", Utc::now()).unwrap();
        db.record_note("yoga", 2, "easy", Utc::now()).unwrap();
        let notes = db.notes("yoga").unwrap();
        assert_eq!(notes[0].text, "easy");
        assert_eq!(notes[1].day, 4);
    }

    #[test]
    fn oversized_duration_is_refused() {
        let db = Database::open_memory().unwrap();
        let err = db
            .record_check_in("yoga", 1, Some(u64::MAX), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DatabaseError::QueryFailed(_)));
        assert!(db.check_ins("yoga").unwrap().is_empty());
    }

    #[test]
    fn open_at_creates_schema_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("habitloop.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.record_check_in("yoga", 1, None, Utc::now()).unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.check_ins("yoga").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn trait_impls_report_remote_errors() {
        let db = Database::open_memory().unwrap();
        db.submit_check_in("yoga", 1, None).await.unwrap();
        let err = db.submit_check_in("yoga", 1, None).await.unwrap_err();
        assert_eq!(err.operation, "submit_check_in");

        db.record_milestone_seen("yoga", 3).await.unwrap();
        assert_eq!(
            db.fetch_seen_milestones("yoga").await.unwrap(),
            BTreeSet::from([3])
        );
    }
}
