//! Repository pattern for pools, assignments and history
//!
//! The scheduler never touches storage itself: callers load a pool snapshot
//! and a history window through [`PostingRepository`], run the scheduler,
//! then persist the result.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Commands / HTTP handlers                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   PostingRepository                         │
//! └─────────────────────────────────────────────────────────────┘
//!                    │                         │
//!                    ▼                         ▼
//!          ┌─────────────────┐       ┌─────────────────┐
//!          │     SQLite      │       │      Mock       │
//!          │  Implementation │       │ Implementation  │
//!          └─────────────────┘       └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use rotapost::storage::{PostingRepository, SqliteRepository};
//!
//! let repo = SqliteRepository::new("data/rotapost.db")?;
//! let pools = repo.load_pools()?;
//! let history = repo.load_history(since)?;
//! ```

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{
    Actor, Assignment, AssignmentOutcome, ContentMedia, ContentText, HistoryEntry, Pools,
    StoredAssignment, Target,
};

// ============================================================================
// Core Types
// ============================================================================

/// Rows written by an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub actors: usize,
    pub targets: usize,
    pub texts: usize,
    pub media: usize,
}

impl ImportStats {
    pub fn total(&self) -> usize {
        self.actors + self.targets + self.texts + self.media
    }
}

// ============================================================================
// Repository Trait
// ============================================================================

/// Storage for pools and assignments
pub trait PostingRepository: Send + Sync {
    /// Insert or update an account, keeping its original position
    fn upsert_actor(&self, actor: &Actor) -> Result<()>;

    fn upsert_target(&self, target: &Target) -> Result<()>;

    fn upsert_text(&self, text: &ContentText) -> Result<()>;

    fn upsert_media(&self, media: &ContentMedia) -> Result<()>;

    /// Upsert every member of a pool snapshot
    fn import_pools(&self, pools: &Pools) -> Result<ImportStats> {
        for actor in &pools.actors {
            self.upsert_actor(actor)?;
        }
        for target in &pools.targets {
            self.upsert_target(target)?;
        }
        for text in &pools.texts {
            self.upsert_text(text)?;
        }
        for media in &pools.media {
            self.upsert_media(media)?;
        }

        Ok(ImportStats {
            actors: pools.actors.len(),
            targets: pools.targets.len(),
            texts: pools.texts.len(),
            media: pools.media.len(),
        })
    }

    /// Eligible pool members in insertion order
    fn load_pools(&self) -> Result<Pools>;

    /// Assignments with a recorded outcome that occurred at or after `since`
    fn load_history(&self, since: NaiveDateTime) -> Result<Vec<HistoryEntry>>;

    /// Persist freshly generated assignments as pending
    fn save_assignments(&self, assignments: &[Assignment]) -> Result<Vec<StoredAssignment>>;

    /// Set the outcome of a stored assignment; `false` if the id is unknown
    fn record_outcome(&self, id: &str, outcome: AssignmentOutcome) -> Result<bool>;

    fn get_assignment(&self, id: &str) -> Result<Option<StoredAssignment>>;

    /// Stored assignments scheduled on `day`, in time order
    fn list_assignments(&self, day: NaiveDate) -> Result<Vec<StoredAssignment>>;

    /// Drop still-pending assignments of `day` before it is planned again
    fn discard_pending(&self, day: NaiveDate) -> Result<usize>;

    /// Swap the pending assignments of `days` for `assignments` in one step
    ///
    /// Either both the removal and the insert happen or neither does.
    fn replace_pending(
        &self,
        days: &[NaiveDate],
        assignments: &[Assignment],
    ) -> Result<Vec<StoredAssignment>>;
}

fn day_bounds(day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = day.and_time(NaiveTime::MIN);
    let end = day
        .succ_opt()
        .map(|d| d.and_time(NaiveTime::MIN))
        .unwrap_or(NaiveDateTime::MAX);
    (start, end)
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of PostingRepository
///
/// Uses `Mutex` to ensure thread-safety for the SQLite connection.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Open (or create) a database file
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.create_schema()?;

        tracing::info!(path = %path.display(), "SQLite repository initialized");
        Ok(repo)
    }

    /// Create in-memory repository (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.create_schema()?;
        Ok(repo)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::other("SQLite connection mutex poisoned"))
    }

    fn create_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS actors (
                    id TEXT PRIMARY KEY,
                    display_name TEXT NOT NULL,
                    is_eligible INTEGER NOT NULL DEFAULT 1
                );

                CREATE TABLE IF NOT EXISTS targets (
                    id TEXT PRIMARY KEY,
                    display_name TEXT NOT NULL,
                    audience_size INTEGER NOT NULL DEFAULT 0,
                    is_eligible INTEGER NOT NULL DEFAULT 1,
                    linked_actor_id TEXT
                );

                CREATE TABLE IF NOT EXISTS texts (
                    id TEXT PRIMARY KEY,
                    body TEXT NOT NULL,
                    is_eligible INTEGER NOT NULL DEFAULT 1
                );

                CREATE TABLE IF NOT EXISTS media (
                    id TEXT PRIMARY KEY,
                    reference TEXT NOT NULL,
                    is_eligible INTEGER NOT NULL DEFAULT 1
                );

                CREATE TABLE IF NOT EXISTS assignments (
                    id TEXT PRIMARY KEY,
                    actor_id TEXT NOT NULL,
                    target_id TEXT NOT NULL,
                    text_id TEXT NOT NULL,
                    media_id TEXT,
                    scheduled_time TEXT NOT NULL,
                    sequence_number INTEGER NOT NULL,
                    outcome TEXT NOT NULL DEFAULT 'pending',
                    recorded_at TEXT
                );

                CREATE INDEX IF NOT EXISTS idx_assignments_scheduled
                    ON assignments(scheduled_time);

                CREATE INDEX IF NOT EXISTS idx_assignments_outcome
                    ON assignments(outcome);
                "#,
        )?;

        Ok(())
    }

    fn row_to_stored(row: &Row<'_>) -> rusqlite::Result<StoredAssignment> {
        let outcome: String = row.get(7)?;
        Ok(StoredAssignment {
            id: row.get(0)?,
            assignment: Assignment {
                actor_id: row.get(1)?,
                target_id: row.get(2)?,
                text_id: row.get(3)?,
                media_id: row.get(4)?,
                scheduled_time: row.get(5)?,
                sequence_number: row.get(6)?,
            },
            outcome: outcome.parse().unwrap_or(AssignmentOutcome::Pending),
            recorded_at: row.get(8)?,
        })
    }

    fn insert_assignments(
        conn: &Connection,
        assignments: &[Assignment],
    ) -> Result<Vec<StoredAssignment>> {
        let mut stmt = conn.prepare(&format!(
            "INSERT INTO assignments ({ASSIGNMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        ))?;

        let mut stored = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let record = StoredAssignment::new(assignment.clone());
            let a = &record.assignment;
            stmt.execute(params![
                record.id,
                a.actor_id,
                a.target_id,
                a.text_id,
                a.media_id,
                a.scheduled_time,
                a.sequence_number,
                record.outcome.as_str(),
                record.recorded_at,
            ])?;
            stored.push(record);
        }
        Ok(stored)
    }

    fn delete_pending(conn: &Connection, day: NaiveDate) -> Result<usize> {
        let (start, end) = day_bounds(day);
        let removed = conn.execute(
            "DELETE FROM assignments
             WHERE outcome = 'pending' AND scheduled_time >= ?1 AND scheduled_time < ?2",
            params![start, end],
        )?;
        Ok(removed)
    }
}

const ASSIGNMENT_COLUMNS: &str = "id, actor_id, target_id, text_id, media_id, scheduled_time, \
     sequence_number, outcome, recorded_at";

impl PostingRepository for SqliteRepository {
    fn upsert_actor(&self, actor: &Actor) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
                INSERT INTO actors (id, display_name, is_eligible)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(id) DO UPDATE SET
                    display_name = excluded.display_name,
                    is_eligible = excluded.is_eligible
                "#,
            params![actor.id, actor.display_name, actor.is_eligible],
        )?;
        Ok(())
    }

    fn upsert_target(&self, target: &Target) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
                INSERT INTO targets (id, display_name, audience_size, is_eligible, linked_actor_id)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    display_name = excluded.display_name,
                    audience_size = excluded.audience_size,
                    is_eligible = excluded.is_eligible,
                    linked_actor_id = excluded.linked_actor_id
                "#,
            params![
                target.id,
                target.display_name,
                target.audience_size as i64,
                target.is_eligible,
                target.linked_actor_id
            ],
        )?;
        Ok(())
    }

    fn upsert_text(&self, text: &ContentText) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
                INSERT INTO texts (id, body, is_eligible)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(id) DO UPDATE SET
                    body = excluded.body,
                    is_eligible = excluded.is_eligible
                "#,
            params![text.id, text.body, text.is_eligible],
        )?;
        Ok(())
    }

    fn upsert_media(&self, media: &ContentMedia) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
                INSERT INTO media (id, reference, is_eligible)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(id) DO UPDATE SET
                    reference = excluded.reference,
                    is_eligible = excluded.is_eligible
                "#,
            params![media.id, media.reference, media.is_eligible],
        )?;
        Ok(())
    }

    fn load_pools(&self) -> Result<Pools> {
        let conn = self.conn()?;

        let actors = conn
            .prepare("SELECT id, display_name FROM actors WHERE is_eligible = 1 ORDER BY rowid")?
            .query_map([], |row| Ok(Actor::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let targets = conn
            .prepare(
                "SELECT id, display_name, audience_size, linked_actor_id
                 FROM targets WHERE is_eligible = 1 ORDER BY rowid",
            )?
            .query_map([], |row| {
                let mut target = Target::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?.max(0) as u64,
                );
                target.linked_actor_id = row.get(3)?;
                Ok(target)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let texts = conn
            .prepare("SELECT id, body FROM texts WHERE is_eligible = 1 ORDER BY rowid")?
            .query_map([], |row| {
                Ok(ContentText::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let media = conn
            .prepare("SELECT id, reference FROM media WHERE is_eligible = 1 ORDER BY rowid")?
            .query_map([], |row| {
                Ok(ContentMedia::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        tracing::debug!(
            actors = actors.len(),
            targets = targets.len(),
            texts = texts.len(),
            media = media.len(),
            "Pools loaded"
        );

        Ok(Pools {
            actors,
            targets,
            texts,
            media,
        })
    }

    fn load_history(&self, since: NaiveDateTime) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments
             WHERE outcome != 'pending' AND COALESCE(recorded_at, scheduled_time) >= ?1
             ORDER BY scheduled_time, sequence_number"
        );

        let history = conn
            .prepare(&query)?
            .query_map(params![since], Self::row_to_stored)?
            .map(|r| r.map(|stored| stored.to_history()))
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(history)
    }

    fn save_assignments(&self, assignments: &[Assignment]) -> Result<Vec<StoredAssignment>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let stored = Self::insert_assignments(&tx, assignments)?;
        tx.commit()?;

        tracing::info!(count = stored.len(), "Assignments saved");
        Ok(stored)
    }

    fn record_outcome(&self, id: &str, outcome: AssignmentOutcome) -> Result<bool> {
        let conn = self.conn()?;
        let now = Local::now().naive_local();
        let updated = conn.execute(
            "UPDATE assignments SET outcome = ?1, recorded_at = ?2 WHERE id = ?3",
            params![outcome.as_str(), now, id],
        )?;
        Ok(updated > 0)
    }

    fn get_assignment(&self, id: &str) -> Result<Option<StoredAssignment>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = ?1"),
                params![id],
                Self::row_to_stored,
            )
            .optional()?;
        Ok(record)
    }

    fn list_assignments(&self, day: NaiveDate) -> Result<Vec<StoredAssignment>> {
        let conn = self.conn()?;
        let (start, end) = day_bounds(day);
        let query = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments
             WHERE scheduled_time >= ?1 AND scheduled_time < ?2
             ORDER BY scheduled_time, sequence_number"
        );

        let records = conn
            .prepare(&query)?
            .query_map(params![start, end], Self::row_to_stored)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn discard_pending(&self, day: NaiveDate) -> Result<usize> {
        let conn = self.conn()?;
        let removed = Self::delete_pending(&conn, day)?;
        if removed > 0 {
            tracing::info!(day = %day, removed, "Discarded pending assignments");
        }
        Ok(removed)
    }

    fn replace_pending(
        &self,
        days: &[NaiveDate],
        assignments: &[Assignment],
    ) -> Result<Vec<StoredAssignment>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut removed = 0;
        for day in days {
            removed += Self::delete_pending(&tx, *day)?;
        }
        let stored = Self::insert_assignments(&tx, assignments)?;
        tx.commit()?;

        tracing::info!(
            days = days.len(),
            removed,
            saved = stored.len(),
            "Pending assignments replaced"
        );
        Ok(stored)
    }
}

// ============================================================================
// Mock Implementation (for testing)
// ============================================================================

/// In-memory mock implementation of PostingRepository
///
/// Useful for testing without database dependencies.
#[derive(Default)]
pub struct MockRepository {
    pools: RwLock<Pools>,
    assignments: RwLock<Vec<StoredAssignment>>,
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored assignments
    pub fn len(&self) -> usize {
        self.assignments.read().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a stored assignment as-is (outcome and timestamps included)
    pub fn insert_stored(&self, record: StoredAssignment) -> Result<()> {
        self.assignments_mut()?.push(record);
        Ok(())
    }

    fn pools_mut(&self) -> Result<std::sync::RwLockWriteGuard<'_, Pools>> {
        self.pools
            .write()
            .map_err(|_| Error::other("mock pools lock poisoned"))
    }

    fn assignments_mut(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<StoredAssignment>>> {
        self.assignments
            .write()
            .map_err(|_| Error::other("mock assignments lock poisoned"))
    }

    fn assignments_ref(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<StoredAssignment>>> {
        self.assignments
            .read()
            .map_err(|_| Error::other("mock assignments lock poisoned"))
    }
}

fn upsert_by_id<T: Clone>(items: &mut Vec<T>, item: &T, id: impl Fn(&T) -> &str) {
    match items.iter_mut().find(|existing| id(existing) == id(item)) {
        Some(existing) => *existing = item.clone(),
        None => items.push(item.clone()),
    }
}

impl PostingRepository for MockRepository {
    fn upsert_actor(&self, actor: &Actor) -> Result<()> {
        upsert_by_id(&mut self.pools_mut()?.actors, actor, |a| a.id.as_str());
        Ok(())
    }

    fn upsert_target(&self, target: &Target) -> Result<()> {
        upsert_by_id(&mut self.pools_mut()?.targets, target, |t| t.id.as_str());
        Ok(())
    }

    fn upsert_text(&self, text: &ContentText) -> Result<()> {
        upsert_by_id(&mut self.pools_mut()?.texts, text, |t| t.id.as_str());
        Ok(())
    }

    fn upsert_media(&self, media: &ContentMedia) -> Result<()> {
        upsert_by_id(&mut self.pools_mut()?.media, media, |m| m.id.as_str());
        Ok(())
    }

    fn load_pools(&self) -> Result<Pools> {
        let pools = self
            .pools
            .read()
            .map_err(|_| Error::other("mock pools lock poisoned"))?;
        Ok(pools.eligible())
    }

    fn load_history(&self, since: NaiveDateTime) -> Result<Vec<HistoryEntry>> {
        let mut history: Vec<_> = self
            .assignments_ref()?
            .iter()
            .filter(|r| r.outcome != AssignmentOutcome::Pending)
            .map(StoredAssignment::to_history)
            .filter(|h| h.occurred_at >= since)
            .collect();
        history.sort_by_key(|h| h.occurred_at);
        Ok(history)
    }

    fn save_assignments(&self, assignments: &[Assignment]) -> Result<Vec<StoredAssignment>> {
        let stored: Vec<_> = assignments
            .iter()
            .cloned()
            .map(StoredAssignment::new)
            .collect();
        self.assignments_mut()?.extend(stored.iter().cloned());
        Ok(stored)
    }

    fn record_outcome(&self, id: &str, outcome: AssignmentOutcome) -> Result<bool> {
        let mut assignments = self.assignments_mut()?;
        match assignments.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.record(outcome);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn get_assignment(&self, id: &str) -> Result<Option<StoredAssignment>> {
        Ok(self.assignments_ref()?.iter().find(|r| r.id == id).cloned())
    }

    fn list_assignments(&self, day: NaiveDate) -> Result<Vec<StoredAssignment>> {
        let mut records: Vec<_> = self
            .assignments_ref()?
            .iter()
            .filter(|r| r.assignment.day() == day)
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.assignment.scheduled_time, r.assignment.sequence_number));
        Ok(records)
    }

    fn discard_pending(&self, day: NaiveDate) -> Result<usize> {
        let mut assignments = self.assignments_mut()?;
        let before = assignments.len();
        assignments
            .retain(|r| !(r.outcome == AssignmentOutcome::Pending && r.assignment.day() == day));
        Ok(before - assignments.len())
    }

    fn replace_pending(
        &self,
        days: &[NaiveDate],
        assignments: &[Assignment],
    ) -> Result<Vec<StoredAssignment>> {
        let mut records = self.assignments_mut()?;
        records.retain(|r| {
            !(r.outcome == AssignmentOutcome::Pending && days.contains(&r.assignment.day()))
        });

        let stored: Vec<_> = assignments
            .iter()
            .cloned()
            .map(StoredAssignment::new)
            .collect();
        records.extend(stored.iter().cloned());
        Ok(stored)
    }
}

// ============================================================================
// Shared Repository Types
// ============================================================================

/// Thread-safe shared repository wrapper
pub type SharedRepository = Arc<dyn PostingRepository>;

/// Create a shared SQLite repository
pub fn create_sqlite_repository(path: impl AsRef<Path>) -> Result<SharedRepository> {
    let repo = SqliteRepository::new(path)?;
    Ok(Arc::new(repo))
}

/// Create a shared mock repository
pub fn create_mock_repository() -> SharedRepository {
    Arc::new(MockRepository::new())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_repos() -> Vec<Box<dyn PostingRepository>> {
        vec![
            Box::new(SqliteRepository::in_memory().unwrap()),
            Box::new(MockRepository::new()),
        ]
    }

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn sample_pools() -> Pools {
        let mut retired = Actor::new("a3", "Retired");
        retired.is_eligible = false;
        Pools {
            actors: vec![Actor::new("a1", "One"), Actor::new("a2", "Two"), retired],
            targets: vec![
                Target::new("g1", "Big", 900).with_linked_actor("a1"),
                Target::new("g2", "Small", 100),
            ],
            texts: vec![ContentText::new("x1", "Hello")],
            media: vec![ContentMedia::new("m1", "media/1.jpg")],
        }
    }

    fn assignment(seq: u32, at: &str) -> Assignment {
        Assignment {
            actor_id: "a1".into(),
            target_id: format!("g{seq}"),
            text_id: "x1".into(),
            media_id: Some("m1".into()),
            scheduled_time: ts(at),
            sequence_number: seq,
        }
    }

    #[test]
    fn test_import_and_load_pools() {
        for repo in create_test_repos() {
            let stats = repo.import_pools(&sample_pools()).unwrap();
            assert_eq!(stats.total(), 7);

            let pools = repo.load_pools().unwrap();
            let ids: Vec<_> = pools.actors.iter().map(|a| a.id.as_str()).collect();
            assert_eq!(ids, vec!["a1", "a2"]);
            assert_eq!(pools.targets[0].linked_actor_id.as_deref(), Some("a1"));
            assert_eq!(pools.targets[0].audience_size, 900);
            assert_eq!(pools.media.len(), 1);
        }
    }

    #[test]
    fn test_upsert_keeps_position() {
        for repo in create_test_repos() {
            repo.import_pools(&sample_pools()).unwrap();
            repo.upsert_actor(&Actor::new("a1", "Renamed")).unwrap();

            let pools = repo.load_pools().unwrap();
            assert_eq!(pools.actors[0].id, "a1");
            assert_eq!(pools.actors[0].display_name, "Renamed");
        }
    }

    #[test]
    fn test_save_and_list_assignments() {
        for repo in create_test_repos() {
            let stored = repo
                .save_assignments(&[
                    assignment(2, "2024-03-04 09:20"),
                    assignment(1, "2024-03-04 09:00"),
                    assignment(3, "2024-03-05 09:00"),
                ])
                .unwrap();
            assert_eq!(stored.len(), 3);
            assert!(stored.iter().all(|s| s.outcome == AssignmentOutcome::Pending));

            let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
            let listed = repo.list_assignments(day).unwrap();
            let seqs: Vec<_> = listed.iter().map(|s| s.assignment.sequence_number).collect();
            assert_eq!(seqs, vec![1, 2]);
            assert_eq!(listed[0].assignment.media_id.as_deref(), Some("m1"));
        }
    }

    #[test]
    fn test_record_outcome_feeds_history() {
        for repo in create_test_repos() {
            let stored = repo
                .save_assignments(&[assignment(1, "2024-03-04 09:00")])
                .unwrap();

            assert!(repo.load_history(ts("2024-03-01 00:00")).unwrap().is_empty());

            assert!(repo
                .record_outcome(&stored[0].id, AssignmentOutcome::Posted)
                .unwrap());
            assert!(!repo
                .record_outcome("missing", AssignmentOutcome::Posted)
                .unwrap());

            let fetched = repo.get_assignment(&stored[0].id).unwrap().unwrap();
            assert_eq!(fetched.outcome, AssignmentOutcome::Posted);
            assert!(fetched.recorded_at.is_some());

            let history = repo.load_history(ts("2024-03-01 00:00")).unwrap();
            assert_eq!(history.len(), 1);
            assert!(history[0].outcome.is_success());
        }
    }

    #[test]
    fn test_discard_pending() {
        for repo in create_test_repos() {
            let stored = repo
                .save_assignments(&[
                    assignment(1, "2024-03-04 09:00"),
                    assignment(2, "2024-03-04 09:20"),
                ])
                .unwrap();
            repo.record_outcome(&stored[0].id, AssignmentOutcome::Failed)
                .unwrap();

            let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
            assert_eq!(repo.discard_pending(day).unwrap(), 1);
            assert_eq!(repo.list_assignments(day).unwrap().len(), 1);
        }
    }

    #[test]
    fn test_replace_pending() {
        for repo in create_test_repos() {
            let stored = repo
                .save_assignments(&[
                    assignment(1, "2024-03-04 09:00"),
                    assignment(2, "2024-03-04 09:20"),
                    assignment(1, "2024-03-05 09:00"),
                ])
                .unwrap();
            repo.record_outcome(&stored[0].id, AssignmentOutcome::Posted)
                .unwrap();

            let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
            let tuesday = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
            let replaced = repo
                .replace_pending(&[monday], &[assignment(2, "2024-03-04 10:00")])
                .unwrap();
            assert_eq!(replaced.len(), 1);

            let kept = repo.list_assignments(monday).unwrap();
            let times: Vec<_> = kept
                .iter()
                .map(|r| r.assignment.scheduled_time.format("%H:%M").to_string())
                .collect();
            assert_eq!(times, vec!["09:00", "10:00"]);
            assert_eq!(kept[0].outcome, AssignmentOutcome::Posted);

            // Days not named are untouched
            assert_eq!(repo.list_assignments(tuesday).unwrap().len(), 1);
        }
    }

    #[test]
    fn test_shared_repository_creation() {
        let repo = create_mock_repository();
        repo.import_pools(&sample_pools()).unwrap();
        assert_eq!(repo.load_pools().unwrap().targets.len(), 2);
    }

    #[test]
    fn test_sqlite_file_repository() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rotapost.db");

        {
            let repo = SqliteRepository::new(&path).unwrap();
            repo.import_pools(&sample_pools()).unwrap();
        }

        let reopened = SqliteRepository::new(&path).unwrap();
        assert_eq!(reopened.load_pools().unwrap().actors.len(), 2);
    }
}
