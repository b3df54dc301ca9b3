//! SQLite store implementation.
//!
//! Table `zooq`, one row per declared dependency (see [`QueueRow`]). Every
//! multi-row mutation runs inside one transaction, so either all rows of a
//! logical task are committed or none are.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use tracing::{debug, info};

use super::readiness::{live_signatures, select_ready};
use super::row::{QueueRow, fan_out, group_rows};
use crate::domain::{Priority, Task, TaskSignature, UNCLAIMED, WorkerId};
use crate::error::ZooqError;
use crate::ports::TaskStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS zooq (
    position   INTEGER PRIMARY KEY AUTOINCREMENT,
    task_name  TEXT NOT NULL,
    priority   INTEGER NOT NULL,
    depends_on TEXT,
    owner      INTEGER,
    task_obj   TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS zooq_identity ON zooq (task_name, task_obj);
CREATE INDEX IF NOT EXISTS zooq_owner ON zooq (owner);
";

const SELECT_ROWS: &str =
    "SELECT position, task_name, priority, depends_on, owner, task_obj FROM zooq";

fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;",
    )
}

#[derive(Debug, Clone, Copy)]
enum RowFilter {
    All,
    Pending,
    Active,
}

impl RowFilter {
    fn clause(self) -> &'static str {
        match self {
            RowFilter::All => "",
            RowFilter::Pending => " WHERE owner IS NULL",
            RowFilter::Active => " WHERE owner IS NOT NULL",
        }
    }
}

/// SQLite-backed store. Owns its connection; one handle per writer.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and run the recovery sweep.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ZooqError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened sqlite store");
        Self::init(conn)
    }

    /// Open an existing or new database without the recovery sweep.
    ///
    /// For side clients (enqueue, inspection, manual reclaim) running next to
    /// a scheduler that owns the claims.
    pub fn attach(path: impl AsRef<Path>) -> Result<Self, ZooqError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "attached to sqlite store");
        apply_pragmas(&conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Private in-memory database (tests, dry runs).
    pub fn open_in_memory() -> Result<Self, ZooqError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, ZooqError> {
        apply_pragmas(&conn)?;
        conn.execute_batch(SCHEMA)?;
        let mut store = Self { conn };
        store.recover()?;
        Ok(store)
    }

    /// Demote every owned row back to pending with low priority.
    fn recover(&mut self) -> Result<usize, ZooqError> {
        let tx = self.write_tx()?;
        let demoted = tx.execute(
            "UPDATE zooq SET owner = NULL, priority = ?1 WHERE owner IS NOT NULL",
            params![Priority::Low.as_db()],
        )?;
        tx.commit()?;
        if demoted > 0 {
            info!(rows = demoted, "recovery sweep demoted orphaned claims");
        }
        Ok(demoted)
    }

    /// Writers take the lock up front so the read-then-delete in
    /// `pop_next` cannot interleave with another connection's write.
    fn write_tx(&mut self) -> Result<Transaction<'_>, ZooqError> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    fn tasks(&self, filter: RowFilter) -> Result<Vec<Task>, ZooqError> {
        Ok(group_rows(&load_rows(&self.conn, filter)?))
    }

    fn distinct(&self, filter: RowFilter) -> Result<usize, ZooqError> {
        let sql = format!(
            "SELECT COUNT(*) FROM (SELECT DISTINCT task_name, COALESCE(task_obj, '') FROM zooq{})",
            filter.clause()
        );
        let n: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

fn load_rows(conn: &Connection, filter: RowFilter) -> Result<Vec<QueueRow>, ZooqError> {
    let sql = format!("{SELECT_ROWS}{} ORDER BY position", filter.clause());
    let mut stmt = conn.prepare(&sql)?;
    let raw = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<i64>>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(|(position, task_name, priority, depends_on, owner, task_obj)| {
            Ok(QueueRow {
                position,
                task_name,
                priority: Priority::from_db(priority)?,
                depends_on: depends_on.map(TaskSignature::from_raw),
                owner: owner.map(WorkerId::new),
                task_obj: task_obj.unwrap_or_default(),
            })
        })
        .collect()
}

fn insert_rows(tx: &Transaction<'_>, task: &Task, owner: Option<WorkerId>) -> Result<usize, ZooqError> {
    let mut stmt = tx.prepare(
        "INSERT INTO zooq (task_name, priority, depends_on, owner, task_obj) VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    let drafts = fan_out(task, owner);
    for draft in &drafts {
        stmt.execute(params![
            draft.task_name,
            draft.priority.as_db(),
            draft.depends_on.as_ref().map(TaskSignature::as_str),
            draft.owner.map(WorkerId::get),
            draft.task_obj,
        ])?;
    }
    Ok(drafts.len())
}

/// Select the next ready task and delete every row of its identity, within `tx`.
fn take_ready(tx: &Transaction<'_>) -> Result<Option<Task>, ZooqError> {
    let live = live_signatures(&group_rows(&load_rows(tx, RowFilter::All)?));
    let pending = group_rows(&load_rows(tx, RowFilter::Pending)?);
    let Some(idx) = select_ready(&live, &pending) else {
        return Ok(None);
    };
    let Some(task) = pending.into_iter().nth(idx) else {
        return Ok(None);
    };

    let removed = tx.execute(
        "DELETE FROM zooq WHERE task_name = ?1 AND COALESCE(task_obj, '') = ?2",
        params![task.task_name, task.task_obj],
    )?;
    debug!(task = %task.signature(), rows = removed, "popped ready task");
    Ok(Some(task))
}

impl TaskStore for SqliteStore {
    fn enqueue(&mut self, task: &Task) -> Result<(), ZooqError> {
        let tx = self.write_tx()?;
        let rows = insert_rows(&tx, task, None)?;
        tx.commit()?;
        debug!(task = %task.signature(), rows, "enqueued");
        Ok(())
    }

    fn in_queue(&self, task_name: &str, task_obj: &str) -> Result<bool, ZooqError> {
        let hit = self
            .conn
            .query_row(
                "SELECT 1 FROM zooq WHERE task_name = ?1 AND COALESCE(task_obj, '') = ?2 LIMIT 1",
                params![task_name, task_obj],
                |_| Ok(()),
            )
            .optional()?;
        Ok(hit.is_some())
    }

    fn qsize(&self) -> Result<usize, ZooqError> {
        self.distinct(RowFilter::All)
    }

    fn wait_size(&self) -> Result<usize, ZooqError> {
        self.distinct(RowFilter::Pending)
    }

    fn active_len(&self) -> Result<usize, ZooqError> {
        self.distinct(RowFilter::Active)
    }

    fn pending_len(&self) -> Result<usize, ZooqError> {
        self.distinct(RowFilter::Pending)
    }

    fn get_active(&self) -> Result<Vec<Task>, ZooqError> {
        self.tasks(RowFilter::Active)
    }

    fn get_pending(&self) -> Result<Vec<Task>, ZooqError> {
        self.tasks(RowFilter::Pending)
    }

    fn rows(&self) -> Result<Vec<QueueRow>, ZooqError> {
        load_rows(&self.conn, RowFilter::All)
    }

    fn pop_next(&mut self) -> Result<Option<Task>, ZooqError> {
        let tx = self.write_tx()?;
        let task = take_ready(&tx)?;
        tx.commit()?;
        Ok(task)
    }

    fn active_next(&mut self, task: &Task) -> Result<(), ZooqError> {
        let owner = task.owner.ok_or_else(|| ZooqError::format("owner", UNCLAIMED))?;
        let tx = self.write_tx()?;
        let rows = insert_rows(&tx, task, Some(owner))?;
        tx.commit()?;
        debug!(task = %task.signature(), %owner, rows, "marked active");
        Ok(())
    }

    fn claim(&mut self, owner: WorkerId) -> Result<Option<Task>, ZooqError> {
        let tx = self.write_tx()?;
        let Some(task) = take_ready(&tx)? else {
            return Ok(None);
        };
        let task = task.with_owner(owner);
        insert_rows(&tx, &task, Some(owner))?;
        tx.commit()?;
        Ok(Some(task))
    }

    fn reclaim(&mut self, owner: WorkerId) -> Result<bool, ZooqError> {
        let tx = self.write_tx()?;
        let removed = tx.execute("DELETE FROM zooq WHERE owner = ?1", params![owner.get()])?;
        tx.commit()?;
        debug!(%owner, rows = removed, "reclaimed");
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_table() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.qsize().unwrap(), 0);
        assert!(store.rows().unwrap().is_empty());
    }

    #[test]
    fn unknown_priority_in_table_is_a_format_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO zooq (task_name, priority, task_obj) VALUES ('x', 7, '1')",
                [],
            )
            .unwrap();

        let err = store.get_pending().unwrap_err();
        assert!(matches!(err, ZooqError::Format { what: "priority", .. }));
    }

    #[test]
    fn failed_claim_insert_rolls_back_pop() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.enqueue(&Task::new("a", "1", Priority::High)).unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TRIGGER refuse_owned BEFORE INSERT ON zooq
                 WHEN NEW.owner IS NOT NULL
                 BEGIN SELECT RAISE(ABORT, 'refused'); END;",
            )
            .unwrap();

        let err = store.claim(WorkerId::new(1)).unwrap_err();
        assert!(err.is_storage());
        assert_eq!(store.wait_size().unwrap(), 1);
        assert!(store.in_queue("a", "1").unwrap());
    }

    #[test]
    fn failed_fan_out_leaves_no_rows() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TRIGGER refuse_y BEFORE INSERT ON zooq
                 WHEN NEW.depends_on = 'y-1'
                 BEGIN SELECT RAISE(ABORT, 'refused'); END;",
            )
            .unwrap();

        let task = Task::new("a", "1", Priority::Low).after("x").after("y").after("z");
        let err = store.enqueue(&task).unwrap_err();
        assert!(err.is_storage());
        assert!(store.rows().unwrap().is_empty());
        assert!(!store.in_queue("a", "1").unwrap());
    }

    #[test]
    fn null_task_obj_rows_are_popped_and_deleted() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE zooq (
                position   INTEGER PRIMARY KEY AUTOINCREMENT,
                task_name  TEXT NOT NULL,
                priority   INTEGER NOT NULL,
                depends_on TEXT,
                owner      INTEGER,
                task_obj   TEXT
            );
            INSERT INTO zooq (task_name, priority) VALUES ('legacy', 1);",
        )
        .unwrap();
        let mut store = SqliteStore::init(conn).unwrap();

        assert!(store.in_queue("legacy", "").unwrap());
        let popped = store.pop_next().unwrap().unwrap();
        assert_eq!(popped.identity(), ("legacy", ""));
        assert!(store.rows().unwrap().is_empty());
        assert_eq!(store.pop_next().unwrap(), None);
    }

    #[test]
    fn positions_are_not_reused_after_delete() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.enqueue(&Task::new("a", "1", Priority::Low)).unwrap();
        store.claim(WorkerId::new(1)).unwrap();
        store.reclaim(WorkerId::new(1)).unwrap();
        store.enqueue(&Task::new("b", "1", Priority::Low)).unwrap();

        let rows = store.rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].position, 3);
    }
}
