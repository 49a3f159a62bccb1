// Record Store - SQLite persistence for bull records
// One table, one row per bull. Dates are stored as ISO text.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::bull::{Bull, BullAttributes};
use crate::error::{StoreError, StoreResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// RECORD STORE INTERFACE
// ============================================================================

/// Durable CRUD operations on bull records.
///
/// The importer only needs `create`; the web surface and CLI use the rest.
pub trait BullStore {
    /// Validate and insert a new record.
    fn create(&self, attrs: &BullAttributes) -> StoreResult<Bull>;

    /// Look up a record by id.
    fn find(&self, id: i64) -> StoreResult<Bull>;

    /// Merge the supplied attributes into an existing record.
    fn update(&self, id: i64, attrs: &BullAttributes) -> StoreResult<Bull>;

    /// Remove a record. Fails only when the id is unknown or the delete itself fails.
    fn delete(&self, id: i64) -> StoreResult<()>;

    /// All records in insertion order.
    fn all(&self) -> StoreResult<Vec<Bull>>;

    fn count(&self) -> StoreResult<i64>;
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS bulls (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            registration_code TEXT,
            name TEXT NOT NULL,
            born_on TEXT,
            offspring_count INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_bulls_registration_code ON bulls(registration_code)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// SQLITE IMPLEMENTATION
// ============================================================================

pub struct SqliteBullStore {
    conn: Connection,
}

impl SqliteBullStore {
    /// Open (or create) a database file with WAL journaling.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for crash recovery
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::debug!("Opened {} (journal_mode={})", path.display(), mode);

        Self::from_connection(conn)
    }

    /// Fresh private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> StoreResult<Self> {
        setup_database(&conn)?;
        Ok(SqliteBullStore { conn })
    }

    fn fetch(&self, id: i64) -> StoreResult<Option<Bull>> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, registration_code, name, born_on, offspring_count, created_at, updated_at
                 FROM bulls
                 WHERE id = ?1",
                [id],
                BullRow::from_row,
            )
            .optional()?;

        raw.map(BullRow::into_bull).transpose()
    }
}

impl BullStore for SqliteBullStore {
    fn create(&self, attrs: &BullAttributes) -> StoreResult<Bull> {
        attrs.validate_for_create()?;

        let now = Utc::now();
        let name = attrs.name.clone().unwrap_or_default();
        let registration_code = attrs.registration_code.clone().flatten();
        let born_on = attrs.born_on.flatten();
        let offspring_count = attrs.offspring_count.flatten();

        self.conn.execute(
            "INSERT INTO bulls (
                registration_code, name, born_on, offspring_count, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                registration_code,
                name,
                born_on.map(|d| d.format(DATE_FORMAT).to_string()),
                offspring_count,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;

        let bull = Bull {
            id: self.conn.last_insert_rowid(),
            registration_code,
            name,
            born_on,
            offspring_count,
            created_at: now,
            updated_at: now,
        };
        log::debug!("Created bull {} ({})", bull.id, bull.name);

        Ok(bull)
    }

    fn find(&self, id: i64) -> StoreResult<Bull> {
        self.fetch(id)?.ok_or(StoreError::NotFound(id))
    }

    fn update(&self, id: i64, attrs: &BullAttributes) -> StoreResult<Bull> {
        let mut bull = self.find(id)?;
        attrs.validate_for_update()?;

        bull.apply(attrs);
        bull.updated_at = Utc::now();

        self.conn.execute(
            "UPDATE bulls
             SET registration_code = ?1,
                 name = ?2,
                 born_on = ?3,
                 offspring_count = ?4,
                 updated_at = ?5
             WHERE id = ?6",
            params![
                bull.registration_code,
                bull.name,
                bull.born_on.map(|d| d.format(DATE_FORMAT).to_string()),
                bull.offspring_count,
                bull.updated_at.to_rfc3339(),
                id,
            ],
        )?;
        log::debug!("Updated bull {}", id);

        Ok(bull)
    }

    fn delete(&self, id: i64) -> StoreResult<()> {
        let deleted = self.conn.execute("DELETE FROM bulls WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(id));
        }
        log::debug!("Deleted bull {}", id);

        Ok(())
    }

    fn all(&self) -> StoreResult<Vec<Bull>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, registration_code, name, born_on, offspring_count, created_at, updated_at
             FROM bulls
             ORDER BY id",
        )?;

        let rows = stmt
            .query_map([], BullRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(BullRow::into_bull).collect()
    }

    fn count(&self) -> StoreResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM bulls", [], |row| row.get(0))?;

        Ok(count)
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

/// Raw column values, parsed into a `Bull` outside the rusqlite closure
/// so text that no longer parses surfaces as `StoreError::Corrupt`.
struct BullRow {
    id: i64,
    registration_code: Option<String>,
    name: String,
    born_on: Option<String>,
    offspring_count: Option<i64>,
    created_at: String,
    updated_at: String,
}

impl BullRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(BullRow {
            id: row.get(0)?,
            registration_code: row.get(1)?,
            name: row.get(2)?,
            born_on: row.get(3)?,
            offspring_count: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_bull(self) -> StoreResult<Bull> {
        let id = self.id;
        let corrupt = |detail: String| StoreError::Corrupt { id, detail };

        let born_on = self
            .born_on
            .map(|s| {
                NaiveDate::parse_from_str(&s, DATE_FORMAT)
                    .map_err(|e| corrupt(format!("born_on {:?}: {}", s, e)))
            })
            .transpose()?;
        let created_at = parse_timestamp(&self.created_at)
            .map_err(|e| corrupt(format!("created_at: {}", e)))?;
        let updated_at = parse_timestamp(&self.updated_at)
            .map_err(|e| corrupt(format!("updated_at: {}", e)))?;

        Ok(Bull {
            id,
            registration_code: self.registration_code,
            name: self.name,
            born_on,
            offspring_count: self.offspring_count,
            created_at,
            updated_at,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}
