// SQLite dataset store
//
// One row per dataset in `datasets`, its records in `records` ordered by
// `position`. Every write runs in a single transaction.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use ratebook_recon::model::{CanonicalRecord, ChangeAnnotation, DatasetDocument, RecordPatch};
use ratebook_recon::store::{check_revision, DatasetStore, NameFilter};
use ratebook_recon::StoreError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS datasets (
    name TEXT PRIMARY KEY,
    revision INTEGER NOT NULL,
    updated_at TEXT NOT NULL          -- RFC 3339, UTC
);

CREATE TABLE IF NOT EXISTS records (
    dataset TEXT NOT NULL REFERENCES datasets(name) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    serial_number INTEGER,
    material TEXT,
    unit TEXT NOT NULL,
    quantity REAL,
    rate REAL,
    amount REAL,
    quantity_change TEXT,
    rate_change TEXT,
    amount_change TEXT,
    PRIMARY KEY (dataset, position)
);

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Bump when the schema changes in a way old builds can't read.
pub const STORE_FORMAT_VERSION: u32 = 1;

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Backend(e.to_string()))?;
            }
        }
        let conn = Connection::open(path).map_err(db_err)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory().map_err(db_err)?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        let version: Option<String> = conn
            .query_row("SELECT value FROM meta WHERE key = 'format_version'", [], |row| row.get(0))
            .optional()
            .map_err(db_err)?;
        match version {
            None => {
                conn.execute(
                    "INSERT INTO meta (key, value) VALUES ('format_version', ?1)",
                    params![STORE_FORMAT_VERSION.to_string()],
                )
                .map_err(db_err)?;
            }
            Some(v) if v.parse::<u32>().map_or(true, |v| v > STORE_FORMAT_VERSION) => {
                return Err(StoreError::Corrupt(format!(
                    "database format version {v} is newer than supported version {STORE_FORMAT_VERSION}"
                )));
            }
            Some(_) => {}
        }

        Ok(Self { conn })
    }

    fn names(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT name FROM datasets ORDER BY name").map_err(db_err)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(names)
    }
}

fn load_document(conn: &Connection, name: &str) -> Result<Option<DatasetDocument>, StoreError> {
    let header: Option<(i64, String)> = conn
        .query_row(
            "SELECT revision, updated_at FROM datasets WHERE name = ?1",
            params![name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(db_err)?;

    let Some((revision, updated_at)) = header else {
        return Ok(None);
    };

    let timestamp = DateTime::parse_from_rfc3339(&updated_at)
        .map_err(|e| StoreError::Corrupt(format!("dataset '{name}': bad timestamp '{updated_at}': {e}")))?
        .with_timezone(&Utc);

    let mut stmt = conn
        .prepare(
            "SELECT serial_number, material, unit, quantity, rate, amount, quantity_change, rate_change, amount_change \
             FROM records WHERE dataset = ?1 ORDER BY position",
        )
        .map_err(db_err)?;

    let records = stmt
        .query_map(params![name], |row| {
            Ok(CanonicalRecord {
                serial_number: row.get(0)?,
                material: row.get(1)?,
                unit: row.get(2)?,
                quantity: row.get(3)?,
                rate: row.get(4)?,
                amount: row.get(5)?,
                change: ChangeAnnotation {
                    quantity: row.get(6)?,
                    rate: row.get(7)?,
                    amount: row.get(8)?,
                },
            })
        })
        .map_err(db_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_err)?;

    Ok(Some(DatasetDocument {
        name: name.to_string(),
        timestamp,
        revision: revision as u64,
        records,
    }))
}

fn stored_revision(tx: &Transaction<'_>, name: &str) -> Result<Option<u64>, StoreError> {
    tx.query_row("SELECT revision FROM datasets WHERE name = ?1", params![name], |row| {
        row.get::<_, i64>(0)
    })
    .optional()
    .map(|r| r.map(|v| v as u64))
    .map_err(db_err)
}

/// Replace the dataset row and all of its records.
fn write_document(tx: &Transaction<'_>, doc: &DatasetDocument) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO datasets (name, revision, updated_at) VALUES (?1, ?2, ?3) \
         ON CONFLICT(name) DO UPDATE SET revision = excluded.revision, updated_at = excluded.updated_at",
        params![doc.name, doc.revision as i64, doc.timestamp.to_rfc3339()],
    )
    .map_err(db_err)?;

    tx.execute("DELETE FROM records WHERE dataset = ?1", params![doc.name])
        .map_err(db_err)?;

    let mut stmt = tx
        .prepare(
            "INSERT INTO records (dataset, position, serial_number, material, unit, quantity, rate, amount, \
             quantity_change, rate_change, amount_change) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .map_err(db_err)?;

    for (position, rec) in doc.records.iter().enumerate() {
        stmt.execute(params![
            doc.name,
            position as i64,
            rec.serial_number,
            rec.material,
            rec.unit,
            rec.quantity,
            rec.rate,
            rec.amount,
            rec.change.quantity,
            rec.change.rate,
            rec.change.amount,
        ])
        .map_err(db_err)?;
    }

    Ok(())
}

impl DatasetStore for SqliteStore {
    fn find_by_name(&self, name: &str) -> Result<Option<DatasetDocument>, StoreError> {
        load_document(&self.conn, name)
    }

    fn upsert(&mut self, document: &DatasetDocument) -> Result<DatasetDocument, StoreError> {
        // IMMEDIATE takes the write lock before the revision read
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate).map_err(db_err)?;
        let stored = stored_revision(&tx, &document.name)?;
        // Dropping `tx` on error rolls back.
        check_revision(&document.name, stored, document.revision)?;
        write_document(&tx, document)?;
        tx.commit().map_err(db_err)?;
        Ok(document.clone())
    }

    fn find_by_search(&self, pattern: &str, case_insensitive: bool) -> Result<Vec<DatasetDocument>, StoreError> {
        let filter = NameFilter::new(pattern, case_insensitive);
        let mut out = Vec::new();
        for name in self.names()?.into_iter().filter(|n| filter.matches(n)) {
            if let Some(doc) = load_document(&self.conn, &name)? {
                out.push(doc);
            }
        }
        Ok(out)
    }

    fn delete_by_name(&mut self, name: &str) -> Result<bool, StoreError> {
        let tx = self.conn.transaction().map_err(db_err)?;
        tx.execute("DELETE FROM records WHERE dataset = ?1", params![name])
            .map_err(db_err)?;
        let removed = tx
            .execute("DELETE FROM datasets WHERE name = ?1", params![name])
            .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(removed > 0)
    }

    fn update_single_record(
        &mut self,
        name: &str,
        serial_number: i64,
        patch: &RecordPatch,
    ) -> Result<bool, StoreError> {
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate).map_err(db_err)?;
        let Some(mut doc) = load_document(&tx, name)? else {
            return Ok(false);
        };
        let Some(record) = doc.records.iter_mut().find(|r| r.serial_number == Some(serial_number)) else {
            return Ok(false);
        };
        patch.apply(record);
        doc.revision += 1;
        doc.timestamp = Utc::now();
        write_document(&tx, &doc)?;
        tx.commit().map_err(db_err)?;
        Ok(true)
    }
}
