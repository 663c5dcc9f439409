//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Pipeline stages hand rows to store methods; they never execute SQL directly.
//!
//! Every table write replaces the run's rows inside one transaction and
//! records the row count in `table_manifest`. Loads check the manifest first,
//! so a table that was never written surfaces as `SimError::MissingTable`.

mod kpi;
mod outcome;
mod raw;

use crate::{
    error::{SimError, SimResult},
    event::StageLogEntry,
};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row, Statement};
use std::str::FromStr;

/// Tables computed from the raw layer; stale once the raw layer is rewritten.
const DERIVED_TABLES: [&str; 4] = [
    "mart_campaign_outcomes",
    "mart_kpis_campaign",
    "mart_kpis_segment",
    "mart_campaign_outcomes_light",
];

pub struct SimStore {
    conn: Connection,
}

impl SimStore {
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_raw_layer.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_outcomes.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/004_kpi_marts.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    /// Register a run, or update its seed and config when rerun.
    pub fn insert_run(&self, run_id: &str, seed: u64, version: &str, config_json: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, seed, version, config_json) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(run_id) DO UPDATE
             SET seed = excluded.seed, version = excluded.version, config_json = excluded.config_json",
            params![run_id, seed as i64, version, config_json],
        )?;
        Ok(())
    }

    pub fn run_seed(&self, run_id: &str) -> SimResult<Option<u64>> {
        let seed = self
            .conn
            .query_row(
                "SELECT seed FROM run WHERE run_id = ?1",
                params![run_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(seed.map(|s| s as u64))
    }

    // ── Stage log ──────────────────────────────────────────────

    pub fn append_stage_event(&self, entry: &StageLogEntry) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO stage_log (run_id, stage, event_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![entry.run_id, entry.stage, entry.event_type, entry.payload],
        )?;
        Ok(())
    }

    /// Drop a run's stage log ahead of a fresh full run.
    pub fn reset_stage_log(&self, run_id: &str) -> SimResult<()> {
        self.conn
            .execute("DELETE FROM stage_log WHERE run_id = ?1", params![run_id])?;
        Ok(())
    }

    pub fn stage_log(&self, run_id: &str) -> SimResult<Vec<StageLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, stage, event_type, payload
             FROM stage_log WHERE run_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id], |row| {
                Ok(StageLogEntry {
                    id: Some(row.get(0)?),
                    run_id: row.get(1)?,
                    stage: row.get(2)?,
                    event_type: row.get(3)?,
                    payload: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ── Manifest ───────────────────────────────────────────────

    /// Row count recorded for a table, or `None` if it was never written.
    pub fn table_row_count(&self, run_id: &str, table: &str) -> SimResult<Option<u64>> {
        let count = self
            .conn
            .query_row(
                "SELECT row_count FROM table_manifest WHERE run_id = ?1 AND table_name = ?2",
                params![run_id, table],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(count.map(|c| c as u64))
    }

    /// Remove a run's outcome and KPI marts, rows and manifest entries both.
    pub fn drop_derived_tables(&self, run_id: &str) -> SimResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for table in DERIVED_TABLES {
            tx.execute(&format!("DELETE FROM {table} WHERE run_id = ?1"), params![run_id])?;
            tx.execute(
                "DELETE FROM table_manifest WHERE run_id = ?1 AND table_name = ?2",
                params![run_id, table],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn require_table(&self, run_id: &str, table: &'static str) -> SimResult<()> {
        match self.table_row_count(run_id, table)? {
            Some(_) => Ok(()),
            None => Err(SimError::MissingTable {
                table,
                run_id: run_id.to_string(),
            }),
        }
    }

    /// Replace a run's rows in `table` and record the new row count.
    fn replace_rows<T>(
        &self,
        table: &'static str,
        run_id: &str,
        insert_sql: &str,
        rows: &[T],
        mut bind: impl FnMut(&mut Statement<'_>, &T) -> rusqlite::Result<usize>,
    ) -> SimResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(&format!("DELETE FROM {table} WHERE run_id = ?1"), params![run_id])?;
        {
            let mut stmt = tx.prepare(insert_sql)?;
            for row in rows {
                bind(&mut stmt, row)?;
            }
        }
        tx.execute(
            "INSERT INTO table_manifest (run_id, table_name, row_count) VALUES (?1, ?2, ?3)
             ON CONFLICT(run_id, table_name) DO UPDATE SET row_count = excluded.row_count",
            params![run_id, table, rows.len() as i64],
        )?;
        tx.commit()?;
        log::debug!("store: {table} ← {} rows for {run_id}", rows.len());
        Ok(())
    }

    /// Load a run's rows from `table` after checking it was written.
    fn load_rows<T>(
        &self,
        table: &'static str,
        run_id: &str,
        select_sql: &str,
        map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> SimResult<Vec<T>> {
        self.require_table(run_id, table)?;
        let mut stmt = self.conn.prepare(select_sql)?;
        let rows = stmt
            .query_map(params![run_id], map)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Read a categorical column stored by its label.
fn category<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = SimError>,
{
    let label: String = row.get(idx)?;
    label
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
