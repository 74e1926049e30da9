//! Local DuckDB snapshot of the part master file.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use contractlens_core::PartRecord;
use contractlens_core::part::{PART_NUMBER_COLUMN, SUPPLIER_NAME_COLUMN, lookup_columns};
use duckdb::Connection;
use duckdb::types::Value as DuckValue;
use serde_json::{Map, Number, Value};
use tracing::info;

use crate::supplier::SUMMARY_COLUMNS;
use crate::{PartSource, PartSummary, StoreError};

/// Table the snapshot is loaded into.
pub const MASTER_FILE_TABLE: &str = "master_file";

/// DuckDB-backed master file for offline runs.
///
/// Supports both in-memory and persistent (file-backed) modes. A persistent
/// database keeps the loaded table across restarts; use
/// [`has_master_file`](Self::has_master_file) to decide whether to import.
pub struct DuckPartStore {
    conn: Mutex<Connection>,
}

impl DuckPartStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Other("duckdb connection lock poisoned".into()))
    }

    /// Load a Parquet or CSV export of the master file, replacing any previous load.
    pub fn load_master_file(&self, path: &Path) -> Result<usize, StoreError> {
        if !path.exists() {
            return Err(StoreError::MasterFileNotFound(path.to_path_buf()));
        }
        let escaped = path.display().to_string().replace('\'', "''");
        let source = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => format!("read_parquet('{escaped}')"),
            _ => format!("read_csv_auto('{escaped}', header = true)"),
        };
        let sql = format!("CREATE OR REPLACE TABLE {MASTER_FILE_TABLE} AS SELECT * FROM {source}");
        self.conn()?.execute_batch(&sql)?;
        let count = self.count()?;
        info!(count, path = %path.display(), "loaded master file snapshot");
        Ok(count)
    }

    /// Whether the master-file table exists.
    pub fn has_master_file(&self) -> bool {
        self.count().is_ok()
    }

    /// Number of rows in the master-file table.
    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT count(*) FROM {MASTER_FILE_TABLE}");
        let n: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(n as usize)
    }

    fn select_rows(
        &self,
        columns: &[String],
        where_clause: &str,
        param: &str,
    ) -> Result<Vec<Map<String, Value>>, StoreError> {
        let conn = self.conn()?;
        let select = columns
            .iter()
            .map(|c| quote(c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {select} FROM {MASTER_FILE_TABLE} WHERE {where_clause}");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([param])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut map = Map::with_capacity(columns.len());
            for (i, col) in columns.iter().enumerate() {
                let value: DuckValue = row.get(i)?;
                map.insert(col.clone(), to_json(value));
            }
            out.push(map);
        }
        Ok(out)
    }
}

#[async_trait]
impl PartSource for DuckPartStore {
    async fn fetch_record(&self, part_number: &str) -> Result<Option<PartRecord>, StoreError> {
        let where_clause = format!("{} = ?", quote(PART_NUMBER_COLUMN));
        let rows = self.select_rows(&lookup_columns(), &where_clause, part_number)?;
        match rows.first() {
            Some(row) => Ok(Some(PartRecord::from_columns(row)?)),
            None => Ok(None),
        }
    }

    async fn parts_by_supplier(&self, supplier: &str) -> Result<Vec<PartSummary>, StoreError> {
        let columns: Vec<String> = SUMMARY_COLUMNS.iter().map(|c| c.to_string()).collect();
        let where_clause = format!("{} ILIKE ?", quote(SUPPLIER_NAME_COLUMN));
        let pattern = format!("%{}%", supplier.trim());
        let rows = self.select_rows(&columns, &where_clause, &pattern)?;
        Ok(rows.iter().filter_map(PartSummary::from_columns).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.count().map(|_| ())
    }
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn to_json(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(n) => Value::from(n),
        DuckValue::SmallInt(n) => Value::from(n),
        DuckValue::Int(n) => Value::from(n),
        DuckValue::BigInt(n) => Value::from(n),
        DuckValue::UTinyInt(n) => Value::from(n),
        DuckValue::USmallInt(n) => Value::from(n),
        DuckValue::UInt(n) => Value::from(n),
        DuckValue::UBigInt(n) => Value::from(n),
        DuckValue::HugeInt(n) => Value::String(n.to_string()),
        DuckValue::Float(f) => Number::from_f64(f as f64).map_or(Value::Null, Value::Number),
        DuckValue::Double(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        DuckValue::Decimal(d) => Value::String(d.to_string()),
        DuckValue::Text(s) => Value::String(s),
        _ => Value::Null,
    }
}
