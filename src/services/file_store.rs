use std::sync::Arc;

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{IngestMetadata, Table};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS uploaded_files (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    original_filename TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    storage_path TEXT NOT NULL,
    sheet_names TEXT NOT NULL,
    column_mapping TEXT NOT NULL,
    row_count INTEGER NOT NULL,
    data_preview TEXT NOT NULL,
    data_quality_issues TEXT NOT NULL,
    uploaded_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS data_cache (
    file_id TEXT NOT NULL REFERENCES uploaded_files(id),
    cache_key TEXT NOT NULL,
    data TEXT NOT NULL,
    PRIMARY KEY (file_id, cache_key)
);
";

/// Stored description of an upload, as returned by the file-info endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub user_id: String,
    pub original_filename: String,
    pub file_size: usize,
    pub storage_path: String,
    pub sheet_names: Vec<String>,
    pub column_mapping: Map<String, Value>,
    pub row_count: usize,
    pub data_preview: Vec<Map<String, Value>>,
    pub data_quality_issues: Vec<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn columns(&self) -> Vec<String> {
        self.column_mapping.keys().cloned().collect()
    }
}

#[derive(Debug, Clone)]
pub struct Upload<'a> {
    pub user_id: &'a str,
    pub filename: &'a str,
    pub file_size: usize,
}

/// Persists upload metadata and normalized tables in SQLite, keeping
/// recently used tables in memory.
pub struct FileStore {
    conn: Mutex<Connection>,
    tables: Cache<String, Arc<Table>>,
}

fn cache_key(file_id: &str) -> String {
    format!("full_data_{}", file_id)
}

impl FileStore {
    pub fn open(path: &str, cache_capacity: u64) -> Result<Self, AppError> {
        info!("Opening file store at {}", path);
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        debug!("File store schema ready");
        Ok(Self {
            conn: Mutex::new(conn),
            tables: Cache::new(cache_capacity),
        })
    }

    pub fn in_memory(cache_capacity: u64) -> Result<Self, AppError> {
        Self::open(":memory:", cache_capacity)
    }

    pub fn save(&self, upload: &Upload<'_>, table: Table, metadata: &IngestMetadata) -> Result<FileRecord, AppError> {
        let id = Uuid::new_v4().to_string();
        let record = FileRecord {
            id: id.clone(),
            user_id: upload.user_id.to_string(),
            original_filename: upload.filename.to_string(),
            file_size: upload.file_size,
            storage_path: format!("uploads/{}/{}", upload.user_id, upload.filename),
            sheet_names: metadata.sheet_names.clone(),
            column_mapping: metadata.column_mapping.clone(),
            row_count: metadata.row_count,
            data_preview: metadata.data_preview.clone(),
            data_quality_issues: metadata
                .data_quality_issues
                .iter()
                .map(ToString::to_string)
                .collect(),
            uploaded_at: Utc::now(),
        };
        let snapshot = serde_json::to_string(&table)?;

        {
            let mut conn = self.conn.lock();
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO uploaded_files (id, user_id, original_filename, file_size, storage_path,
                    sheet_names, column_mapping, row_count, data_preview, data_quality_issues, uploaded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.id,
                    record.user_id,
                    record.original_filename,
                    record.file_size as i64,
                    record.storage_path,
                    serde_json::to_string(&record.sheet_names)?,
                    serde_json::to_string(&record.column_mapping)?,
                    record.row_count as i64,
                    serde_json::to_string(&record.data_preview)?,
                    serde_json::to_string(&record.data_quality_issues)?,
                    record.uploaded_at.to_rfc3339(),
                ],
            )?;
            tx.execute(
                "INSERT INTO data_cache (file_id, cache_key, data) VALUES (?1, ?2, ?3)",
                params![id, cache_key(&id), snapshot],
            )?;
            tx.commit()?;
        }

        self.tables.insert(id.clone(), Arc::new(table));
        info!("Stored file {} ({} rows)", id, record.row_count);
        Ok(record)
    }

    /// Reads a table through the in-memory cache. `None` if the id is unknown.
    pub fn load_table(&self, file_id: &str) -> Result<Option<Arc<Table>>, AppError> {
        if let Some(table) = self.tables.get(file_id) {
            debug!("Table cache hit for {}", file_id);
            return Ok(Some(table));
        }

        let data: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT data FROM data_cache WHERE file_id = ?1 AND cache_key = ?2",
                params![file_id, cache_key(file_id)],
                |row| row.get(0),
            )
            .optional()?;

        match data {
            Some(data) => {
                let table = Arc::new(serde_json::from_str::<Table>(&data)?);
                self.tables.insert(file_id.to_string(), table.clone());
                debug!("Loaded table {} from database", file_id);
                Ok(Some(table))
            }
            None => Ok(None),
        }
    }

    pub fn file_record(&self, file_id: &str) -> Result<Option<FileRecord>, AppError> {
        type Row = (String, String, String, i64, String, String, String, i64, String, String, String);

        let row: Option<Row> = self
            .conn
            .lock()
            .query_row(
                "SELECT id, user_id, original_filename, file_size, storage_path, sheet_names,
                        column_mapping, row_count, data_preview, data_quality_issues, uploaded_at
                 FROM uploaded_files WHERE id = ?1",
                params![file_id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                        row.get(9)?,
                        row.get(10)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, user_id, original_filename, file_size, storage_path, sheet_names, column_mapping, row_count, data_preview, issues, uploaded_at)) = row else {
            return Ok(None);
        };

        let uploaded_at = DateTime::parse_from_rfc3339(&uploaded_at)
            .map_err(|e| AppError::Internal(format!("Corrupt upload timestamp for {}: {}", id, e)))?
            .with_timezone(&Utc);

        Ok(Some(FileRecord {
            id,
            user_id,
            original_filename,
            file_size: file_size as usize,
            storage_path,
            sheet_names: serde_json::from_str(&sheet_names)?,
            column_mapping: serde_json::from_str(&column_mapping)?,
            row_count: row_count as usize,
            data_preview: serde_json::from_str(&data_preview)?,
            data_quality_issues: serde_json::from_str(&issues)?,
            uploaded_at,
        }))
    }

    #[cfg(test)]
    fn evict(&self, file_id: &str) {
        self.tables.invalidate(file_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Column, QualityIssue};

    fn sample() -> (Table, IngestMetadata) {
        let table = Table::new(vec![
            Column::text("region", vec![Some("north".into()), Some("south".into())]),
            Column::numeric("sales", vec![Some(10.0), None]),
        ])
        .unwrap();
        let mut column_mapping = Map::new();
        column_mapping.insert("region".into(), Value::from("text"));
        column_mapping.insert("sales".into(), Value::from("numeric"));
        let metadata = IngestMetadata {
            sheet_names: vec![],
            column_mapping,
            row_count: 2,
            data_preview: vec![],
            data_quality_issues: vec![QualityIssue::DuplicateRows { count: 1 }],
        };
        (table, metadata)
    }

    fn upload() -> Upload<'static> {
        Upload {
            user_id: "user-1",
            filename: "sales.csv",
            file_size: 42,
        }
    }

    #[test]
    fn save_then_read_back_record() {
        let store = FileStore::in_memory(8).unwrap();
        let (table, metadata) = sample();
        let saved = store.save(&upload(), table, &metadata).unwrap();

        let record = store.file_record(&saved.id).unwrap().unwrap();
        assert_eq!(record, saved);
        assert_eq!(record.storage_path, "uploads/user-1/sales.csv");
        assert_eq!(record.columns(), vec!["region", "sales"]);
        assert_eq!(record.data_quality_issues, vec!["Found 1 duplicate rows"]);
    }

    #[test]
    fn table_survives_cache_eviction() {
        let store = FileStore::in_memory(8).unwrap();
        let (table, metadata) = sample();
        let saved = store.save(&upload(), table.clone(), &metadata).unwrap();

        store.evict(&saved.id);
        let loaded = store.load_table(&saved.id).unwrap().unwrap();
        assert_eq!(*loaded, table);
    }

    #[test]
    fn unknown_ids_are_none() {
        let store = FileStore::in_memory(8).unwrap();
        assert!(store.load_table("missing").unwrap().is_none());
        assert!(store.file_record("missing").unwrap().is_none());
    }
}
