//! In-process [TableStore], used for local development (`TABLE_FILE`) and
//! tests.
use std::{
    path::PathBuf,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    decode::Row,
    range::CellRange,
    read_table_file,
    table::{StoreError, TableStore},
    write_table_file,
};

pub struct MemoryTable {
    sheet: String,
    rows: RwLock<Vec<Row>>,
    available: AtomicBool,
    writes: AtomicUsize,
    persist_to: Option<PathBuf>,
}

impl MemoryTable {
    pub fn new(sheet: &str, rows: Vec<Row>) -> Self {
        Self {
            sheet: sheet.to_string(),
            rows: RwLock::new(rows),
            available: AtomicBool::new(true),
            writes: AtomicUsize::new(0),
            persist_to: None,
        }
    }

    /// Loads the table from a JSON file and writes every update back to it.
    pub async fn open(sheet: &str, path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let rows = read_table_file(&path).await?;

        Ok(Self {
            persist_to: Some(path),
            ..Self::new(sheet, rows)
        })
    }

    /// While unavailable every call fails with [StoreError::Unavailable].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of successful `update_values` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> Vec<Row> {
        self.rows.read().await.clone()
    }

    /// Appends a row, as an external editor would.
    pub async fn push_row(&self, row: Row) {
        self.rows.write().await.push(row);
    }

    fn check(&self, range: &CellRange) -> Result<(), StoreError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }

        if range.sheet != self.sheet {
            return Err(StoreError::Status {
                status: 400,
                body: format!("Unable to parse range: {range}"),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl TableStore for MemoryTable {
    async fn get_values(&self, range: &CellRange) -> Result<Vec<Row>, StoreError> {
        self.check(range)?;

        let rows = self.rows.read().await;
        let last = range
            .last_row()
            .map_or(rows.len(), |last| (last + 1).min(rows.len()));

        let values = rows
            .get(range.first_row()..last)
            .unwrap_or_default()
            .iter()
            .map(|row| {
                row.iter()
                    .skip(range.start.column)
                    .take((range.end.column + 1).saturating_sub(range.start.column))
                    .cloned()
                    .collect()
            })
            .collect();

        Ok(values)
    }

    async fn update_values(&self, range: &CellRange, values: Vec<Row>) -> Result<(), StoreError> {
        self.check(range)?;

        // the file is written under the lock so snapshots land in write order
        let mut rows = self.rows.write().await;

        for (offset, new_row) in values.into_iter().enumerate() {
            let index = range.first_row() + offset;
            if rows.len() <= index {
                rows.resize_with(index + 1, Vec::new);
            }

            let row = &mut rows[index];
            for (column_offset, value) in new_row.into_iter().enumerate() {
                let column = range.start.column + column_offset;
                if row.len() <= column {
                    row.resize(column + 1, Value::String(String::new()));
                }
                row[column] = value;
            }
        }

        if let Some(path) = &self.persist_to {
            debug!("Persisting table to {}", path.display());
            write_table_file(path, &rows).await?;
        }

        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tokio::task::JoinSet;

    use super::*;

    fn table() -> MemoryTable {
        MemoryTable::new(
            "Sheet1",
            serde_json::from_value(json!([
                ["Key", "Url"],
                ["article1", "", "", "Title", "", "", "", "", "3"],
                ["trolley", "A"]
            ]))
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_column_slice() {
        let rows = table()
            .get_values(&"Sheet1!A:B".parse().unwrap())
            .await
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec![json!("article1"), json!("")]);
        assert_eq!(rows[2], vec![json!("trolley"), json!("A")]);
    }

    #[tokio::test]
    async fn test_write_extends_short_rows() {
        let table = table();
        table
            .update_values(&CellRange::cell("Sheet1", 2, 2), vec![vec![json!(1)]])
            .await
            .unwrap();

        let cell = table
            .get_values(&CellRange::cell("Sheet1", 2, 2))
            .await
            .unwrap();
        assert_eq!(cell, vec![vec![json!(1)]]);
        assert_eq!(table.write_count(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_and_wrong_sheet() {
        let table = table();

        assert!(matches!(
            table.get_values(&"Other!A:B".parse().unwrap()).await,
            Err(StoreError::Status { status: 400, .. })
        ));

        table.set_available(false);
        assert!(matches!(
            table.get_values(&"Sheet1!A:B".parse().unwrap()).await,
            Err(StoreError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn test_persists_updates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");
        let rows = [
            vec![json!("Key")],
            vec![json!("trolley"), json!("B"), json!("0")],
        ];
        write_table_file(&path, &rows).await.unwrap();

        let table = MemoryTable::open("Sheet1", &path).await.unwrap();
        table
            .update_values(&CellRange::cell("Sheet1", 1, 2), vec![vec![json!(1)]])
            .await
            .unwrap();

        let reloaded = read_table_file(&path).await.unwrap();
        assert_eq!(reloaded[1][2], json!(1));
    }

    #[tokio::test]
    async fn test_concurrent_updates_all_reach_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");
        let rows: Vec<Row> = (0..41).map(|_| vec![json!("")]).collect();
        write_table_file(&path, &rows).await.unwrap();

        let table = Arc::new(MemoryTable::open("Sheet1", &path).await.unwrap());

        let mut tasks = JoinSet::new();
        for row in 1..=40 {
            let table = table.clone();
            tasks.spawn(async move {
                table
                    .update_values(&CellRange::cell("Sheet1", row, 2), vec![vec![json!(row)]])
                    .await
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        let on_disk = read_table_file(&path).await.unwrap();
        assert_eq!(on_disk, table.snapshot().await);
        for row in 1..=40 {
            assert_eq!(on_disk[row][2], json!(row));
        }
    }
}
