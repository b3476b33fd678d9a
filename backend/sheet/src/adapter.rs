//! # Remote Counter Store Adapter
//!
//! Owns the physical layout of the table: which range holds the records, which
//! row a [CounterKey] lives on and which column holds its count.
//!
//! Row lookup is a full linear scan of the key columns on every call. There is
//! no index to keep in sync with hand edits, and the table is small.
use std::sync::Arc;

use serde_json::Value;

use crate::{
    decode::{KEY_COLUMN, LAST_COLUMN, LIKES_COLUMN, OPTION_COLUMN, Row, VOTES_COLUMN, row_key},
    range::CellRange,
    records::CounterKey,
    retry::{RetryPolicy, retry},
    table::{StoreError, TableStore},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowMatch {
    Found(usize),
    NotFound,
    /// The key appears on more than one row.
    Ambiguous(Vec<usize>),
}

#[derive(Clone)]
pub struct CounterStore {
    table: Arc<dyn TableStore>,
    sheet: String,
    retry: RetryPolicy,
}

impl CounterStore {
    pub fn new(table: Arc<dyn TableStore>, sheet: &str, retry: RetryPolicy) -> Self {
        Self {
            table,
            sheet: sheet.to_string(),
            retry,
        }
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// Column holding the count of `key`.
    pub fn count_column(key: CounterKey) -> usize {
        match key {
            CounterKey::Article(_) => LIKES_COLUMN,
            CounterKey::Poll(_) => VOTES_COLUMN,
        }
    }

    async fn get(&self, range: &CellRange, what: &str) -> Result<Vec<Row>, StoreError> {
        retry(&self.retry, what, || self.table.get_values(range)).await
    }

    /// Every row of the record columns, header included.
    pub async fn read_table(&self) -> Result<Vec<Row>, StoreError> {
        let range = CellRange::columns(&self.sheet, KEY_COLUMN, LAST_COLUMN);
        self.get(&range, "Table read").await
    }

    pub async fn find_row(&self, key: CounterKey) -> Result<RowMatch, StoreError> {
        let range = CellRange::columns(&self.sheet, KEY_COLUMN, OPTION_COLUMN);
        let rows = self.get(&range, "Key scan").await?;

        let matches: Vec<usize> = rows
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(index, row)| row_key(*index, row) == Some(key))
            .map(|(index, _)| index)
            .collect();

        Ok(match matches.as_slice() {
            [] => RowMatch::NotFound,
            [row] => RowMatch::Found(*row),
            _ => RowMatch::Ambiguous(matches),
        })
    }

    /// Value of a single cell, [Value::Null] when the store has nothing there.
    pub async fn read_cell(&self, row: usize, column: usize) -> Result<Value, StoreError> {
        let range = CellRange::cell(&self.sheet, row, column);
        let rows = self.get(&range, "Cell read").await?;

        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .unwrap_or(Value::Null))
    }

    /// Blind single-cell overwrite. No read-modify-write guarantee.
    pub async fn write_cell(
        &self,
        row: usize,
        column: usize,
        value: Value,
    ) -> Result<(), StoreError> {
        let range = CellRange::cell(&self.sheet, row, column);

        retry(&self.retry, "Cell write", || {
            self.table.update_values(&range, vec![vec![value.clone()]])
        })
        .await
    }

    pub async fn write_count(
        &self,
        row: usize,
        key: CounterKey,
        count: u64,
    ) -> Result<(), StoreError> {
        self.write_cell(row, Self::count_column(key), Value::from(count))
            .await
    }
}
