//! # Sheet
//!
//! Everything shared between the server, the client controller and the
//! operator CLI: the typed records, the decoder for raw table rows, the table
//! store collaborator, the counter store adapter on top of it and the feed
//! assembler.
//!
//! ## Backing table
//!
//! One spreadsheet tab holds both article content and counters. Editors append
//! article rows by hand; this system only ever rewrites single count cells.
//! There are no transactions and no conditional writes, so two writers that
//! read the same count both write `N + 1` and one increment is lost. This is
//! accepted for like/vote counters.
use std::path::Path;

pub mod adapter;
pub mod decode;
pub mod feed;
pub mod memory;
pub mod payloads;
pub mod range;
pub mod records;
pub mod remote;
pub mod retry;
pub mod table;

pub use adapter::{CounterStore, RowMatch};
pub use decode::{DecodedTable, Row, decode_table};
pub use feed::{FeedPage, FeedQuery, SortOrder, assemble};
pub use memory::MemoryTable;
pub use range::CellRange;
pub use records::{ArticleRecord, CounterKey, POLL_ID, PollOption, PollTallyRecord, RecordKind};
pub use remote::SheetsProxy;
pub use retry::{RetryPolicy, Transient, retry};
pub use table::{StoreError, TableStore};

/// Reads a table saved as a JSON array of rows.
pub async fn read_table_file(path: impl AsRef<Path>) -> Result<Vec<Row>, StoreError> {
    let data = tokio::fs::read(path).await?;

    Ok(serde_json::from_slice(&data)?)
}

pub async fn write_table_file(path: impl AsRef<Path>, rows: &[Row]) -> Result<(), StoreError> {
    tokio::fs::write(path, serde_json::to_vec_pretty(rows)?).await?;

    Ok(())
}
