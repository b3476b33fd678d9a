//! # TableRow Decoder
//!
//! Turns the raw 2-D cell array of the backing table into typed records.
//!
//! ## Layout
//!
//! Row 0 is a header and is never decoded. Every other row is classified by its
//! first cell:
//!
//! - starts with `article`: an article row. The digits right after the prefix
//!   (optionally after ` `, `_` or `-`) become the id, the row index otherwise
//! - `trolley` with a known option code in the second cell: a poll tally row
//! - anything else: unknown, dropped so unrelated data can share the table
//!
//! | Column | Article      | Poll   |
//! |--------|--------------|--------|
//! | A      | key          | key    |
//! | B      | url          | option |
//! | C      | (ignored)    | votes  |
//! | D      | title        |        |
//! | E      | date         |        |
//! | F      | genre        |        |
//! | G      | intro        |        |
//! | H      | full content |        |
//! | I      | likes        |        |
//!
//! Decoding never fails. Missing cells read as empty text or zero.
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::records::{ArticleRecord, CounterKey, POLL_ID, PollOption, PollTallyRecord};

pub const KEY_COLUMN: usize = 0;
pub const URL_COLUMN: usize = 1;
pub const TITLE_COLUMN: usize = 3;
pub const DATE_COLUMN: usize = 4;
pub const GENRE_COLUMN: usize = 5;
pub const INTRO_COLUMN: usize = 6;
pub const CONTENT_COLUMN: usize = 7;
pub const LIKES_COLUMN: usize = 8;

pub const OPTION_COLUMN: usize = 1;
pub const VOTES_COLUMN: usize = 2;

/// Last column any record reads.
pub const LAST_COLUMN: usize = LIKES_COLUMN;

static ARTICLE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^article[\s_-]*(\d+)?").unwrap(/* known good */));

pub type Row = Vec<Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedRow {
    Article(ArticleRecord),
    PollTally(PollTallyRecord),
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedTable {
    /// Sorted by ascending id.
    pub articles: Vec<ArticleRecord>,
    /// In table order.
    pub polls: Vec<PollTallyRecord>,
    /// Data rows that were neither articles nor poll tallies.
    pub skipped: usize,
}

/// Text of a cell, empty when the cell is missing or null.
pub fn cell_text(row: &[Value], column: usize) -> String {
    match row.get(column) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Unsigned count held by a cell, zero when missing or not a count.
pub fn cell_count(row: &[Value], column: usize) -> u64 {
    match row.get(column) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Counter key of a row, from the key columns alone.
///
/// `index` is the physical row index, used as the article id when the key
/// cell carries no ordinal.
pub fn row_key(index: usize, row: &[Value]) -> Option<CounterKey> {
    let key = cell_text(row, KEY_COLUMN);
    let key = key.trim();

    if let Some(captures) = ARTICLE_KEY.captures(key) {
        let id = captures
            .get(1)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .or_else(|| u32::try_from(index).ok())?;

        return Some(CounterKey::Article(id));
    }

    if key == POLL_ID {
        return cell_text(row, OPTION_COLUMN)
            .parse::<PollOption>()
            .ok()
            .map(CounterKey::Poll);
    }

    None
}

pub fn decode_row(index: usize, row: &[Value]) -> DecodedRow {
    match row_key(index, row) {
        Some(CounterKey::Article(id)) => DecodedRow::Article(ArticleRecord {
            id,
            title: cell_text(row, TITLE_COLUMN),
            date: cell_text(row, DATE_COLUMN).trim().to_string(),
            genre: cell_text(row, GENRE_COLUMN),
            intro: cell_text(row, INTRO_COLUMN),
            full_content: cell_text(row, CONTENT_COLUMN),
            like_count: cell_count(row, LIKES_COLUMN),
            url: cell_text(row, URL_COLUMN),
        }),
        Some(CounterKey::Poll(option)) => DecodedRow::PollTally(PollTallyRecord {
            poll_id: POLL_ID.to_string(),
            option,
            count: cell_count(row, VOTES_COLUMN),
        }),
        None => DecodedRow::Unknown,
    }
}

pub fn decode_table(rows: &[Row]) -> DecodedTable {
    let mut table = DecodedTable::default();

    for (index, row) in rows.iter().enumerate().skip(1) {
        match decode_row(index, row) {
            DecodedRow::Article(article) => table.articles.push(article),
            DecodedRow::PollTally(tally) => table.polls.push(tally),
            DecodedRow::Unknown => {
                debug!("Skipping row {index}: not an article or poll row");
                table.skipped += 1;
            }
        }
    }

    // stable, so duplicate ids keep table order
    table.articles.sort_by_key(|article| article.id);

    table
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn rows(value: Value) -> Vec<Row> {
        serde_json::from_value(value).unwrap()
    }

    fn sample() -> Vec<Row> {
        rows(json!([
            ["Key", "Url", "", "Title", "Date", "Genre", "Intro", "Content", "Likes"],
            ["article2", "", "", "Second", "2024-02-01", "Philosophy", "b", "bb", "5"],
            ["trolley", "A", "12"],
            [
                "article1", "", "", "Intro to X", "2024-01-01", "Tech", "short intro", "long body",
                "3"
            ],
            ["notes", "whatever"],
            ["trolley", "B", 4],
            ["trolley", "Z", "9"],
            []
        ]))
    }

    #[test]
    fn test_header_is_ignored() {
        let table = decode_table(&rows(json!([["article1", "", "", "Header"]])));
        assert!(table.articles.is_empty());
        assert_eq!(table.skipped, 0);
    }

    #[test]
    fn test_decode_sample() {
        let table = decode_table(&sample());

        let ids: Vec<u32> = table.articles.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2]);

        let first = &table.articles[0];
        assert_eq!(first.title, "Intro to X");
        assert_eq!(first.date, "2024-01-01");
        assert_eq!(first.genre, "Tech");
        assert_eq!(first.intro, "short intro");
        assert_eq!(first.full_content, "long body");
        assert_eq!(first.like_count, 3);

        let polls: Vec<(PollOption, u64)> =
            table.polls.iter().map(|p| (p.option, p.count)).collect();
        assert_eq!(polls, vec![(PollOption::A, 12), (PollOption::B, 4)]);

        // notes, unknown option, empty row
        assert_eq!(table.skipped, 3);
    }

    #[test]
    fn test_decode_is_idempotent() {
        let rows = sample();
        assert_eq!(decode_table(&rows), decode_table(&rows));
    }

    #[test]
    fn test_missing_cells_default() {
        let row: Row = vec![json!("article9")];
        let DecodedRow::Article(article) = decode_row(4, &row) else {
            panic!("expected an article");
        };
        assert_eq!(article.id, 9);
        assert_eq!(article.title, "");
        assert_eq!(article.like_count, 0);
    }

    #[test]
    fn test_key_without_ordinal_uses_row_index() {
        assert_eq!(
            row_key(6, &[json!("  Article ")]),
            Some(CounterKey::Article(6))
        );
        assert_eq!(
            row_key(6, &[json!("article_12")]),
            Some(CounterKey::Article(12))
        );
        assert_eq!(
            row_key(6, &[json!("articles about x")]),
            Some(CounterKey::Article(6))
        );
    }

    #[test]
    fn test_key_prefix_with_trailing_text() {
        assert_eq!(
            row_key(5, &[json!("article1 draft")]),
            Some(CounterKey::Article(1))
        );
        assert_eq!(
            row_key(5, &[json!("ARTICLE-3b")]),
            Some(CounterKey::Article(3))
        );
        assert_eq!(row_key(5, &[json!("my article2")]), None);
    }

    #[test]
    fn test_counts() {
        assert_eq!(cell_count(&[json!(" 7 ")], 0), 7);
        assert_eq!(cell_count(&[json!(7.0)], 0), 7);
        assert_eq!(cell_count(&[json!("-3")], 0), 0);
        assert_eq!(cell_count(&[json!("lots")], 0), 0);
        assert_eq!(cell_count(&[], 0), 0);
    }
}
