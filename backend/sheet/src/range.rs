//! A1 notation for the ranges the table store is addressed with.
//!
//! Only the shapes this crate produces are supported: whole columns
//! (`Sheet1!A:I`), single cells (`Sheet1!I5`) and bounded blocks
//! (`Sheet1!A2:C4`). Columns and rows are 0-based in memory and rendered
//! 1-based.
use std::{fmt, str::FromStr};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("Range {0:?} has no sheet name")]
    MissingSheet(String),

    #[error("Range {0:?} has an unterminated sheet name")]
    UnterminatedSheet(String),

    #[error("Invalid cell reference {0:?}")]
    InvalidCell(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub column: usize,
    pub row: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    pub sheet: String,
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    /// Every row of the columns `first..=last`.
    pub fn columns(sheet: &str, first: usize, last: usize) -> Self {
        Self {
            sheet: sheet.to_string(),
            start: CellRef {
                column: first,
                row: None,
            },
            end: CellRef {
                column: last,
                row: None,
            },
        }
    }

    pub fn cell(sheet: &str, row: usize, column: usize) -> Self {
        let cell = CellRef {
            column,
            row: Some(row),
        };

        Self {
            sheet: sheet.to_string(),
            start: cell,
            end: cell,
        }
    }

    /// First row covered, 0 for whole-column ranges.
    pub fn first_row(&self) -> usize {
        self.start.row.unwrap_or(0)
    }

    /// Last row covered, `None` for whole-column ranges.
    pub fn last_row(&self) -> Option<usize> {
        self.end.row
    }
}

pub fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();

    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }

    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

pub fn column_index(name: &str) -> Option<usize> {
    if name.is_empty() {
        return None;
    }

    name.bytes().try_fold(0usize, |acc, b| {
        let b = b.to_ascii_uppercase();
        b.is_ascii_uppercase()
            .then(|| acc * 26 + (b - b'A') as usize + 1)
    })
    .map(|n| n - 1)
}

fn parse_cell(text: &str) -> Result<CellRef, RangeError> {
    let split = text
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(text.len());
    let (letters, digits) = text.split_at(split);

    let column = column_index(letters).ok_or_else(|| RangeError::InvalidCell(text.to_string()))?;
    let row = if digits.is_empty() {
        None
    } else {
        let number: usize = digits
            .parse()
            .map_err(|_| RangeError::InvalidCell(text.to_string()))?;
        if number == 0 {
            return Err(RangeError::InvalidCell(text.to_string()));
        }
        Some(number - 1)
    };

    Ok(CellRef { column, row })
}

impl FromStr for CellRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (sheet, cells) = if let Some(quoted) = s.strip_prefix('\'') {
            let close = quoted
                .find("'!")
                .ok_or_else(|| RangeError::UnterminatedSheet(s.to_string()))?;
            (
                quoted[..close].replace("''", "'"),
                &quoted[close + 2..],
            )
        } else {
            let (sheet, cells) = s
                .split_once('!')
                .ok_or_else(|| RangeError::MissingSheet(s.to_string()))?;
            (sheet.to_string(), cells)
        };

        if sheet.is_empty() {
            return Err(RangeError::MissingSheet(s.to_string()));
        }

        let (start, end) = match cells.split_once(':') {
            Some((start, end)) => (parse_cell(start)?, parse_cell(end)?),
            None => {
                let cell = parse_cell(cells)?;
                (cell, cell)
            }
        };

        Ok(Self { sheet, start, end })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&column_name(self.column))?;
        if let Some(row) = self.row {
            write!(f, "{}", row + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            write!(f, "{}!", self.sheet)?;
        } else {
            write!(f, "'{}'!", self.sheet.replace('\'', "''"))?;
        }

        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}
