use std::collections::BTreeMap;

use serde_json::Value;
use sheet::{CounterKey, Row, decode::row_key, decode_table};

use crate::models::{CredentialReport, REQUIRED_FIELDS};

/// Missing, null, empty and `false` all count as absent.
fn present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

pub fn check_credentials(account: &Value) -> CredentialReport {
    CredentialReport {
        fields: REQUIRED_FIELDS
            .iter()
            .map(|field| (*field, present(account.get(field))))
            .collect(),
        client_email: account
            .get("client_email")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Audit {
    pub articles: usize,
    pub tally: BTreeMap<String, u64>,
    pub skipped: usize,
    /// Keys found on more than one row, with their row indexes.
    pub duplicates: Vec<(CounterKey, Vec<usize>)>,
}

pub fn audit(rows: &[Row]) -> Audit {
    let table = decode_table(rows);

    let mut seen: BTreeMap<String, (CounterKey, Vec<usize>)> = BTreeMap::new();
    for (index, row) in rows.iter().enumerate().skip(1) {
        if let Some(key) = row_key(index, row) {
            seen.entry(key.to_string())
                .or_insert_with(|| (key, Vec::new()))
                .1
                .push(index);
        }
    }

    Audit {
        articles: table.articles.len(),
        tally: table
            .polls
            .iter()
            .map(|poll| (poll.option.code().to_string(), poll.count))
            .fold(BTreeMap::new(), |mut tally, (option, count)| {
                tally.entry(option).or_insert(count);
                tally
            }),
        skipped: table.skipped,
        duplicates: seen
            .into_values()
            .filter(|(_, rows)| rows.len() > 1)
            .collect(),
    }
}
