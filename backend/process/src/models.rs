use serde_json::{Value, json};
use sheet::Row;

/// Fields a Google service-account key must carry.
pub const REQUIRED_FIELDS: [&str; 8] = [
    "type",
    "project_id",
    "private_key_id",
    "private_key",
    "client_email",
    "client_id",
    "auth_uri",
    "token_uri",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialReport {
    pub fields: Vec<(&'static str, bool)>,
    /// Account the spreadsheet has to be shared with.
    pub client_email: Option<String>,
}

impl CredentialReport {
    pub fn is_complete(&self) -> bool {
        self.fields.iter().all(|(_, present)| *present)
    }

    pub fn missing(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|(_, present)| !present)
            .map(|(field, _)| *field)
            .collect()
    }
}

pub const HEADER: [&str; 9] = [
    "Key", "URL", "", "Title", "Date", "Genre", "Intro", "Content", "Likes",
];

/// A small table for local development.
pub fn sample_rows() -> Vec<Row> {
    let header: Row = HEADER.iter().map(|cell| Value::from(*cell)).collect();

    let articles = [
        (
            1,
            "Intro to X",
            "2024-01-01",
            "Tech",
            "short intro",
            "long body",
        ),
        (
            2,
            "Serving Kant",
            "2024-02-10",
            "Philosophy",
            "Duty, reason and dinner",
            "Categorical imperatives at the table.",
        ),
        (
            3,
            "Trolleys All the Way Down",
            "2024-03-05",
            "Philosophy",
            "Why the lever question never goes away",
            "A tour of the trolley problem.",
        ),
    ];

    let mut rows = vec![header];
    rows.extend(articles.iter().map(|(id, title, date, genre, intro, content)| {
        vec![
            json!(format!("article{id}")),
            json!(""),
            json!(""),
            json!(title),
            json!(date),
            json!(genre),
            json!(intro),
            json!(content),
            json!(0),
        ]
    }));
    rows.push(vec![json!("trolley"), json!("A"), json!(0)]);
    rows.push(vec![json!("trolley"), json!("B"), json!(0)]);

    rows
}
