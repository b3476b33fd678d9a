//! # Table Operations
//!
//! Operator tooling around the backing table.
//!
//! ## Commands
//! - **verify**: checks a service-account key file before it is handed to
//!   whatever mints `SHEETS_TOKEN`, and prints the account the spreadsheet has
//!   to be shared with
//! - **dump**: reads the table the same way the server does and reports what
//!   decodes, what is skipped, and which keys sit on more than one row (those
//!   make every like or vote on them fail with a conflict)
//! - **seed**: writes a sample table file for running the server with `TABLE_FILE`
//!
//! ## Notes
//! - Row indexes in reports are 0-based with the header at 0, so sheet row = index + 1
//! - Editing the table by hand while a server runs is safe for text columns,
//!   counts may be overwritten by the server's cached value on the next increment
use std::{path::Path, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use sheet::{CounterStore, RetryPolicy, TableStore, read_table_file, write_table_file};

pub mod models;
pub mod utils;

use models::{CredentialReport, sample_rows};
use utils::{Audit, audit, check_credentials};

pub async fn verify_credentials(path: &Path) -> Result<CredentialReport> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Reading service account file {}", path.display()))?;

    let account = serde_json::from_str(&raw).context("Service account file is not valid JSON")?;
    let report = check_credentials(&account);

    println!("Checking required fields of {}:\n", path.display());
    for (field, present) in &report.fields {
        let status = if *present { "Present" } else { "Missing" };
        println!("  {field}: {status}");
    }

    if report.is_complete() {
        println!("\nAll required fields are present.");
        if let Some(email) = &report.client_email {
            println!("Share the spreadsheet with: {email}");
        }
    } else {
        println!("\nMissing fields: {}", report.missing().join(", "));
    }

    Ok(report)
}

pub async fn dump(table: Arc<dyn TableStore>, sheet: &str, retry: RetryPolicy) -> Result<Audit> {
    let store = CounterStore::new(table, sheet, retry);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Reading {sheet}"));

    let rows = store.read_table().await;
    spinner.finish_and_clear();

    let rows = rows.with_context(|| format!("Reading table {sheet}"))?;
    let audit = audit(&rows);

    println!("Rows: {}", rows.len());
    println!("Articles: {}", audit.articles);
    for (option, votes) in &audit.tally {
        println!("Votes {option}: {votes}");
    }
    println!("Skipped rows: {}", audit.skipped);

    if audit.duplicates.is_empty() {
        println!("No duplicate keys.");
    } else {
        for (key, rows) in &audit.duplicates {
            println!("Duplicate key {key} on rows {rows:?}");
        }
    }

    Ok(audit)
}

/// Refuses to overwrite an existing table unless `force` is set.
pub async fn seed_table(path: &Path, force: bool) -> Result<usize> {
    if !force && tokio::fs::try_exists(path).await? {
        anyhow::bail!("{} already exists, pass --force to overwrite", path.display());
    }

    let rows = sample_rows();
    write_table_file(path, &rows)
        .await
        .with_context(|| format!("Writing {}", path.display()))?;

    let written = read_table_file(path).await?;
    println!("Wrote {} rows to {}", written.len(), path.display());

    Ok(written.len())
}

#[cfg(test)]
mod tests {
    use sheet::MemoryTable;

    use super::*;

    #[tokio::test]
    async fn test_seed_then_dump() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");

        assert_eq!(seed_table(&path, false).await.unwrap(), 6);
        assert!(seed_table(&path, false).await.is_err());
        assert_eq!(seed_table(&path, true).await.unwrap(), 6);

        let table = Arc::new(MemoryTable::open("Sheet1", &path).await.unwrap());
        let audit = dump(table, "Sheet1", RetryPolicy::none()).await.unwrap();

        assert_eq!(audit.articles, 3);
        assert!(audit.duplicates.is_empty());
    }

    #[tokio::test]
    async fn test_verify_reports_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("account.json");
        tokio::fs::write(&path, r#"{"type":"service_account","client_email":"a@b"}"#)
            .await
            .unwrap();

        let report = verify_credentials(&path).await.unwrap();
        assert!(!report.is_complete());
        assert_eq!(report.client_email.as_deref(), Some("a@b"));
    }

    #[tokio::test]
    async fn test_verify_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("account.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        assert!(verify_credentials(&path).await.is_err());
    }
}
