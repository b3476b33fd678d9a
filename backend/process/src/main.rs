use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::bail;
use clap::{Parser, Subcommand};
use sheet::{MemoryTable, RetryPolicy, SheetsProxy, TableStore};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a service-account key file for the fields the sheets API needs
    Verify { path: PathBuf },

    /// Print what the server would decode from the table
    Dump {
        #[arg(long, env = "TABLE_FILE")]
        table_file: Option<PathBuf>,

        #[arg(long, env = "SHEETS_API_URL", default_value = "https://sheets.googleapis.com")]
        sheets_api_url: String,

        #[arg(long, env = "SPREADSHEET_ID")]
        spreadsheet_id: Option<String>,

        #[arg(long, env = "SHEET_NAME", default_value = "Sheet1")]
        sheet_name: String,

        #[arg(long, env = "SHEETS_TOKEN", hide_env_values = true)]
        sheets_token: Option<String>,

        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
    },

    /// Write a sample table file for local development
    Seed {
        path: PathBuf,

        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Verify { path } => {
            let report = process::verify_credentials(&path).await?;
            if !report.is_complete() {
                bail!("{} is missing required fields", path.display());
            }
        }
        Command::Dump {
            table_file,
            sheets_api_url,
            spreadsheet_id,
            sheet_name,
            sheets_token,
            timeout_ms,
        } => {
            let table: Arc<dyn TableStore> = match (table_file, spreadsheet_id) {
                (Some(path), _) => Arc::new(MemoryTable::open(&sheet_name, path).await?),
                (None, Some(id)) => Arc::new(SheetsProxy::new(
                    &sheets_api_url,
                    &id,
                    sheets_token,
                    Duration::from_millis(timeout_ms),
                )?),
                (None, None) => bail!("Either --table-file or --spreadsheet-id is required"),
            };

            process::dump(table, &sheet_name, RetryPolicy::default()).await?;
        }
        Command::Seed { path, force } => {
            process::seed_table(&path, force).await?;
        }
    }

    Ok(())
}
