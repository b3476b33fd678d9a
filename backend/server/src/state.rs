use std::sync::Arc;

use sheet::{CounterStore, MemoryTable, SheetsProxy, TableStore};
use tracing::{info, warn};

use crate::{config::Config, counters::CounterService, error::StartupError};

pub struct AppState {
    pub config: Config,
    pub counters: CounterService,
}

impl AppState {
    /// Opens the configured table and seeds the counters from it. An
    /// unreachable table is not fatal: the server starts with an empty cache
    /// and seeds it on the first successful read.
    pub async fn new(config: Config) -> Result<Arc<Self>, StartupError> {
        let table: Arc<dyn TableStore> = match &config.table_file {
            Some(path) => {
                info!("Using local table file {}", path.display());
                Arc::new(MemoryTable::open(&config.sheet_name, path).await?)
            }
            None => {
                info!("Using sheets proxy at {}", config.sheets_api_url);
                Arc::new(SheetsProxy::new(
                    &config.sheets_api_url,
                    &config.spreadsheet_id,
                    config.sheets_token.clone(),
                    config.request_timeout,
                )?)
            }
        };

        let state = Self::with_table(config, table);

        match state.counters.load_all().await {
            Ok(table) => info!(
                "Seeded {} articles and {} poll rows ({} rows skipped)",
                table.articles.len(),
                table.polls.len(),
                table.skipped
            ),
            Err(e) => warn!("Initial table load failed, starting with an empty cache: {e}"),
        }

        Ok(state)
    }

    pub fn with_table(config: Config, table: Arc<dyn TableStore>) -> Arc<Self> {
        let store = CounterStore::new(table, &config.sheet_name, config.retry);

        Arc::new(Self {
            counters: CounterService::new(store),
            config,
        })
    }
}
