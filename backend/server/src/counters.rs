//! # Counter Service
//!
//! Process-local, authoritative view of every like and vote count.
//!
//! ## Requirements
//!
//! - Reads never touch the backing table
//! - A process sees its own increments immediately, even before the remote write lands
//! - Small dataset: a few dozen articles and one two-option poll
//!
//! ## Implementation
//!
//! - One map of [CounterKey] to count, seeded from the table at startup and
//!   whenever the feed is read (keys already cached are never overwritten)
//! - Increments of the same key are queued behind a per-key async mutex, so
//!   two requests in this process can never both write `N + 1`
//! - Nothing coordinates separate processes: each one has its own map and the
//!   table has no compare-and-swap, so a multi-instance deployment loses updates
//! - A failed remote write keeps the new count in the map and marks the key
//!   pending; [CounterService::flush_pending] rewrites it later
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    slice,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use sheet::{
    ArticleRecord, CounterKey, CounterStore, DecodedTable, PollOption, RowMatch, StoreError,
    decode::cell_count, decode_table,
};
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum CounterError {
    #[error("No row found for {0}")]
    RowNotFound(CounterKey),

    #[error("{key} is stored on more than one row ({rows:?})")]
    AmbiguousKey { key: CounterKey, rows: Vec<usize> },

    #[error("{key} is already at {count} and cannot go higher")]
    CountOverflow { key: CounterKey, count: u64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct CounterService {
    store: CounterStore,
    counts: Mutex<HashMap<CounterKey, u64>>,
    lanes: Mutex<HashMap<CounterKey, Arc<AsyncMutex<()>>>>,
    pending: Mutex<HashSet<CounterKey>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CounterService {
    pub fn new(store: CounterStore) -> Self {
        Self {
            store,
            counts: Mutex::new(HashMap::new()),
            lanes: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashSet::new()),
        }
    }

    /// Reads and decodes the whole table once, seeding the cache.
    pub async fn load_all(&self) -> Result<DecodedTable, StoreError> {
        let rows = self.store.read_table().await?;
        let table = decode_table(&rows);
        self.seed(&table);

        Ok(table)
    }

    /// Adds counts for keys this process has not seen yet.
    fn seed(&self, table: &DecodedTable) {
        let mut counts = lock(&self.counts);
        let mut seen = HashSet::new();

        let records = table
            .articles
            .iter()
            .map(|article| (article.key(), article.like_count))
            .chain(table.polls.iter().map(|poll| (poll.key(), poll.count)));

        for (key, count) in records {
            if !seen.insert(key) {
                warn!("{key} appears on more than one row, keeping the first");
                continue;
            }
            counts.entry(key).or_insert(count);
        }
    }

    pub fn get_count(&self, key: CounterKey) -> u64 {
        self.cached(key).unwrap_or(0)
    }

    fn cached(&self, key: CounterKey) -> Option<u64> {
        lock(&self.counts).get(&key).copied()
    }

    /// Counts of every known poll option.
    pub fn tally(&self) -> BTreeMap<PollOption, u64> {
        PollOption::ALL
            .iter()
            .map(|option| (*option, self.get_count(CounterKey::Poll(*option))))
            .collect()
    }

    /// Like [CounterService::tally], but reads the table first when an
    /// option has never been seeded.
    pub async fn current_tally(&self) -> Result<BTreeMap<PollOption, u64>, StoreError> {
        let unseeded = PollOption::ALL
            .iter()
            .any(|option| self.cached(CounterKey::Poll(*option)).is_none());

        if unseeded {
            self.load_all().await?;
        }

        Ok(self.tally())
    }

    /// Freshly decoded articles, like counts taken from the cache.
    pub async fn articles(&self) -> Result<Vec<ArticleRecord>, StoreError> {
        let rows = self.store.read_table().await?;
        let mut table = decode_table(&rows);
        self.seed(&table);

        let counts = lock(&self.counts);
        for article in &mut table.articles {
            if let Some(count) = counts.get(&article.key()) {
                article.like_count = *count;
            }
        }

        Ok(table.articles)
    }

    fn lane(&self, key: CounterKey) -> Arc<AsyncMutex<()>> {
        lock(&self.lanes).entry(key).or_default().clone()
    }

    async fn resolve(&self, key: CounterKey) -> Result<usize, CounterError> {
        match self.store.find_row(key).await? {
            RowMatch::Found(row) => Ok(row),
            RowMatch::NotFound => Err(CounterError::RowNotFound(key)),
            RowMatch::Ambiguous(rows) => Err(CounterError::AmbiguousKey { key, rows }),
        }
    }

    /// Adds one to `key` and returns the new count.
    ///
    /// A key missing from the table is rejected, never appended. Once the row
    /// is found the cache is updated before the remote write, and a failed
    /// write does not roll it back.
    pub async fn increment(&self, key: CounterKey) -> Result<u64, CounterError> {
        let lane = self.lane(key);
        let _turn = lane.lock().await;

        let row = self.resolve(key).await?;

        let current = match self.cached(key) {
            Some(count) => count,
            None => {
                let value = self
                    .store
                    .read_cell(row, CounterStore::count_column(key))
                    .await?;
                debug!("Seeding unseen {key} from row {row}: {value}");
                cell_count(slice::from_ref(&value), 0)
            }
        };

        let new_count = current
            .checked_add(1)
            .ok_or(CounterError::CountOverflow { key, count: current })?;
        lock(&self.counts).insert(key, new_count);

        match self.store.write_count(row, key, new_count).await {
            Ok(()) => {
                lock(&self.pending).remove(&key);
            }
            Err(e) => {
                warn!("Writing {key} = {new_count} to row {row} failed, queued for resync: {e}");
                lock(&self.pending).insert(key);
            }
        }

        Ok(new_count)
    }

    pub fn pending(&self) -> Vec<CounterKey> {
        lock(&self.pending).iter().copied().collect()
    }

    /// Rewrites the cached count of every key whose last write failed.
    /// Returns how many keys were brought back in sync.
    pub async fn flush_pending(&self) -> usize {
        let mut flushed = 0;

        for key in self.pending() {
            let lane = self.lane(key);
            let _turn = lane.lock().await;

            if !lock(&self.pending).contains(&key) {
                continue;
            }

            let count = self.get_count(key);
            let result = match self.resolve(key).await {
                Ok(row) => self
                    .store
                    .write_count(row, key, count)
                    .await
                    .map_err(CounterError::from),
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => {
                    lock(&self.pending).remove(&key);
                    info!("Resynced {key} = {count}");
                    flushed += 1;
                }
                Err(CounterError::Store(e)) => {
                    warn!("Resync of {key} failed, will retry: {e}");
                }
                Err(e) => {
                    warn!("Dropping resync of {key}: {e}");
                    lock(&self.pending).remove(&key);
                }
            }
        }

        flushed
    }
}
