//! # Client Optimistic Sync Controller
//!
//! The per-session logic behind the like and vote buttons.
//!
//! Every click walks `Idle -> Pending -> Confirmed | Failed`:
//!
//! - **begin**: refused while the session's flag for the counter is set or a
//!   call for it is already in flight. Otherwise the displayed count goes up
//!   by one at once and the control is disabled
//! - **send**: the confirming call, retried with exponential backoff while the
//!   error is transient
//! - **settle**: on success the flag is persisted and the display adopts the
//!   server's numbers. On failure the display drops back by the delta, the
//!   control is enabled again and a message is left for the UI
//!
//! Flags are per browser. Two tabs, or two browsers of one person, can each
//! count once.
use std::collections::{BTreeMap, HashMap};

use sheet::{ArticleRecord, CounterKey, PollOption, RetryPolicy, payloads::VotesResponse};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::{api::CounterApi, error::SyncError, flags::FlagStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    Pending,
    Confirmed,
    Failed,
}

/// An optimistic change waiting for the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryableMutation {
    pub key: CounterKey,
    pub delta: u64,
    pub attempt_count: u32,
    pub last_error: Option<String>,
}

/// What the server answered for a confirmed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Likes(u64),
    Votes(VotesResponse),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Already acted on, or a call is still in flight. Nothing was sent.
    Ignored,
    /// Count shown after adopting the server's answer.
    Confirmed(u64),
    /// Display rolled back. The message is also kept for [SyncController::take_message].
    Failed(String),
}

pub struct SyncController<A, F> {
    api: A,
    flags: F,
    retry: RetryPolicy,
    displayed: HashMap<CounterKey, u64>,
    states: HashMap<CounterKey, SyncState>,
    message: Option<String>,
}

impl<A: CounterApi, F: FlagStore> SyncController<A, F> {
    pub fn new(api: A, flags: F, retry: RetryPolicy) -> Self {
        Self {
            api,
            flags,
            retry,
            displayed: HashMap::new(),
            states: HashMap::new(),
            message: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Counts in flight keep their optimistic value.
    fn show(&mut self, key: CounterKey, count: u64) {
        if self.state(key) != SyncState::Pending {
            self.displayed.insert(key, count);
        }
    }

    pub fn seed_articles(&mut self, articles: &[ArticleRecord]) {
        for article in articles {
            self.show(article.key(), article.like_count);
        }
    }

    pub fn seed_tally(&mut self, votes: &VotesResponse) {
        for option in PollOption::ALL {
            self.show(CounterKey::Poll(option), votes.count(option));
        }
    }

    /// Fetches the feed and tally and shows their counts. An error means the
    /// UI should offer a retry instead of content.
    pub async fn load(&mut self) -> Result<Vec<ArticleRecord>, SyncError> {
        let articles = self.api.articles().await?;
        let votes = self.api.votes().await?;

        self.seed_articles(&articles);
        self.seed_tally(&votes);

        Ok(articles)
    }

    pub fn displayed(&self, key: CounterKey) -> u64 {
        self.displayed.get(&key).copied().unwrap_or(0)
    }

    pub fn state(&self, key: CounterKey) -> SyncState {
        self.states.get(&key).copied().unwrap_or_default()
    }

    fn in_flight(&self, flag: &str) -> bool {
        self.states
            .iter()
            .any(|(key, state)| *state == SyncState::Pending && key.action_flag() == flag)
    }

    /// Whether the control for `key` accepts a click.
    pub fn is_enabled(&self, key: CounterKey) -> bool {
        let flag = key.action_flag();
        !self.flags.is_set(&flag) && !self.in_flight(&flag)
    }

    /// Transient message of the last failure, cleared once read.
    pub fn take_message(&mut self) -> Option<String> {
        self.message.take()
    }

    /// The optimistic step. Returns the mutation to send, or `None` when the
    /// click must be ignored.
    pub fn begin(&mut self, key: CounterKey) -> Option<RetryableMutation> {
        if !self.is_enabled(key) {
            info!("Ignoring click on {key}, already acted on or in flight");
            return None;
        }

        let mutation = RetryableMutation {
            key,
            delta: 1,
            attempt_count: 0,
            last_error: None,
        };

        *self.displayed.entry(key).or_default() += mutation.delta;
        self.states.insert(key, SyncState::Pending);

        Some(mutation)
    }

    async fn call(&self, key: CounterKey) -> Result<Confirmation, SyncError> {
        match key {
            CounterKey::Article(id) => self.api.like(id).await.map(Confirmation::Likes),
            CounterKey::Poll(option) => self.api.vote(option).await.map(Confirmation::Votes),
        }
    }

    /// Sends the mutation, retrying transient failures with backoff.
    pub async fn send(&self, mutation: &mut RetryableMutation) -> Result<Confirmation, SyncError> {
        loop {
            mutation.attempt_count += 1;

            match self.call(mutation.key).await {
                Ok(confirmation) => return Ok(confirmation),
                Err(e) if self.retry.should_retry(mutation.attempt_count, &e) => {
                    let delay = self.retry.delay(mutation.attempt_count);
                    warn!(
                        "Confirming {} failed (attempt {}/{}): {e}; retrying in {delay:?}",
                        mutation.key, mutation.attempt_count, self.retry.attempts
                    );

                    mutation.last_error = Some(e.to_string());
                    sleep(delay).await;
                }
                Err(e) => {
                    mutation.last_error = Some(e.to_string());
                    return Err(e);
                }
            }
        }
    }

    /// Applies the outcome of [SyncController::send].
    pub fn settle(
        &mut self,
        mutation: RetryableMutation,
        result: Result<Confirmation, SyncError>,
    ) -> ClickOutcome {
        let key = mutation.key;

        match result {
            Ok(confirmation) => {
                if let Err(e) = self.flags.set(&key.action_flag()) {
                    warn!("Could not remember {key} as done: {e}");
                }
                self.states.insert(key, SyncState::Confirmed);

                match confirmation {
                    Confirmation::Likes(likes) => {
                        self.displayed.insert(key, likes);
                    }
                    Confirmation::Votes(votes) => self.seed_tally(&votes),
                }

                ClickOutcome::Confirmed(self.displayed(key))
            }
            Err(e) => {
                warn!(
                    "Giving up on {key} after {} attempts: {e}",
                    mutation.attempt_count
                );

                let shown = self.displayed.entry(key).or_default();
                *shown = shown.saturating_sub(mutation.delta);
                self.states.insert(key, SyncState::Failed);

                let message = match key {
                    CounterKey::Article(_) => format!("Could not save your like: {e}"),
                    CounterKey::Poll(_) => format!("Could not save your vote: {e}"),
                };
                self.message = Some(message.clone());

                ClickOutcome::Failed(message)
            }
        }
    }

    pub async fn click(&mut self, key: CounterKey) -> ClickOutcome {
        let Some(mut mutation) = self.begin(key) else {
            return ClickOutcome::Ignored;
        };

        let result = self.send(&mut mutation).await;
        self.settle(mutation, result)
    }

    pub async fn like(&mut self, article_id: u32) -> ClickOutcome {
        self.click(CounterKey::Article(article_id)).await
    }

    pub async fn vote(&mut self, option: PollOption) -> ClickOutcome {
        self.click(CounterKey::Poll(option)).await
    }

    /// Result line of the poll as currently displayed.
    pub fn poll_summary(&self) -> String {
        let tally: BTreeMap<PollOption, u64> = PollOption::ALL
            .iter()
            .map(|option| (*option, self.displayed(CounterKey::Poll(*option))))
            .collect();

        VotesResponse::from_tally(&tally).summary()
    }
}
