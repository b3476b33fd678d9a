//! # Counter API
//!
//! The calls a browser session makes against the server. [HttpApi] is the real
//! one; tests substitute their own [CounterApi].
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use sheet::{
    ArticleRecord, PollOption,
    payloads::{ErrorBody, LikeRequest, LikeResponse, VoteRequest, VotesResponse},
};
use tracing::debug;

use crate::error::SyncError;

#[async_trait]
pub trait CounterApi: Send + Sync {
    async fn articles(&self) -> Result<Vec<ArticleRecord>, SyncError>;

    /// Returns the new like count of the article.
    async fn like(&self, article_id: u32) -> Result<u64, SyncError>;

    /// Returns the whole tally after the vote.
    async fn vote(&self, option: PollOption) -> Result<VotesResponse, SyncError>;

    async fn votes(&self) -> Result<VotesResponse, SyncError>;
}

pub struct HttpApi {
    client: Client,
    base: Url,
}

impl HttpApi {
    pub fn new(base: &str, timeout: Duration) -> Result<Self, SyncError> {
        let base = Url::parse(base).map_err(|e| SyncError::InvalidUrl(format!("{base}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(SyncError::InvalidUrl(base.to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base })
    }

    fn url(&self, endpoint: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(endpoint);
        }
        url
    }
}

/// Decodes a 2xx body, or turns the server's `{ error }` body into [SyncError::Status].
async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);

    Err(SyncError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl CounterApi for HttpApi {
    async fn articles(&self) -> Result<Vec<ArticleRecord>, SyncError> {
        let url = self.url("articles");
        debug!("GET {url}");

        parse(self.client.get(url).send().await?).await
    }

    async fn like(&self, article_id: u32) -> Result<u64, SyncError> {
        let url = self.url("like");
        debug!("POST {url} article{article_id}");

        let response = self
            .client
            .post(url)
            .json(&LikeRequest { article_id })
            .send()
            .await?;

        let body: LikeResponse = parse(response).await?;
        Ok(body.likes)
    }

    async fn vote(&self, option: PollOption) -> Result<VotesResponse, SyncError> {
        let url = self.url("vote");
        debug!("POST {url} option {option}");

        let request = VoteRequest {
            option: option.code().to_string(),
        };

        parse(self.client.post(url).json(&request).send().await?).await
    }

    async fn votes(&self) -> Result<VotesResponse, SyncError> {
        let url = self.url("votes");
        debug!("GET {url}");

        parse(self.client.get(url).send().await?).await
    }
}
