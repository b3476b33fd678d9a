use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::Uri,
};
use sheet::{
    ArticleRecord, CounterKey, FeedPage, FeedQuery, assemble,
    payloads::{LikeRequest, LikeResponse, VoteRequest, VotesResponse},
};
use tracing::{info, warn};

use crate::{
    error::AppError,
    state::AppState,
    utils::{get_option, get_payload},
};

pub async fn articles_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ArticleRecord>>, AppError> {
    Ok(Json(state.counters.articles().await?))
}

pub async fn feed_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<FeedQuery>, QueryRejection>,
) -> Result<Json<FeedPage>, AppError> {
    let Query(query) = query.map_err(|e| AppError::MalformedPayload(e.body_text()))?;
    let articles = state.counters.articles().await?;

    Ok(Json(assemble(&articles, &query)))
}

pub async fn like_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LikeRequest>, JsonRejection>,
) -> Result<Json<LikeResponse>, AppError> {
    let request = get_payload(payload)?;
    let key = CounterKey::Article(request.article_id);

    let likes = state.counters.increment(key).await?;
    info!("Liked {key}, now {likes}");

    Ok(Json(LikeResponse { likes }))
}

pub async fn vote_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<VotesResponse>, AppError> {
    let request = get_payload(payload)?;
    let key = CounterKey::Poll(get_option(&request.option)?);

    let votes = state.counters.increment(key).await?;
    info!("Voted {key}, now {votes}");

    // the vote already counted, so a failed read only costs the other option
    let tally = state.counters.current_tally().await.unwrap_or_else(|e| {
        warn!("Tally refresh failed after vote: {e}");
        state.counters.tally()
    });

    Ok(Json(VotesResponse::from_tally(&tally)))
}

pub async fn votes_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<VotesResponse>, AppError> {
    let tally = state.counters.current_tally().await?;
    Ok(Json(VotesResponse::from_tally(&tally)))
}

pub async fn not_found_handler(uri: Uri) -> AppError {
    warn!("No route for {uri}");
    AppError::NotFound
}
