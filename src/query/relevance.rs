//! Score-threshold search.
//!
//! A probe request with `size = 1` and score tracking finds the best score
//! for the query; the real request is then sent with `min_score` at
//! [`RELEVANCE_RETENTION`] of it, so only the tight cluster of best matches
//! comes back.

use crate::backend::{SearchBackend, SearchRequest, SearchResponse};
use crate::error::Result;

/// Share of the maximum score a hit must reach to be kept.
pub const RELEVANCE_RETENTION: f64 = 0.9;

pub fn min_score(max_score: f64) -> f64 {
    max_score * RELEVANCE_RETENTION
}

/// The probe variant of `request`: one hit with scores tracked.
pub fn probe_request(request: &SearchRequest) -> SearchRequest {
    SearchRequest {
        from: Some(0),
        size: Some(1),
        track_scores: true,
        min_score: None,
        aggs: None,
        suggest: None,
        ..request.clone()
    }
}

/// Run `request` keeping only hits scoring at least 90% of the best one.
pub async fn search_with_threshold(
    backend: &dyn SearchBackend,
    store: &str,
    request: SearchRequest,
) -> Result<SearchResponse> {
    let probe = backend.search(store, &probe_request(&request)).await?;
    let max_score = probe.max_score();
    let threshold = min_score(max_score);
    tracing::debug!(store = %store, max_score, threshold, "Relevance threshold");

    let request = SearchRequest {
        min_score: Some(threshold),
        track_scores: true,
        ..request
    };
    backend.search(store, &request).await
}
