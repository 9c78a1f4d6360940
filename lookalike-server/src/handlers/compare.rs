//! Comparison handler
//!
//! Handles POST /compare requests that search the catalog for an image.

use axum::{
    extract::{Multipart, State},
    Json,
};
use lookalike_core::{MatchOutcome, MatchResult, Tier};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::multipart::MultipartFields;
use crate::state::AppState;

/// Response for a comparison
#[derive(Serialize, ToSchema)]
pub struct CompareResponse {
    /// One of "exact", "similar", "partial" or "none"
    #[schema(example = "similar")]
    pub tier: String,
    #[schema(example = "Similar images found")]
    pub message: String,
    /// Perceptual hash of the submitted image
    pub query_hash: String,
    /// Matches, best first; empty when the tier is "none"
    pub results: Vec<MatchHit>,
}

/// A single matching catalog image
#[derive(Serialize, ToSchema)]
pub struct MatchHit {
    /// Where the matching image is served from
    #[schema(example = "/ourImages/cat.png")]
    pub locator: String,
    /// Similarity percentage rounded to two decimals
    #[schema(example = 84.38)]
    pub similarity: f64,
    #[schema(example = "similar")]
    pub tier: String,
    /// Present on partial matches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl From<&MatchResult> for MatchHit {
    fn from(result: &MatchResult) -> Self {
        Self {
            locator: result.locator.clone(),
            similarity: round2(result.similarity),
            tier: result.tier.as_str().to_string(),
            note: result.note.clone(),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn message_for(tier: Tier) -> &'static str {
    match tier {
        Tier::Exact => "Exact match found",
        Tier::Similar => "Similar images found",
        Tier::Partial => "Partial/cropped image match found",
        Tier::None => "No similar images found",
    }
}

impl CompareResponse {
    fn new(query_hash: String, outcome: &MatchOutcome) -> Self {
        let tier = outcome.tier();
        Self {
            tier: tier.as_str().to_string(),
            message: message_for(tier).to_string(),
            query_hash,
            results: outcome.results().iter().map(MatchHit::from).collect(),
        }
    }
}

/// Find catalog images matching an uploaded image
///
/// Accepts multipart/form-data with a single **image** field. Tiers:
/// - **exact**: an indexed image has the identical hash (single result at 100)
/// - **similar**: every indexed image at or above the similarity threshold
/// - **partial**: a crop of the submitted image matches an indexed image, or
///   the submitted image is a crop of one
/// - **none**: nothing qualified (not an error)
///
/// The submitted image is not stored.
#[utoipa::path(
    post,
    path = "/compare",
    tag = "Matching",
    request_body(
        content_type = "multipart/form-data",
        description = "Image file in the `image` field"
    ),
    responses(
        (status = 200, description = "Comparison finished (including no match)", body = CompareResponse),
        (status = 400, description = "Missing image field or unsupported Content-Type"),
        (status = 413, description = "File too large"),
        (status = 422, description = "File is not a decodable image"),
        (status = 503, description = "Catalog unavailable")
    )
)]
pub async fn compare_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CompareResponse>, ApiError> {
    let image = MultipartFields::parse(&mut multipart, state.max_file_size)
        .await?
        .require_image()?;

    let comparison = state.comparer.compare(image.data).await?;

    Ok(Json(CompareResponse::new(
        comparison.query_hash.to_string(),
        &comparison.outcome,
    )))
}
