use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
};
use std::sync::Arc;

use super::{error_response, AppState};
use crate::api::models::{ReviewResponse, SubmitReviewRequest};

pub async fn submit_review(
    State(state): State<Arc<AppState>>,
    Path(review_id): Path<i64>,
    Json(request): Json<SubmitReviewRequest>,
) -> impl IntoResponse {
    match state
        .reviews
        .submit_review(review_id, request.rating, request.comment.as_deref())
    {
        Ok(review) => Json(ReviewResponse::from(review)).into_response(),
        Err(err) => error_response(err),
    }
}
