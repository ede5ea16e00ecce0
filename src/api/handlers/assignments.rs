use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

use super::{error_response, AppState};
use crate::api::models::AssignmentResponse;
use crate::database::Assignment;
use crate::errors::MatchResult;

pub async fn confirm_assignment(
    State(state): State<Arc<AppState>>,
    Path(assignment_id): Path<i64>,
) -> impl IntoResponse {
    respond(state.assignments.confirm(assignment_id))
}

pub async fn reject_assignment(
    State(state): State<Arc<AppState>>,
    Path(assignment_id): Path<i64>,
) -> impl IntoResponse {
    respond(state.assignments.reject(assignment_id))
}

pub async fn complete_assignment(
    State(state): State<Arc<AppState>>,
    Path(assignment_id): Path<i64>,
) -> impl IntoResponse {
    respond(state.assignments.complete(assignment_id))
}

pub async fn no_show_assignment(
    State(state): State<Arc<AppState>>,
    Path(assignment_id): Path<i64>,
) -> impl IntoResponse {
    respond(state.assignments.mark_no_show(assignment_id))
}

fn respond(result: MatchResult<Assignment>) -> Response {
    match result {
        Ok(assignment) => Json(AssignmentResponse::from(assignment)).into_response(),
        Err(err) => error_response(err),
    }
}
