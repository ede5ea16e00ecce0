use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;

use super::{error_response, AppState, GameListParams};
use crate::api::models::{
    AssignmentResponse, CreateGameRequest, EmailSubmissionRequest, GameResponse, PaymentResponse,
};
use crate::database::{self, assignments, games, GameStatus};
use crate::errors::MatchError;
use crate::services::games::GameSubmission;

pub async fn create_game(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateGameRequest>,
) -> impl IntoResponse {
    let mut submission = GameSubmission {
        organizer_id: request.organizer_id,
        sport: request.sport,
        required_level: request.required_level,
        scheduled_at: request.scheduled_at,
        duration_minutes: request.duration_minutes.unwrap_or(90),
        venue_name: request.venue_name,
        address: request.address,
        latitude: request.latitude,
        longitude: request.longitude,
        home_team: request.home_team,
        away_team: request.away_team,
        importance: request.importance.unwrap_or(3),
        notes: request.notes,
    };
    fill_coordinates(&state, &mut submission).await;

    match state.games.create_game(submission) {
        Ok(game) => (StatusCode::CREATED, Json(GameResponse::from(game))).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn submit_game_email(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EmailSubmissionRequest>,
) -> impl IntoResponse {
    let mut submission = match state
        .games
        .parse_email_submission(&request.content, &request.from)
    {
        Ok(submission) => submission,
        Err(err) => return error_response(err),
    };
    fill_coordinates(&state, &mut submission).await;

    match state.games.create_game(submission) {
        Ok(game) => (StatusCode::CREATED, Json(GameResponse::from(game))).into_response(),
        Err(err) => error_response(err),
    }
}

/// Coordinates are optional on intake; when absent, a best-effort geocoding
/// lookup fills them in before the game is stored. Lookup failures leave
/// them empty rather than blocking the submission.
async fn fill_coordinates(state: &AppState, submission: &mut GameSubmission) {
    if submission.latitude.is_some() && submission.longitude.is_some() {
        return;
    }

    if let Some((lat, lon)) = state.geocoder.coordinates_for(&submission.address).await {
        submission.latitude = Some(lat);
        submission.longitude = Some(lon);
    }
}

pub async fn list_games(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GameListParams>,
) -> impl IntoResponse {
    let status = match params.status.as_deref() {
        Some(raw) => match GameStatus::parse(raw) {
            Some(status) => Some(status),
            None => {
                return error_response(MatchError::Validation(format!(
                    "unknown game status '{raw}'"
                )))
            }
        },
        None => None,
    };

    let conn = match database::get_connection(&state.pool) {
        Ok(conn) => conn,
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "DB Connection Error").into_response()
        }
    };

    let rows = match status {
        Some(status) => games::list_by_status(&conn, status),
        None => games::list_all(&conn),
    };

    match rows {
        Ok(rows) => {
            let body: Vec<GameResponse> = rows.into_iter().map(GameResponse::from).collect();
            Json(body).into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Query Error: {}", e),
        )
            .into_response(),
    }
}

pub async fn get_game(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<i64>,
) -> impl IntoResponse {
    let conn = match database::get_connection(&state.pool) {
        Ok(conn) => conn,
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "DB Connection Error").into_response()
        }
    };

    match games::find_by_id(&conn, game_id) {
        Ok(Some(game)) => Json(GameResponse::from(game)).into_response(),
        Ok(None) => error_response(MatchError::NotFound {
            entity: "game",
            id: game_id,
        }),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Query Error: {}", e),
        )
            .into_response(),
    }
}

pub async fn cancel_game(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<i64>,
) -> impl IntoResponse {
    match state.games.cancel_game(game_id) {
        Ok(game) => Json(GameResponse::from(game)).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn charge_game(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<i64>,
) -> impl IntoResponse {
    match state.payments.charge_organizer(game_id) {
        Ok(payment) => Json(PaymentResponse::from(payment)).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn list_game_assignments(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<i64>,
) -> impl IntoResponse {
    let conn = match database::get_connection(&state.pool) {
        Ok(conn) => conn,
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "DB Connection Error").into_response()
        }
    };

    match games::find_by_id(&conn, game_id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(MatchError::NotFound {
                entity: "game",
                id: game_id,
            })
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Query Error: {}", e),
            )
                .into_response()
        }
    }

    match assignments::list_for_game(&conn, game_id) {
        Ok(rows) => {
            let body: Vec<AssignmentResponse> =
                rows.into_iter().map(AssignmentResponse::from).collect();
            Json(body).into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Query Error: {}", e),
        )
            .into_response(),
    }
}
