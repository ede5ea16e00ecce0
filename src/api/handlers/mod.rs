use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use log::error;
use serde::Deserialize;
use std::sync::Arc;

use crate::api::models::ErrorBody;
use crate::config::AppConfig;
use crate::database::DbPool;
use crate::errors::MatchError;
use crate::integrations::GeocodeClient;
use crate::services::assignments::AssignmentService;
use crate::services::games::GameService;
use crate::services::payments::PaymentService;
use crate::services::reviews::ReviewService;
use crate::services::sweep::SweepService;

pub mod admin;
pub mod assignments;
pub mod games;
pub mod referees;
pub mod reviews;

pub struct AppState {
    pub pool: DbPool,
    pub config: AppConfig,
    pub games: GameService,
    pub assignments: AssignmentService,
    pub payments: Arc<PaymentService>,
    pub reviews: Arc<ReviewService>,
    pub sweep: SweepService,
    pub geocoder: GeocodeClient,
}

#[derive(Deserialize)]
pub struct GameListParams {
    pub status: Option<String>,
}

/// Maps lifecycle errors onto the HTTP surface. Server-side failures are
/// logged with their full chain; the response carries the display message.
pub fn error_response(err: MatchError) -> Response {
    let status = match &err {
        MatchError::NotFound { .. } | MatchError::NoEligibleCandidate(_) => StatusCode::NOT_FOUND,
        MatchError::InvalidState { .. }
        | MatchError::DeadlineExceeded(_)
        | MatchError::TooEarly(_) => StatusCode::CONFLICT,
        MatchError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        MatchError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        MatchError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("Request failed: {err:?}");
    }

    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
        .into_response()
}
