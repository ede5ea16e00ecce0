use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;

use super::AppState;
use crate::api::models::RefereeResponse;
use crate::database::{self, users};

pub async fn list_referees(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let conn = match database::get_connection(&state.pool) {
        Ok(conn) => conn,
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "DB Connection Error").into_response()
        }
    };

    match users::list_referees(&conn) {
        Ok(rows) => {
            let body: Vec<RefereeResponse> = rows.into_iter().map(RefereeResponse::from).collect();
            Json(body).into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Query Error: {}", e),
        )
            .into_response(),
    }
}
