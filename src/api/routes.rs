use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::handlers::{
    admin::trigger_sweep,
    assignments::{complete_assignment, confirm_assignment, no_show_assignment, reject_assignment},
    games::{
        cancel_game, charge_game, create_game, get_game, list_game_assignments, list_games,
        submit_game_email,
    },
    referees::list_referees,
    reviews::submit_review,
    AppState,
};

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/games", post(create_game).get(list_games))
        .route("/api/games/email", post(submit_game_email))
        .route("/api/games/:id", get(get_game))
        .route("/api/games/:id/cancel", post(cancel_game))
        .route("/api/games/:id/charge", post(charge_game))
        .route("/api/games/:id/assignments", get(list_game_assignments))
        .route("/api/assignments/:id/confirm", post(confirm_assignment))
        .route("/api/assignments/:id/reject", post(reject_assignment))
        .route("/api/assignments/:id/complete", post(complete_assignment))
        .route("/api/assignments/:id/no-show", post(no_show_assignment))
        .route("/api/referees", get(list_referees))
        .route("/api/reviews/:id", post(submit_review))
        .route("/api/admin/sweep", post(trigger_sweep))
        .with_state(state)
}
