use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::{Assignment, Game, Payment, Review, User};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResponse {
    pub id: i64,
    pub organizer_id: i64,
    pub sport: String,
    pub required_level: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub venue_name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub importance: i64,
    pub notes: Option<String>,
    pub status: String,
    pub base_rate: f64,
    pub surge_multiplier: f64,
    pub final_rate: f64,
    pub created_at: DateTime<Utc>,
}

impl From<Game> for GameResponse {
    fn from(game: Game) -> Self {
        Self {
            id: game.id,
            organizer_id: game.organizer_id,
            sport: game.sport.as_str().to_string(),
            required_level: game.required_level.as_str().to_string(),
            scheduled_at: game.scheduled_at,
            duration_minutes: game.duration_minutes,
            venue_name: game.venue_name,
            address: game.address,
            latitude: game.latitude,
            longitude: game.longitude,
            home_team: game.home_team,
            away_team: game.away_team,
            importance: game.importance,
            notes: game.notes,
            status: game.status.as_str().to_string(),
            base_rate: game.base_rate,
            surge_multiplier: game.surge_multiplier,
            final_rate: game.final_rate,
            created_at: game.created_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
    pub id: i64,
    pub game_id: i64,
    pub referee_id: i64,
    pub status: String,
    pub is_backup: bool,
    pub match_score: f64,
    pub distance_km: Option<f64>,
    pub notified_at: Option<DateTime<Utc>>,
    pub response_deadline: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub payment_amount: Option<f64>,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Assignment> for AssignmentResponse {
    fn from(assignment: Assignment) -> Self {
        Self {
            id: assignment.id,
            game_id: assignment.game_id,
            referee_id: assignment.referee_id,
            status: assignment.status.as_str().to_string(),
            is_backup: assignment.is_backup,
            match_score: assignment.match_score,
            distance_km: assignment.distance_km,
            notified_at: assignment.notified_at,
            response_deadline: assignment.response_deadline,
            confirmed_at: assignment.confirmed_at,
            rejected_at: assignment.rejected_at,
            completed_at: assignment.completed_at,
            payment_amount: assignment.payment_amount,
            payment_status: assignment.payment_status.as_str().to_string(),
            created_at: assignment.created_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefereeResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub reliability_score: f64,
    pub total_games_assigned: i64,
    pub total_games_completed: i64,
    pub no_show_count: i64,
    pub emergency_pool_opt_in: bool,
    pub travel_radius_km: f64,
}

impl From<User> for RefereeResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.full_name(),
            email: user.email,
            reliability_score: user.reliability_score,
            total_games_assigned: user.total_games_assigned,
            total_games_completed: user.total_games_completed,
            no_show_count: user.no_show_count,
            emergency_pool_opt_in: user.emergency_pool_opt_in,
            travel_radius_km: user.travel_radius_km,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: i64,
    pub assignment_id: Option<i64>,
    pub game_id: i64,
    pub kind: String,
    pub amount: f64,
    pub platform_fee: f64,
    pub net_amount: f64,
    pub status: String,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            assignment_id: payment.assignment_id,
            game_id: payment.game_id,
            kind: payment.kind.as_str().to_string(),
            amount: payment.amount,
            platform_fee: payment.platform_fee,
            net_amount: payment.net_amount,
            status: payment.status.as_str().to_string(),
            reference: payment.reference,
            created_at: payment.created_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: i64,
    pub assignment_id: i64,
    pub referee_id: i64,
    pub rating: Option<i64>,
    pub comment: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            assignment_id: review.assignment_id,
            referee_id: review.referee_id,
            rating: review.rating,
            comment: review.comment,
            requested_at: review.requested_at,
            submitted_at: review.submitted_at,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    pub organizer_id: i64,
    pub sport: String,
    pub required_level: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: Option<i64>,
    pub venue_name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub importance: Option<i64>,
    pub notes: Option<String>,
}

/// Body of an organizer email forwarded into the intake endpoint.
#[derive(Deserialize)]
pub struct EmailSubmissionRequest {
    pub content: String,
    pub from: String,
}

#[derive(Deserialize)]
pub struct SubmitReviewRequest {
    pub rating: i64,
    pub comment: Option<String>,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}
