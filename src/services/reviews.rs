use chrono::Utc;
use log::info;
use std::sync::Arc;

use crate::database::{self, assignments, games, reviews, DbPool, Review};
use crate::errors::{MatchError, MatchResult};
use crate::matching::reliability::{self, ReliabilityEvent};
use crate::services::notifications::NotificationService;

/// Post-game review flow. The organizer acts as the reviewer; strong or weak
/// ratings feed back into the referee's reliability through the tracker, which
/// stays the sole writer of that score.
pub struct ReviewService {
    pool: DbPool,
    notifications: Arc<NotificationService>,
}

impl ReviewService {
    pub fn new(pool: DbPool, notifications: Arc<NotificationService>) -> Self {
        Self {
            pool,
            notifications,
        }
    }

    /// Opens a review slot for a completed assignment and asks the organizer
    /// to fill it in. At most one review exists per assignment.
    pub fn request_review(&self, assignment_id: i64) -> MatchResult<Review> {
        let review = {
            let conn = database::get_connection(&self.pool)?;

            let Some(assignment) = assignments::find_by_id(&conn, assignment_id)? else {
                return Err(MatchError::NotFound {
                    entity: "assignment",
                    id: assignment_id,
                });
            };
            let Some(game) = games::find_by_id(&conn, assignment.game_id)? else {
                return Err(MatchError::NotFound {
                    entity: "game",
                    id: assignment.game_id,
                });
            };

            if reviews::find_by_assignment(&conn, assignment_id)?.is_some() {
                return Err(MatchError::Validation(format!(
                    "review already requested for assignment {assignment_id}"
                )));
            }

            reviews::insert_request(
                &conn,
                assignment_id,
                assignment.referee_id,
                game.organizer_id,
                Utc::now(),
            )?
        };

        self.notifications.send_review_request(review.id);

        info!("Requested review for assignment {assignment_id}");
        Ok(review)
    }

    /// Records a submitted rating. Ratings of 4 and up count as a good review
    /// for the referee, 2 and below as a bad one; a 3 moves nothing.
    pub fn submit_review(
        &self,
        review_id: i64,
        rating: i64,
        comment: Option<&str>,
    ) -> MatchResult<Review> {
        let mut conn = database::get_connection(&self.pool)?;

        let Some(review) = reviews::find_by_id(&conn, review_id)? else {
            return Err(MatchError::NotFound {
                entity: "review",
                id: review_id,
            });
        };
        if review.rating.is_some() {
            return Err(MatchError::InvalidState {
                action: "submit review",
                id: review_id,
                status: "submitted",
            });
        }
        if !(1..=5).contains(&rating) {
            return Err(MatchError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }

        let tx = conn.transaction()?;
        let updated = reviews::submit(&tx, review_id, rating, comment, Utc::now())?;
        if rating >= 4 {
            reliability::record_event(&tx, review.referee_id, ReliabilityEvent::GoodReview)?;
        } else if rating <= 2 {
            reliability::record_event(&tx, review.referee_id, ReliabilityEvent::BadReview)?;
        }
        tx.commit()?;

        info!("Review {review_id} submitted with rating {rating}");
        Ok(updated)
    }
}
