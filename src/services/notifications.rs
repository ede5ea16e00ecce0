use anyhow::Result;
use log::{error, info, warn};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::NotifierSettings;
use crate::database::{
    self, assignments, games, reviews, users, Assignment, DbPool, User,
};
use crate::integrations::{NotificationKind, NotificationMessage, Notifier, Recipient};

/// Builds and dispatches every outbound message. Each method loads what it
/// needs from the database, so callers only hand over ids or freshly written
/// rows. Delivery problems are logged and swallowed here; a lost message must
/// never undo the state transition that produced it.
pub struct NotificationService {
    pool: DbPool,
    settings: NotifierSettings,
    notifier: Arc<dyn Notifier>,
}

impl NotificationService {
    pub fn new(pool: DbPool, settings: NotifierSettings, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            pool,
            settings,
            notifier,
        }
    }

    pub fn send_assignment_offer(&self, assignment: &Assignment, is_emergency: bool) {
        if let Err(err) = self.assignment_offer(assignment, is_emergency) {
            error!(
                "Failed to send assignment offer for assignment {}: {err:#}",
                assignment.id
            );
        }
    }

    pub fn send_assignment_confirmed(&self, assignment: &Assignment) {
        if let Err(err) = self.assignment_confirmed(assignment) {
            error!(
                "Failed to send confirmation notice for assignment {}: {err:#}",
                assignment.id
            );
        }
    }

    pub fn send_confirmation_reminder(&self, assignment: &Assignment, hours_left: i64) {
        if let Err(err) = self.confirmation_reminder(assignment, hours_left) {
            error!(
                "Failed to send {hours_left}h reminder for assignment {}: {err:#}",
                assignment.id
            );
        }
    }

    pub fn send_game_day_reminder(&self, assignment_id: i64) {
        if let Err(err) = self.game_day_reminder(assignment_id) {
            error!("Failed to send game day reminder for assignment {assignment_id}: {err:#}");
        }
    }

    pub fn send_game_cancelled(&self, assignment: &Assignment) {
        if let Err(err) = self.game_cancelled(assignment) {
            error!(
                "Failed to send cancellation notice for assignment {}: {err:#}",
                assignment.id
            );
        }
    }

    pub fn send_payment_notification(&self, referee_id: i64, amount: f64) {
        if let Err(err) = self.payment_notification(referee_id, amount) {
            error!("Failed to send payment notification to referee {referee_id}: {err:#}");
        }
    }

    pub fn send_review_request(&self, review_id: i64) {
        if let Err(err) = self.review_request(review_id) {
            error!("Failed to send review request {review_id}: {err:#}");
        }
    }

    pub fn notify_admin_no_show(&self, assignment: &Assignment) {
        if let Err(err) = self.admin_no_show(assignment) {
            error!(
                "Failed to alert admin of no-show for assignment {}: {err:#}",
                assignment.id
            );
        }
    }

    fn assignment_offer(&self, assignment: &Assignment, is_emergency: bool) -> Result<()> {
        let (referee, game) = {
            let conn = database::get_connection(&self.pool)?;
            let referee = users::find_by_id(&conn, assignment.referee_id)?;
            let game = games::find_by_id(&conn, assignment.game_id)?;
            (referee, game)
        };

        let (Some(referee), Some(game)) = (referee, game) else {
            error!(
                "Missing referee or game for assignment offer {}",
                assignment.id
            );
            return Ok(());
        };

        let rate: Value = if is_emergency {
            json!(format!("{} (includes surge pricing)", game.final_rate))
        } else {
            json!(game.final_rate)
        };

        let message = NotificationMessage {
            recipient: recipient_for(&referee),
            kind: NotificationKind::AssignmentOffer,
            context: json!({
                "assignment_id": assignment.id,
                "sport": game.sport.display_name(),
                "date": game.scheduled_at.format("%B %d, %Y at %I:%M %p").to_string(),
                "location": format!("{}, {}", game.venue_name, game.address),
                "home_team": game.home_team.as_deref().unwrap_or("TBD"),
                "away_team": game.away_team.as_deref().unwrap_or("TBD"),
                "rate": rate,
                "confirm_url": format!(
                    "{}/assignment/{}/confirm",
                    self.settings.app_url, assignment.id
                ),
            }),
        };

        self.notifier.notify(&message)?;
        info!("Sent assignment offer for assignment {}", assignment.id);
        Ok(())
    }

    fn assignment_confirmed(&self, assignment: &Assignment) -> Result<()> {
        let (referee, game) = {
            let conn = database::get_connection(&self.pool)?;
            let referee = users::find_by_id(&conn, assignment.referee_id)?;
            let game = games::find_by_id(&conn, assignment.game_id)?;
            (referee, game)
        };

        let (Some(referee), Some(game)) = (referee, game) else {
            return Ok(());
        };

        let message = NotificationMessage {
            recipient: recipient_for(&referee),
            kind: NotificationKind::AssignmentConfirmed,
            context: json!({
                "assignment_id": assignment.id,
                "sport": game.sport.display_name(),
                "date": game.scheduled_at.format("%B %d at %I:%M %p").to_string(),
            }),
        };

        self.notifier.notify(&message)?;
        info!(
            "Sent confirmation notice for assignment {}",
            assignment.id
        );
        Ok(())
    }

    fn confirmation_reminder(&self, assignment: &Assignment, hours_left: i64) -> Result<()> {
        let (referee, game) = {
            let conn = database::get_connection(&self.pool)?;
            let referee = users::find_by_id(&conn, assignment.referee_id)?;
            let game = games::find_by_id(&conn, assignment.game_id)?;
            (referee, game)
        };

        let (Some(referee), Some(game)) = (referee, game) else {
            return Ok(());
        };

        let message = NotificationMessage {
            recipient: recipient_for(&referee),
            kind: NotificationKind::ConfirmationReminder,
            context: json!({
                "assignment_id": assignment.id,
                "date": game.scheduled_at.format("%B %d at %I:%M %p").to_string(),
                "location": game.address,
                "hours_left": hours_left,
            }),
        };

        self.notifier.notify(&message)?;
        info!(
            "Sent {hours_left}h reminder for assignment {}",
            assignment.id
        );
        Ok(())
    }

    fn game_day_reminder(&self, assignment_id: i64) -> Result<()> {
        let (assignment, referee, game) = {
            let conn = database::get_connection(&self.pool)?;
            let Some(assignment) = assignments::find_by_id(&conn, assignment_id)? else {
                return Ok(());
            };
            let referee = users::find_by_id(&conn, assignment.referee_id)?;
            let game = games::find_by_id(&conn, assignment.game_id)?;
            (assignment, referee, game)
        };

        let (Some(referee), Some(game)) = (referee, game) else {
            return Ok(());
        };

        let message = NotificationMessage {
            recipient: recipient_for(&referee),
            kind: NotificationKind::GameDayReminder,
            context: json!({
                "assignment_id": assignment.id,
                "time": game.scheduled_at.format("%I:%M %p").to_string(),
                "location": game.venue_name,
            }),
        };

        self.notifier.notify(&message)?;
        info!("Sent game day reminder for assignment {assignment_id}");
        Ok(())
    }

    fn game_cancelled(&self, assignment: &Assignment) -> Result<()> {
        let (referee, game) = {
            let conn = database::get_connection(&self.pool)?;
            let referee = users::find_by_id(&conn, assignment.referee_id)?;
            let game = games::find_by_id(&conn, assignment.game_id)?;
            (referee, game)
        };

        let (Some(referee), Some(game)) = (referee, game) else {
            return Ok(());
        };

        let message = NotificationMessage {
            recipient: recipient_for(&referee),
            kind: NotificationKind::GameCancelled,
            context: json!({
                "assignment_id": assignment.id,
                "sport": game.sport.display_name(),
                "date": game.scheduled_at.format("%B %d, %Y at %I:%M %p").to_string(),
                "location": game.venue_name,
            }),
        };

        self.notifier.notify(&message)?;
        info!(
            "Sent cancellation notice for assignment {}",
            assignment.id
        );
        Ok(())
    }

    fn payment_notification(&self, referee_id: i64, amount: f64) -> Result<()> {
        let referee = {
            let conn = database::get_connection(&self.pool)?;
            users::find_by_id(&conn, referee_id)?
        };

        let Some(referee) = referee else {
            return Ok(());
        };

        let now = chrono::Utc::now();
        let message = NotificationMessage {
            recipient: recipient_for(&referee),
            kind: NotificationKind::PaymentSent,
            context: json!({
                "amount": amount,
                "date": now.format("%B %d, %Y").to_string(),
                "reference": format!("PAY-{}", now.timestamp()),
            }),
        };

        self.notifier.notify(&message)?;
        info!("Sent payment notification to referee {referee_id}");
        Ok(())
    }

    fn review_request(&self, review_id: i64) -> Result<()> {
        let (review, reviewer, referee, game) = {
            let conn = database::get_connection(&self.pool)?;
            let Some(review) = reviews::find_by_id(&conn, review_id)? else {
                return Ok(());
            };
            let reviewer = users::find_by_id(&conn, review.reviewer_id)?;
            let referee = users::find_by_id(&conn, review.referee_id)?;
            let game = match assignments::find_by_id(&conn, review.assignment_id)? {
                Some(assignment) => games::find_by_id(&conn, assignment.game_id)?,
                None => None,
            };
            (review, reviewer, referee, game)
        };

        let (Some(reviewer), Some(referee), Some(game)) = (reviewer, referee, game) else {
            return Ok(());
        };

        let message = NotificationMessage {
            recipient: recipient_for(&reviewer),
            kind: NotificationKind::ReviewRequest,
            context: json!({
                "referee_name": referee.full_name(),
                "home_team": game.home_team,
                "away_team": game.away_team,
                "date": game.scheduled_at.format("%B %d, %Y").to_string(),
                "review_link": format!("{}/review/{}", self.settings.app_url, review.id),
            }),
        };

        self.notifier.notify(&message)?;
        info!("Sent review request {review_id}");
        Ok(())
    }

    fn admin_no_show(&self, assignment: &Assignment) -> Result<()> {
        let (referee, game) = {
            let conn = database::get_connection(&self.pool)?;
            let referee = users::find_by_id(&conn, assignment.referee_id)?;
            let game = games::find_by_id(&conn, assignment.game_id)?;
            (referee, game)
        };

        let (Some(referee), Some(game)) = (referee, game) else {
            return Ok(());
        };

        let message = NotificationMessage {
            recipient: Recipient {
                user_id: 0,
                email: self.settings.admin_email.to_string(),
                phone: None,
            },
            kind: NotificationKind::AdminAlert,
            context: json!({
                "subject": format!("URGENT: Referee No-Show - {}", game.sport.display_name()),
                "referee": format!("{} (ID: {})", referee.full_name(), referee.id),
                "game": format!(
                    "{} vs {}",
                    game.home_team.as_deref().unwrap_or("TBD"),
                    game.away_team.as_deref().unwrap_or("TBD")
                ),
                "date": game.scheduled_at.format("%B %d, %Y at %I:%M %p").to_string(),
                "location": format!("{}, {}", game.venue_name, game.address),
                "no_show_count": referee.no_show_count,
            }),
        };

        self.notifier.notify(&message)?;
        warn!(
            "Notified admin of no-show for assignment {}",
            assignment.id
        );
        Ok(())
    }
}

fn recipient_for(user: &User) -> Recipient {
    Recipient {
        user_id: user.id,
        email: user.email.clone(),
        phone: user.phone.clone(),
    }
}
