use chrono::{DateTime, Duration, Utc};
use log::{error, info, warn};
use std::sync::Arc;

use crate::config::MatchingSettings;
use crate::database::{
    self, assignments, games, users, Assignment, AssignmentStatus, DbPool, Game, GameStatus,
    NewAssignment,
};
use crate::errors::{MatchError, MatchResult};
use crate::matching::reliability::{self, ReliabilityEvent};
use crate::matching::ScoredCandidate;
use crate::scheduler::{TimerKey, TimerPurpose, TimerService};
use crate::services::notifications::NotificationService;
use crate::services::payments::PaymentService;
use crate::services::reviews::ReviewService;

const GAME_DAY_REMINDER_HOURS: i64 = 2;

/// The assignment lifecycle: offers go out as `notified` with a response
/// deadline, referees confirm or reject, deadline expiry falls through to the
/// next backup, finished games settle into completed/no_show. Every transition
/// is committed before its timers and notifications move, so a crashed
/// notification can never undo a recorded state.
#[derive(Clone)]
pub struct AssignmentService {
    pool: DbPool,
    matching: MatchingSettings,
    timers: TimerService,
    notifications: Arc<NotificationService>,
    payments: Arc<PaymentService>,
    reviews: Arc<ReviewService>,
}

impl AssignmentService {
    pub fn new(
        pool: DbPool,
        matching: MatchingSettings,
        timers: TimerService,
        notifications: Arc<NotificationService>,
        payments: Arc<PaymentService>,
        reviews: Arc<ReviewService>,
    ) -> Self {
        Self {
            pool,
            matching,
            timers,
            notifications,
            payments,
            reviews,
        }
    }

    /// Writes the authoritative offer row for a game. Runs inside the
    /// caller's transaction; timers and the offer notification belong in
    /// [`after_primary_created`], once that transaction has committed.
    pub fn create_primary_in(
        &self,
        conn: &rusqlite::Connection,
        game: &Game,
        candidate: &ScoredCandidate,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Assignment> {
        let assignment = assignments::insert(
            conn,
            &NewAssignment {
                game_id: game.id,
                referee_id: candidate.referee.id,
                status: AssignmentStatus::Notified,
                is_backup: false,
                match_score: candidate.score,
                distance_km: candidate.distance_km,
                notified_at: Some(now),
                response_deadline: Some(
                    now + Duration::hours(self.matching.confirmation_window_hours),
                ),
                payment_amount: Some(game.final_rate),
            },
        )?;

        info!(
            "Created primary assignment {} (game {}, referee {})",
            assignment.id, game.id, candidate.referee.id
        );
        Ok(assignment)
    }

    /// Writes a standby row. Backups carry no deadline and hear nothing until
    /// a promotion turns them into the primary.
    pub fn create_backup_in(
        &self,
        conn: &rusqlite::Connection,
        game: &Game,
        candidate: &ScoredCandidate,
    ) -> anyhow::Result<Assignment> {
        let assignment = assignments::insert(
            conn,
            &NewAssignment {
                game_id: game.id,
                referee_id: candidate.referee.id,
                status: AssignmentStatus::Pending,
                is_backup: true,
                match_score: candidate.score,
                distance_km: candidate.distance_km,
                notified_at: None,
                response_deadline: None,
                payment_amount: Some(game.final_rate),
            },
        )?;

        info!(
            "Created backup assignment {} (game {}, referee {})",
            assignment.id, game.id, candidate.referee.id
        );
        Ok(assignment)
    }

    /// Post-commit half of primary creation: deadline check, the two
    /// confirmation reminders, and the offer itself.
    pub fn after_primary_created(&self, assignment: &Assignment, is_emergency: bool) {
        self.schedule_confirmation_timers(assignment);
        self.notifications
            .send_assignment_offer(assignment, is_emergency);
    }

    /// Referee accepts the offer. Only a notified assignment inside its
    /// response window can be confirmed; success cancels the sibling backups
    /// and books a reminder for two hours before tip-off.
    pub fn confirm(&self, assignment_id: i64) -> MatchResult<Assignment> {
        let now = Utc::now();
        let (confirmed, game) = {
            let mut conn = database::get_connection(&self.pool)?;
            let tx = conn.transaction()?;

            let Some(assignment) = assignments::find_by_id(&tx, assignment_id)? else {
                return Err(MatchError::NotFound {
                    entity: "assignment",
                    id: assignment_id,
                });
            };
            if assignment.status != AssignmentStatus::Notified {
                return Err(MatchError::InvalidState {
                    action: "confirm assignment",
                    id: assignment_id,
                    status: assignment.status.as_str(),
                });
            }
            if let Some(deadline) = assignment.response_deadline {
                if now > deadline {
                    return Err(MatchError::DeadlineExceeded(assignment_id));
                }
            }

            let confirmed = assignments::set_confirmed(&tx, assignment_id, now)?;
            reliability::record_event(&tx, confirmed.referee_id, ReliabilityEvent::Confirmed)?;
            for backup in assignments::pending_backups_for_game(&tx, confirmed.game_id)? {
                assignments::set_cancelled(&tx, backup.id)?;
            }
            let game = games::find_by_id(&tx, confirmed.game_id)?;
            tx.commit()?;
            (confirmed, game)
        };

        self.cancel_confirmation_timers(assignment_id);
        if let Some(game) = &game {
            let reminder_at = game.scheduled_at - Duration::hours(GAME_DAY_REMINDER_HOURS);
            if reminder_at > now {
                self.timers.schedule(
                    TimerKey {
                        assignment_id,
                        purpose: TimerPurpose::GameDayReminder,
                    },
                    reminder_at,
                );
            }
        }
        self.notifications.send_assignment_confirmed(&confirmed);

        info!("Assignment {assignment_id} confirmed");
        Ok(confirmed)
    }

    /// Referee turns the offer down. The best pending backup inherits the
    /// slot with a fresh deadline; with no backup left the game drops back to
    /// pending for the next sweep.
    pub fn reject(&self, assignment_id: i64) -> MatchResult<Assignment> {
        let now = Utc::now();
        let (released, promoted) = {
            let mut conn = database::get_connection(&self.pool)?;
            let tx = conn.transaction()?;

            let Some(assignment) = assignments::find_by_id(&tx, assignment_id)? else {
                return Err(MatchError::NotFound {
                    entity: "assignment",
                    id: assignment_id,
                });
            };
            if assignment.status != AssignmentStatus::Notified {
                return Err(MatchError::InvalidState {
                    action: "reject assignment",
                    id: assignment_id,
                    status: assignment.status.as_str(),
                });
            }

            let outcome = self.release_and_promote(&tx, assignment_id, ReliabilityEvent::Rejected, now)?;
            tx.commit()?;
            outcome
        };

        self.cancel_confirmation_timers(assignment_id);
        if let Some(promoted) = &promoted {
            self.schedule_confirmation_timers(promoted);
            self.notifications.send_assignment_offer(promoted, false);
        }

        info!("Assignment {assignment_id} rejected");
        Ok(released)
    }

    /// Deadline timer callback. A stale fire — the assignment is gone or has
    /// already moved on — is a quiet no-op; an offer still sitting in
    /// `notified` expires exactly like a rejection, except the referee is
    /// penalized for silence rather than for declining.
    pub fn expire(&self, assignment_id: i64) -> MatchResult<()> {
        let now = Utc::now();
        let promoted = {
            let mut conn = database::get_connection(&self.pool)?;
            let tx = conn.transaction()?;

            let Some(assignment) = assignments::find_by_id(&tx, assignment_id)? else {
                return Ok(());
            };
            if assignment.status != AssignmentStatus::Notified {
                return Ok(());
            }

            let (_, promoted) =
                self.release_and_promote(&tx, assignment_id, ReliabilityEvent::NoResponse, now)?;
            tx.commit()?;
            promoted
        };

        self.cancel_confirmation_timers(assignment_id);
        if let Some(promoted) = &promoted {
            self.schedule_confirmation_timers(promoted);
            self.notifications.send_assignment_offer(promoted, false);
        }

        warn!("Assignment {assignment_id} expired without response");
        Ok(())
    }

    /// Marks a confirmed assignment as worked once the game time has passed,
    /// then settles up: the game closes, the referee's record improves, and
    /// payout plus review request go out as best-effort follow-ups.
    pub fn complete(&self, assignment_id: i64) -> MatchResult<Assignment> {
        let now = Utc::now();
        let completed = {
            let mut conn = database::get_connection(&self.pool)?;
            let tx = conn.transaction()?;

            let Some(assignment) = assignments::find_by_id(&tx, assignment_id)? else {
                return Err(MatchError::NotFound {
                    entity: "assignment",
                    id: assignment_id,
                });
            };
            if assignment.status != AssignmentStatus::Confirmed {
                return Err(MatchError::InvalidState {
                    action: "complete assignment",
                    id: assignment_id,
                    status: assignment.status.as_str(),
                });
            }
            let Some(game) = games::find_by_id(&tx, assignment.game_id)? else {
                return Err(MatchError::NotFound {
                    entity: "game",
                    id: assignment.game_id,
                });
            };
            if game.scheduled_at > now {
                return Err(MatchError::TooEarly(assignment_id));
            }

            let completed = assignments::set_completed(&tx, assignment_id, now)?;
            games::update_status(&tx, game.id, GameStatus::Completed)?;
            users::increment_games_assigned(&tx, completed.referee_id)?;
            reliability::record_event(&tx, completed.referee_id, ReliabilityEvent::Completed)?;
            tx.commit()?;
            completed
        };

        self.timers.cancel(&TimerKey {
            assignment_id,
            purpose: TimerPurpose::GameDayReminder,
        });

        if let Err(err) = self.payments.payout_referee(assignment_id) {
            error!("Payout for assignment {assignment_id} failed: {err}");
        }
        if let Err(err) = self.reviews.request_review(assignment_id) {
            error!("Review request for assignment {assignment_id} failed: {err}");
        }

        info!("Assignment {assignment_id} completed");
        Ok(completed)
    }

    /// Admin records that the referee never turned up. Allowed from any
    /// non-terminal status; the referee takes the heaviest reliability hit
    /// and the admin inbox gets an alert.
    pub fn mark_no_show(&self, assignment_id: i64) -> MatchResult<Assignment> {
        let updated = {
            let mut conn = database::get_connection(&self.pool)?;
            let tx = conn.transaction()?;

            let Some(assignment) = assignments::find_by_id(&tx, assignment_id)? else {
                return Err(MatchError::NotFound {
                    entity: "assignment",
                    id: assignment_id,
                });
            };
            if assignment.status.is_terminal() {
                return Err(MatchError::InvalidState {
                    action: "mark no-show for assignment",
                    id: assignment_id,
                    status: assignment.status.as_str(),
                });
            }

            let updated = assignments::set_no_show(&tx, assignment_id)?;
            users::increment_games_assigned(&tx, updated.referee_id)?;
            reliability::record_event(&tx, updated.referee_id, ReliabilityEvent::NoShow)?;
            tx.commit()?;
            updated
        };

        self.cancel_confirmation_timers(assignment_id);
        self.timers.cancel(&TimerKey {
            assignment_id,
            purpose: TimerPurpose::GameDayReminder,
        });
        self.notifications.notify_admin_no_show(&updated);

        warn!("Assignment {assignment_id} marked as no-show");
        Ok(updated)
    }

    /// Reminder timer callback. Quiet no-op unless the offer is still open.
    pub fn send_confirmation_reminder(
        &self,
        assignment_id: i64,
        hours_left: i64,
    ) -> MatchResult<()> {
        let assignment = {
            let conn = database::get_connection(&self.pool)?;
            assignments::find_by_id(&conn, assignment_id)?
        };

        if let Some(assignment) = assignment {
            if assignment.status == AssignmentStatus::Notified {
                self.notifications
                    .send_confirmation_reminder(&assignment, hours_left);
            }
        }
        Ok(())
    }

    /// Game-day timer callback. Quiet no-op unless still confirmed.
    pub fn send_game_day_reminder(&self, assignment_id: i64) -> MatchResult<()> {
        let assignment = {
            let conn = database::get_connection(&self.pool)?;
            assignments::find_by_id(&conn, assignment_id)?
        };

        if let Some(assignment) = assignment {
            if assignment.status == AssignmentStatus::Confirmed {
                self.notifications.send_game_day_reminder(assignment_id);
            }
        }
        Ok(())
    }

    /// Rebuilds the in-memory timer wheel from durable assignment state after
    /// a restart. Past-due deadlines are scheduled as-is and fire on the next
    /// tick, where the usual expiry path sorts them out.
    pub fn rehydrate_timers(&self) -> MatchResult<usize> {
        let now = Utc::now();
        let (notified, upcoming) = {
            let conn = database::get_connection(&self.pool)?;
            let notified = assignments::list_by_status(&conn, AssignmentStatus::Notified)?;
            let confirmed = assignments::list_by_status(&conn, AssignmentStatus::Confirmed)?;

            let mut upcoming = Vec::new();
            for assignment in confirmed {
                if let Some(game) = games::find_by_id(&conn, assignment.game_id)? {
                    let reminder_at =
                        game.scheduled_at - Duration::hours(GAME_DAY_REMINDER_HOURS);
                    if reminder_at > now {
                        upcoming.push((assignment.id, reminder_at));
                    }
                }
            }
            (notified, upcoming)
        };

        let mut restored = 0;
        for assignment in &notified {
            self.schedule_confirmation_timers(assignment);
            restored += 1;
        }
        for (assignment_id, reminder_at) in upcoming {
            self.timers.schedule(
                TimerKey {
                    assignment_id,
                    purpose: TimerPurpose::GameDayReminder,
                },
                reminder_at,
            );
            restored += 1;
        }

        info!("Restored timers for {restored} open assignments");
        Ok(restored)
    }

    /// Drops every timer still armed for an assignment, whatever its phase.
    /// Used when the game itself goes away rather than the assignment.
    pub fn clear_timers(&self, assignment_id: i64) {
        self.cancel_confirmation_timers(assignment_id);
        self.timers.cancel(&TimerKey {
            assignment_id,
            purpose: TimerPurpose::GameDayReminder,
        });
    }

    fn release_and_promote(
        &self,
        tx: &rusqlite::Connection,
        assignment_id: i64,
        event: ReliabilityEvent,
        now: DateTime<Utc>,
    ) -> anyhow::Result<(Assignment, Option<Assignment>)> {
        let released = assignments::set_rejected(tx, assignment_id, now)?;
        reliability::record_event(tx, released.referee_id, event)?;

        let promoted = match assignments::best_pending_backup(tx, released.game_id)? {
            Some(backup) => {
                let deadline = now + Duration::hours(self.matching.confirmation_window_hours);
                let promoted = assignments::promote_to_primary(tx, backup.id, now, deadline)?;
                info!(
                    "Promoted backup assignment {} for game {}",
                    promoted.id, promoted.game_id
                );
                Some(promoted)
            }
            None => {
                games::update_status(tx, released.game_id, GameStatus::Pending)?;
                info!(
                    "No backup left for game {}; reverted to pending",
                    released.game_id
                );
                None
            }
        };

        Ok((released, promoted))
    }

    fn schedule_confirmation_timers(&self, assignment: &Assignment) {
        let Some(deadline) = assignment.response_deadline else {
            return;
        };

        self.timers.schedule(
            TimerKey {
                assignment_id: assignment.id,
                purpose: TimerPurpose::DeadlineCheck,
            },
            deadline,
        );

        let now = Utc::now();
        for hours in self.matching.reminder_offsets_hours {
            let reminder_at = deadline - Duration::hours(hours);
            if reminder_at > now {
                self.timers.schedule(
                    TimerKey {
                        assignment_id: assignment.id,
                        purpose: TimerPurpose::ConfirmationReminder {
                            hours_before: hours,
                        },
                    },
                    reminder_at,
                );
            }
        }
    }

    fn cancel_confirmation_timers(&self, assignment_id: i64) {
        self.timers.cancel(&TimerKey {
            assignment_id,
            purpose: TimerPurpose::DeadlineCheck,
        });
        for hours in self.matching.reminder_offsets_hours {
            self.timers.cancel(&TimerKey {
                assignment_id,
                purpose: TimerPurpose::ConfirmationReminder {
                    hours_before: hours,
                },
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::models::*;
    use crate::database::{payments as payments_db, reviews as reviews_db};
    use crate::integrations::NotificationKind;
    use crate::testutil::{
        insert_game, insert_organizer, insert_referee, memory_pool, RecordingGateway,
        RecordingNotifier,
    };

    struct Harness {
        pool: DbPool,
        notifier: Arc<RecordingNotifier>,
        gateway: Arc<RecordingGateway>,
        timers: TimerService,
        service: AssignmentService,
    }

    fn harness() -> Harness {
        let pool = memory_pool();
        let config = AppConfig::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let gateway = Arc::new(RecordingGateway::default());
        let notifications = Arc::new(NotificationService::new(
            pool.clone(),
            config.notifier.clone(),
            notifier.clone(),
        ));
        let payments = Arc::new(PaymentService::new(
            pool.clone(),
            config.pricing.clone(),
            gateway.clone(),
            notifications.clone(),
        ));
        let reviews = Arc::new(ReviewService::new(pool.clone(), notifications.clone()));
        let timers = TimerService::new();
        let service = AssignmentService::new(
            pool.clone(),
            config.matching.clone(),
            timers.clone(),
            notifications,
            payments,
            reviews,
        );

        Harness {
            pool,
            notifier,
            gateway,
            timers,
            service,
        }
    }

    fn candidate(referee: User, score: f64) -> ScoredCandidate {
        ScoredCandidate {
            referee,
            distance_km: Some(3.0),
            score,
        }
    }

    /// Primary offer for a game, with the post-commit side effects applied.
    fn seed_primary(h: &Harness, game_offset_hours: i64) -> (Game, Assignment) {
        let (game, assignment) = {
            let conn = h.pool.get().unwrap();
            let referee = insert_referee(&conn, "primary@example.com");
            let organizer = insert_organizer(&conn, "org@example.com");
            let game = insert_game(
                &conn,
                organizer.id,
                Utc::now() + Duration::hours(game_offset_hours),
            );
            let assignment = h
                .service
                .create_primary_in(&conn, &game, &candidate(referee, 0.9), Utc::now())
                .unwrap();
            (game, assignment)
        };
        h.service.after_primary_created(&assignment, false);
        (game, assignment)
    }

    fn seed_backup(h: &Harness, game: &Game, email: &str, score: f64) -> Assignment {
        let conn = h.pool.get().unwrap();
        let referee = insert_referee(&conn, email);
        h.service
            .create_backup_in(&conn, game, &candidate(referee, score))
            .unwrap()
    }

    fn set_reliability(h: &Harness, referee_id: i64, score: f64) {
        let conn = h.pool.get().unwrap();
        crate::database::users::update_reliability_stats(&conn, referee_id, score, 0, 0).unwrap();
    }

    fn reload(h: &Harness, assignment_id: i64) -> Assignment {
        let conn = h.pool.get().unwrap();
        assignments::find_by_id(&conn, assignment_id).unwrap().unwrap()
    }

    fn reload_referee(h: &Harness, referee_id: i64) -> User {
        let conn = h.pool.get().unwrap();
        crate::database::users::find_by_id(&conn, referee_id).unwrap().unwrap()
    }

    fn authoritative_count(h: &Harness, game_id: i64) -> usize {
        let conn = h.pool.get().unwrap();
        assignments::list_for_game(&conn, game_id)
            .unwrap()
            .iter()
            .filter(|a| {
                !a.is_backup
                    && matches!(
                        a.status,
                        AssignmentStatus::Notified | AssignmentStatus::Confirmed
                    )
            })
            .count()
    }

    #[test]
    fn test_primary_creation_arms_deadline_and_reminders() {
        let h = harness();
        let (_game, assignment) = seed_primary(&h, 48);

        assert_eq!(assignment.status, AssignmentStatus::Notified);
        assert!(assignment.notified_at.is_some());
        assert!(assignment.response_deadline.is_some());
        assert_eq!(assignment.payment_amount, Some(50.0));
        // Deadline check plus the 12h and 1h reminders.
        assert_eq!(h.timers.pending(), 3);
        assert_eq!(h.notifier.kinds(), vec![NotificationKind::AssignmentOffer]);
    }

    #[test]
    fn test_backup_creation_is_silent() {
        let h = harness();
        let (game, _) = seed_primary(&h, 48);
        let backup = seed_backup(&h, &game, "backup@example.com", 0.7);

        assert_eq!(backup.status, AssignmentStatus::Pending);
        assert!(backup.is_backup);
        assert!(backup.notified_at.is_none());
        assert!(backup.response_deadline.is_none());
        // Only the primary's three timers; no extra notification.
        assert_eq!(h.timers.pending(), 3);
        assert_eq!(h.notifier.kinds(), vec![NotificationKind::AssignmentOffer]);
    }

    #[test]
    fn test_confirm_cancels_backups_and_books_game_day_reminder() {
        let h = harness();
        let (game, assignment) = seed_primary(&h, 48);
        let backup = seed_backup(&h, &game, "backup@example.com", 0.7);
        set_reliability(&h, assignment.referee_id, 0.9);

        let confirmed = h.service.confirm(assignment.id).unwrap();

        assert_eq!(confirmed.status, AssignmentStatus::Confirmed);
        assert!(confirmed.confirmed_at.is_some());
        assert_eq!(reload(&h, backup.id).status, AssignmentStatus::Cancelled);
        assert_eq!(reload_referee(&h, assignment.referee_id).reliability_score, 0.91);
        // Confirmation timers replaced by the single game-day reminder.
        assert_eq!(h.timers.pending(), 1);
        assert_eq!(
            h.notifier.kinds(),
            vec![
                NotificationKind::AssignmentOffer,
                NotificationKind::AssignmentConfirmed
            ]
        );
        assert_eq!(authoritative_count(&h, game.id), 1);
    }

    #[test]
    fn test_confirm_requires_notified_status() {
        let h = harness();
        let (game, _assignment) = seed_primary(&h, 48);
        let backup = seed_backup(&h, &game, "backup@example.com", 0.7);

        let err = h.service.confirm(backup.id).unwrap_err();

        assert!(matches!(err, MatchError::InvalidState { .. }));
    }

    #[test]
    fn test_confirm_after_deadline_fails_and_leaves_status() {
        let h = harness();
        let (_game, assignment) = seed_primary(&h, 48);
        {
            let conn = h.pool.get().unwrap();
            conn.execute(
                "UPDATE assignments SET response_deadline = ?1 WHERE id = ?2",
                rusqlite::params![Utc::now() - Duration::hours(1), assignment.id],
            )
            .unwrap();
        }

        let err = h.service.confirm(assignment.id).unwrap_err();

        assert!(matches!(err, MatchError::DeadlineExceeded(_)));
        assert_eq!(reload(&h, assignment.id).status, AssignmentStatus::Notified);
    }

    #[test]
    fn test_reject_promotes_best_backup() {
        let h = harness();
        let (game, assignment) = seed_primary(&h, 48);
        let weaker = seed_backup(&h, &game, "weaker@example.com", 0.6);
        let stronger = seed_backup(&h, &game, "stronger@example.com", 0.8);
        set_reliability(&h, assignment.referee_id, 0.9);

        let released = h.service.reject(assignment.id).unwrap();

        assert_eq!(released.status, AssignmentStatus::Rejected);
        assert!(released.rejected_at.is_some());
        assert_eq!(reload_referee(&h, assignment.referee_id).reliability_score, 0.85);

        let promoted = reload(&h, stronger.id);
        assert_eq!(promoted.status, AssignmentStatus::Notified);
        assert!(!promoted.is_backup);
        assert!(promoted.response_deadline.is_some());
        // The weaker backup stays exactly where it was.
        let untouched = reload(&h, weaker.id);
        assert_eq!(untouched.status, AssignmentStatus::Pending);
        assert!(untouched.is_backup);

        assert_eq!(authoritative_count(&h, game.id), 1);
        assert_eq!(
            h.notifier.kinds().last(),
            Some(&NotificationKind::AssignmentOffer)
        );
    }

    #[test]
    fn test_reject_without_backup_reverts_game() {
        let h = harness();
        let (game, assignment) = seed_primary(&h, 48);

        h.service.reject(assignment.id).unwrap();

        let conn = h.pool.get().unwrap();
        let reloaded = games::find_by_id(&conn, game.id).unwrap().unwrap();
        assert_eq!(reloaded.status, GameStatus::Pending);
        drop(conn);
        assert_eq!(authoritative_count(&h, game.id), 0);
        // All confirmation timers are gone.
        assert_eq!(h.timers.pending(), 0);
    }

    #[test]
    fn test_expire_penalizes_silence_and_promotes() {
        let h = harness();
        let (game, assignment) = seed_primary(&h, 48);
        let backup = seed_backup(&h, &game, "backup@example.com", 0.7);
        set_reliability(&h, assignment.referee_id, 1.0);

        h.service.expire(assignment.id).unwrap();

        assert_eq!(reload(&h, assignment.id).status, AssignmentStatus::Rejected);
        assert_eq!(reload_referee(&h, assignment.referee_id).reliability_score, 0.9);
        assert_eq!(reload(&h, backup.id).status, AssignmentStatus::Notified);
        assert_eq!(authoritative_count(&h, game.id), 1);
    }

    #[test]
    fn test_expire_is_noop_once_confirmed() {
        let h = harness();
        let (_game, assignment) = seed_primary(&h, 48);
        h.service.confirm(assignment.id).unwrap();
        let before = reload_referee(&h, assignment.referee_id).reliability_score;

        h.service.expire(assignment.id).unwrap();

        assert_eq!(reload(&h, assignment.id).status, AssignmentStatus::Confirmed);
        assert_eq!(reload_referee(&h, assignment.referee_id).reliability_score, before);
    }

    #[test]
    fn test_complete_settles_game_payout_and_review() {
        let h = harness();
        let (game, assignment) = seed_primary(&h, -3);
        set_reliability(&h, assignment.referee_id, 0.9);
        h.service.confirm(assignment.id).unwrap();

        let completed = h.service.complete(assignment.id).unwrap();

        assert_eq!(completed.status, AssignmentStatus::Completed);
        assert!(completed.completed_at.is_some());

        let conn = h.pool.get().unwrap();
        let reloaded_game = games::find_by_id(&conn, game.id).unwrap().unwrap();
        assert_eq!(reloaded_game.status, GameStatus::Completed);

        let referee = crate::database::users::find_by_id(&conn, assignment.referee_id)
            .unwrap()
            .unwrap();
        assert_eq!(referee.total_games_assigned, 1);
        assert_eq!(referee.total_games_completed, 1);
        // 0.9 confirmed +0.01, completed +0.02.
        assert_eq!(referee.reliability_score, 0.93);

        let payout = payments_db::find_completed_payout(&conn, assignment.id)
            .unwrap()
            .unwrap();
        assert_eq!(payout.status, PaymentStatus::Completed);
        let review = reviews_db::find_by_assignment(&conn, assignment.id)
            .unwrap()
            .unwrap();
        assert!(review.rating.is_none());
        drop(conn);

        assert_eq!(h.gateway.payouts.lock().unwrap().len(), 1);
        assert_eq!(
            h.notifier.kinds(),
            vec![
                NotificationKind::AssignmentOffer,
                NotificationKind::AssignmentConfirmed,
                NotificationKind::PaymentSent,
                NotificationKind::ReviewRequest,
            ]
        );
    }

    #[test]
    fn test_complete_before_game_time_fails() {
        let h = harness();
        let (_game, assignment) = seed_primary(&h, 48);
        h.service.confirm(assignment.id).unwrap();

        let err = h.service.complete(assignment.id).unwrap_err();

        assert!(matches!(err, MatchError::TooEarly(_)));
        assert_eq!(reload(&h, assignment.id).status, AssignmentStatus::Confirmed);
    }

    #[test]
    fn test_no_show_applies_heavy_penalty_and_alerts_admin() {
        let h = harness();
        let (_game, assignment) = seed_primary(&h, -3);
        set_reliability(&h, assignment.referee_id, 0.9);
        h.service.confirm(assignment.id).unwrap();

        let updated = h.service.mark_no_show(assignment.id).unwrap();

        assert_eq!(updated.status, AssignmentStatus::NoShow);
        let referee = reload_referee(&h, assignment.referee_id);
        // 0.9 confirmed +0.01 = 0.91, then the no-show -0.30.
        assert_eq!(referee.reliability_score, 0.61);
        assert_eq!(referee.no_show_count, 1);
        assert_eq!(referee.total_games_assigned, 1);
        assert_eq!(referee.total_games_completed, 0);
        assert_eq!(
            h.notifier.kinds().last(),
            Some(&NotificationKind::AdminAlert)
        );
    }

    #[test]
    fn test_no_show_rejected_from_terminal_status() {
        let h = harness();
        let (_game, assignment) = seed_primary(&h, -3);
        h.service.confirm(assignment.id).unwrap();
        h.service.complete(assignment.id).unwrap();

        let err = h.service.mark_no_show(assignment.id).unwrap_err();

        assert!(matches!(err, MatchError::InvalidState { .. }));
    }

    #[test]
    fn test_confirmation_reminder_only_fires_while_notified() {
        let h = harness();
        let (_game, assignment) = seed_primary(&h, 48);
        h.service.confirm(assignment.id).unwrap();

        h.service
            .send_confirmation_reminder(assignment.id, 12)
            .unwrap();

        assert!(!h
            .notifier
            .kinds()
            .contains(&NotificationKind::ConfirmationReminder));
    }

    #[test]
    fn test_rehydrate_restores_open_timers() {
        let h = harness();
        let (_game, _notified) = seed_primary(&h, 48);
        // Second game far enough out that its game-day reminder is future.
        let (_game2, confirmed) = seed_primary_with(&h, "second@example.com", 72);
        h.service.confirm(confirmed.id).unwrap();

        // Simulate a restart: all in-memory timers lost.
        let fresh = TimerService::new();
        let service = AssignmentService {
            timers: fresh.clone(),
            ..h.service.clone()
        };

        let restored = service.rehydrate_timers().unwrap();

        assert_eq!(restored, 2);
        assert!(fresh.pending() >= 2);
    }

    fn seed_primary_with(h: &Harness, email: &str, offset_hours: i64) -> (Game, Assignment) {
        let (game, assignment) = {
            let conn = h.pool.get().unwrap();
            let referee = insert_referee(&conn, email);
            let organizer = insert_organizer(&conn, &format!("org-{email}"));
            let game = insert_game(&conn, organizer.id, Utc::now() + Duration::hours(offset_hours));
            let assignment = h
                .service
                .create_primary_in(&conn, &game, &candidate(referee, 0.9), Utc::now())
                .unwrap();
            (game, assignment)
        };
        h.service.after_primary_created(&assignment, false);
        (game, assignment)
    }
}
