use log::info;
use std::sync::Arc;

use crate::config::PricingSettings;
use crate::database::{
    self, assignments, games, payments, users, AssignmentStatus, DbPool, Payment, PaymentKind,
    PaymentStatus, PayoutStatus,
};
use crate::errors::{MatchError, MatchResult};
use crate::integrations::PaymentGateway;
use crate::services::notifications::NotificationService;

/// Money movement in both directions: organizers are charged the game rate
/// plus the platform fee, referees are paid the rate minus it.
pub struct PaymentService {
    pool: DbPool,
    pricing: PricingSettings,
    gateway: Arc<dyn PaymentGateway>,
    notifications: Arc<NotificationService>,
}

impl PaymentService {
    pub fn new(
        pool: DbPool,
        pricing: PricingSettings,
        gateway: Arc<dyn PaymentGateway>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            pool,
            pricing,
            gateway,
            notifications,
        }
    }

    /// Creates a pending charge against the organizer for a game's final rate
    /// plus the platform fee. The charge is recorded with the gateway
    /// reference so a later settlement callback can resolve it.
    pub fn charge_organizer(&self, game_id: i64) -> MatchResult<Payment> {
        let conn = database::get_connection(&self.pool)?;

        let Some(game) = games::find_by_id(&conn, game_id)? else {
            return Err(MatchError::NotFound {
                entity: "game",
                id: game_id,
            });
        };
        let Some(organizer) = users::find_by_id(&conn, game.organizer_id)? else {
            return Err(MatchError::NotFound {
                entity: "user",
                id: game.organizer_id,
            });
        };

        let amount = game.final_rate;
        let platform_fee = amount * self.pricing.platform_fee;
        let total = amount + platform_fee;

        let reference = match self.gateway.create_charge(game_id, total) {
            Ok(reference) => reference,
            Err(err) => {
                payments::insert(
                    &conn,
                    None,
                    game_id,
                    PaymentKind::Charge,
                    total,
                    platform_fee,
                    amount,
                    PaymentStatus::Failed,
                    None,
                )?;
                return Err(MatchError::ExternalService(format!("charge failed: {err:#}")));
            }
        };

        let payment = payments::insert(
            &conn,
            None,
            game_id,
            PaymentKind::Charge,
            total,
            platform_fee,
            amount,
            PaymentStatus::Pending,
            Some(&reference),
        )?;

        info!(
            "Created charge of {total:.2} for game {game_id} (organizer {})",
            organizer.id
        );
        Ok(payment)
    }

    /// Pays the referee for a completed assignment. Gross is the assignment's
    /// locked-in rate, falling back to the game's final rate; the platform fee
    /// comes out of the referee's side. Calling this twice for the same
    /// assignment returns the already-recorded payout instead of paying again.
    pub fn payout_referee(&self, assignment_id: i64) -> MatchResult<Payment> {
        let (payment, referee_id, net) = {
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
            let Some(referee) = users::find_by_id(&conn, assignment.referee_id)? else {
                return Err(MatchError::NotFound {
                    entity: "user",
                    id: assignment.referee_id,
                });
            };
            if assignment.status != AssignmentStatus::Completed {
                return Err(MatchError::InvalidState {
                    action: "pay out assignment",
                    id: assignment_id,
                    status: assignment.status.as_str(),
                });
            }

            if let Some(existing) = payments::find_completed_payout(&conn, assignment_id)? {
                info!("Payout for assignment {assignment_id} already processed");
                return Ok(existing);
            }

            let gross = assignment.payment_amount.unwrap_or(game.final_rate);
            let platform_fee = gross * self.pricing.platform_fee;
            let net = gross - platform_fee;

            let reference = match self.gateway.create_payout(assignment_id, net) {
                Ok(reference) => reference,
                Err(err) => {
                    payments::insert(
                        &conn,
                        Some(assignment_id),
                        assignment.game_id,
                        PaymentKind::Payout,
                        gross,
                        platform_fee,
                        net,
                        PaymentStatus::Failed,
                        None,
                    )?;
                    return Err(MatchError::ExternalService(format!(
                        "payout failed: {err:#}"
                    )));
                }
            };

            let payment = payments::insert(
                &conn,
                Some(assignment_id),
                assignment.game_id,
                PaymentKind::Payout,
                gross,
                platform_fee,
                net,
                PaymentStatus::Completed,
                Some(&reference),
            )?;
            assignments::set_payment_status(&conn, assignment_id, PayoutStatus::Paid)?;

            (payment, referee.id, net)
        };

        self.notifications.send_payment_notification(referee_id, net);

        info!("Processed payout of {net:.2} for assignment {assignment_id}");
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotifierSettings;
    use crate::database::models::*;
    use crate::testutil::{
        game_fixture, insert_organizer, insert_referee, memory_pool, FailingGateway,
        RecordingGateway, RecordingNotifier,
    };
    use crate::integrations::NotificationKind;
    use chrono::{Duration, Utc};

    struct Harness {
        pool: DbPool,
        gateway: Arc<RecordingGateway>,
        notifier: Arc<RecordingNotifier>,
        service: PaymentService,
    }

    fn harness() -> Harness {
        let pool = memory_pool();
        let gateway = Arc::new(RecordingGateway::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let notifications = Arc::new(NotificationService::new(
            pool.clone(),
            NotifierSettings::default(),
            notifier.clone(),
        ));
        let service = PaymentService::new(
            pool.clone(),
            PricingSettings::default(),
            gateway.clone(),
            notifications,
        );
        Harness {
            pool,
            gateway,
            notifier,
            service,
        }
    }

    fn seed_assignment(pool: &DbPool, payment_amount: Option<f64>) -> (Game, Assignment) {
        let conn = pool.get().unwrap();
        let referee = insert_referee(&conn, "ref@example.com");
        let organizer = insert_organizer(&conn, "org@example.com");
        let mut fixture = game_fixture(organizer.id, Utc::now() - Duration::hours(3));
        fixture.final_rate = 100.0;
        let game = database::games::insert(&conn, &fixture).unwrap();

        let assignment = assignments::insert(
            &conn,
            &NewAssignment {
                game_id: game.id,
                referee_id: referee.id,
                status: AssignmentStatus::Completed,
                is_backup: false,
                match_score: 0.9,
                distance_km: Some(2.0),
                notified_at: Some(Utc::now() - Duration::hours(30)),
                response_deadline: Some(Utc::now() - Duration::hours(6)),
                payment_amount,
            },
        )
        .unwrap();
        (game, assignment)
    }

    #[test]
    fn test_charge_adds_platform_fee_on_top() {
        let h = harness();
        let (game, _) = seed_assignment(&h.pool, None);

        let payment = h.service.charge_organizer(game.id).unwrap();

        assert_eq!(payment.kind, PaymentKind::Charge);
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount, 115.0);
        assert_eq!(payment.platform_fee, 15.0);
        assert_eq!(payment.net_amount, 100.0);
        assert_eq!(h.gateway.charges.lock().unwrap()[0], (game.id, 115.0));
    }

    #[test]
    fn test_charge_unknown_game_is_not_found() {
        let h = harness();
        let err = h.service.charge_organizer(404).unwrap_err();
        assert!(matches!(err, MatchError::NotFound { entity: "game", .. }));
    }

    #[test]
    fn test_payout_deducts_fee_and_marks_assignment_paid() {
        let h = harness();
        let (_game, assignment) = seed_assignment(&h.pool, Some(80.0));

        let payment = h.service.payout_referee(assignment.id).unwrap();

        assert_eq!(payment.kind, PaymentKind::Payout);
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.amount, 80.0);
        assert_eq!(payment.platform_fee, 12.0);
        assert_eq!(payment.net_amount, 68.0);

        let conn = h.pool.get().unwrap();
        let refreshed = assignments::find_by_id(&conn, assignment.id).unwrap().unwrap();
        assert_eq!(refreshed.payment_status, PayoutStatus::Paid);
        drop(conn);

        assert_eq!(h.notifier.kinds(), vec![NotificationKind::PaymentSent]);
    }

    #[test]
    fn test_payout_falls_back_to_game_final_rate() {
        let h = harness();
        let (_game, assignment) = seed_assignment(&h.pool, None);

        let payment = h.service.payout_referee(assignment.id).unwrap();

        assert_eq!(payment.amount, 100.0);
        assert_eq!(payment.net_amount, 85.0);
    }

    #[test]
    fn test_payout_is_idempotent() {
        let h = harness();
        let (_game, assignment) = seed_assignment(&h.pool, Some(80.0));

        let first = h.service.payout_referee(assignment.id).unwrap();
        let second = h.service.payout_referee(assignment.id).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(h.gateway.payouts.lock().unwrap().len(), 1);

        let conn = h.pool.get().unwrap();
        let all = payments::list_for_game(&conn, first.game_id).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_payout_requires_completed_assignment() {
        let h = harness();
        let (_game, assignment) = seed_assignment(&h.pool, Some(80.0));
        {
            let conn = h.pool.get().unwrap();
            conn.execute(
                "UPDATE assignments SET status = 'confirmed' WHERE id = ?1",
                rusqlite::params![assignment.id],
            )
            .unwrap();
        }

        let err = h.service.payout_referee(assignment.id).unwrap_err();

        assert!(matches!(err, MatchError::InvalidState { .. }));
        assert!(h.gateway.payouts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_gateway_failure_records_failed_row_and_no_payout() {
        let pool = memory_pool();
        let notifier = Arc::new(RecordingNotifier::default());
        let notifications = Arc::new(NotificationService::new(
            pool.clone(),
            NotifierSettings::default(),
            notifier.clone(),
        ));
        let service = PaymentService::new(
            pool.clone(),
            PricingSettings::default(),
            Arc::new(FailingGateway),
            notifications,
        );
        let (game, assignment) = seed_assignment(&pool, Some(80.0));

        let err = service.payout_referee(assignment.id).unwrap_err();
        assert!(matches!(err, MatchError::ExternalService(_)));

        let conn = pool.get().unwrap();
        let recorded = payments::list_for_game(&conn, game.id).unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].status, PaymentStatus::Failed);
        assert!(recorded[0].reference.is_none());
        // The assignment itself is untouched and a retry is still possible.
        let refreshed = assignments::find_by_id(&conn, assignment.id).unwrap().unwrap();
        assert_eq!(refreshed.payment_status, PayoutStatus::Pending);
        drop(conn);

        assert!(notifier.sent.lock().unwrap().is_empty());
    }
}
