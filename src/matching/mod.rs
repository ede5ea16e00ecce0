pub mod availability;
pub mod eligibility;
pub mod reliability;
pub mod score;

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::warn;

use crate::config::settings::MatchingSettings;
use crate::database::models::{Game, User};
use crate::database::users;

/// A referee ranked against one game. Distance is absent on the emergency
/// path, where travel radius is not considered.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub referee: User,
    pub distance_km: Option<f64>,
    pub score: f64,
}

/// Highest-scoring eligible referee for the game, if anyone qualifies.
pub fn find_best_referee(
    conn: &rusqlite::Connection,
    game: &Game,
    settings: &MatchingSettings,
    now: DateTime<Utc>,
) -> Result<Option<ScoredCandidate>> {
    let mut ranked = ranked_candidates(conn, game, settings, None, now)?;
    if ranked.is_empty() {
        Ok(None)
    } else {
        Ok(Some(ranked.remove(0)))
    }
}

/// Up to `count` next-best referees for standby duty, excluding the chosen
/// primary.
pub fn find_backup_referees(
    conn: &rusqlite::Connection,
    game: &Game,
    settings: &MatchingSettings,
    exclude_id: i64,
    count: usize,
    now: DateTime<Utc>,
) -> Result<Vec<ScoredCandidate>> {
    let mut ranked = ranked_candidates(conn, game, settings, Some(exclude_id), now)?;
    ranked.truncate(count);
    Ok(ranked)
}

/// Last resort for games nobody regular can take: opted-in, high-reliability
/// referees scored with emergency weighting. Certification level and travel
/// radius are not checked on this path.
pub fn find_emergency_referee(
    conn: &rusqlite::Connection,
    game: &Game,
    settings: &MatchingSettings,
    now: DateTime<Utc>,
) -> Result<Option<ScoredCandidate>> {
    let pool =
        users::list_emergency_pool(conn, game.sport, settings.emergency_min_reliability, now)?;

    let mut best: Option<ScoredCandidate> = None;
    let mut best_score = 0.0;

    for referee in pool {
        match availability::is_available(conn, referee.id, game, settings.conflict_window_hours) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(err) => {
                warn!(
                    "Skipping emergency referee {} for game {}: {err:#}",
                    referee.id, game.id
                );
                continue;
            }
        }

        let score = score::score_referee(&referee, None, true);
        if score > best_score {
            best_score = score;
            best = Some(ScoredCandidate {
                referee,
                distance_km: None,
                score,
            });
        }
    }

    Ok(best)
}

fn ranked_candidates(
    conn: &rusqlite::Connection,
    game: &Game,
    settings: &MatchingSettings,
    exclude_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Vec<ScoredCandidate>> {
    let eligible = eligibility::eligible_referees(conn, game, settings, exclude_id, now)?;

    let mut ranked: Vec<ScoredCandidate> = eligible
        .into_iter()
        .map(|(referee, distance)| {
            let score = score::score_referee(&referee, Some(distance), false);
            ScoredCandidate {
                referee,
                distance_km: Some(distance),
                score,
            }
        })
        .filter(|candidate| candidate.score > 0.0)
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{CertLevel, Sport};
    use crate::database::users;
    use crate::testutil;
    use chrono::Duration;

    fn settings() -> MatchingSettings {
        MatchingSettings::default()
    }

    // Latitude offsets below put referees roughly 10 km and 5 km north of
    // the fixture venue.
    const TEN_KM_NORTH: f64 = 33.4484 + 0.0899;
    const FIVE_KM_NORTH: f64 = 33.4484 + 0.0449;

    #[test]
    fn test_best_referee_prefers_reliability_over_distance() {
        let conn = testutil::memory_conn();
        let organizer = testutil::insert_organizer(&conn, "org@example.com");

        let mut steady = testutil::referee_fixture("steady@example.com");
        steady.reliability_score = 0.95;
        steady.total_games_completed = 20;
        steady.travel_radius_km = 30.0;
        steady.latitude = Some(TEN_KM_NORTH);
        let steady = users::insert(&conn, &steady).unwrap();
        testutil::insert_certification(&conn, steady.id, Sport::Basketball, CertLevel::Advanced);

        let mut nearby = testutil::referee_fixture("nearby@example.com");
        nearby.reliability_score = 0.85;
        nearby.total_games_completed = 10;
        nearby.travel_radius_km = 25.0;
        nearby.latitude = Some(FIVE_KM_NORTH);
        let nearby = users::insert(&conn, &nearby).unwrap();
        testutil::insert_certification(
            &conn,
            nearby.id,
            Sport::Basketball,
            CertLevel::Intermediate,
        );

        let mut submission = testutil::game_fixture(organizer.id, Utc::now() + Duration::days(3));
        submission.required_level = CertLevel::Intermediate;
        let game = crate::database::games::insert(&conn, &submission).unwrap();

        let best = find_best_referee(&conn, &game, &settings(), Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(best.referee.email, "steady@example.com");
        assert!(best.score > 0.0);
        assert!(best.distance_km.unwrap() > 5.0);
    }

    #[test]
    fn test_backups_exclude_primary_and_rank_by_score() {
        let conn = testutil::memory_conn();
        let organizer = testutil::insert_organizer(&conn, "org@example.com");

        for (email, reliability) in [
            ("first@example.com", 0.98),
            ("second@example.com", 0.9),
            ("third@example.com", 0.8),
        ] {
            let mut fixture = testutil::referee_fixture(email);
            fixture.reliability_score = reliability;
            let referee = users::insert(&conn, &fixture).unwrap();
            testutil::insert_certification(&conn, referee.id, Sport::Basketball, CertLevel::Entry);
        }

        let game = testutil::insert_game(&conn, organizer.id, Utc::now() + Duration::days(3));

        let best = find_best_referee(&conn, &game, &settings(), Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(best.referee.email, "first@example.com");

        let backups =
            find_backup_referees(&conn, &game, &settings(), best.referee.id, 2, Utc::now())
                .unwrap();
        let emails: Vec<_> = backups.iter().map(|c| c.referee.email.as_str()).collect();
        assert_eq!(emails, vec!["second@example.com", "third@example.com"]);
    }

    #[test]
    fn test_emergency_pool_ignores_certification_level() {
        let conn = testutil::memory_conn();
        let organizer = testutil::insert_organizer(&conn, "org@example.com");

        let mut responder = testutil::referee_fixture("responder@example.com");
        responder.emergency_pool_opt_in = true;
        responder.reliability_score = 0.95;
        let responder = users::insert(&conn, &responder).unwrap();
        testutil::insert_certification(&conn, responder.id, Sport::Basketball, CertLevel::Entry);

        let mut submission = testutil::game_fixture(organizer.id, Utc::now() + Duration::days(1));
        submission.required_level = CertLevel::Advanced;
        let game = crate::database::games::insert(&conn, &submission).unwrap();

        // Entry certification cannot satisfy an advanced game normally.
        assert!(find_best_referee(&conn, &game, &settings(), Utc::now())
            .unwrap()
            .is_none());

        let emergency = find_emergency_referee(&conn, &game, &settings(), Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(emergency.referee.email, "responder@example.com");
        assert!(emergency.distance_km.is_none());
    }

    #[test]
    fn test_emergency_pool_requires_opt_in_and_reliability() {
        let conn = testutil::memory_conn();
        let organizer = testutil::insert_organizer(&conn, "org@example.com");

        let mut hesitant = testutil::referee_fixture("hesitant@example.com");
        hesitant.reliability_score = 0.95;
        let hesitant = users::insert(&conn, &hesitant).unwrap();
        testutil::insert_certification(&conn, hesitant.id, Sport::Basketball, CertLevel::Entry);

        let mut shaky = testutil::referee_fixture("shaky@example.com");
        shaky.emergency_pool_opt_in = true;
        shaky.reliability_score = 0.85;
        let shaky = users::insert(&conn, &shaky).unwrap();
        testutil::insert_certification(&conn, shaky.id, Sport::Basketball, CertLevel::Entry);

        let mut submission = testutil::game_fixture(organizer.id, Utc::now() + Duration::days(1));
        submission.required_level = CertLevel::Advanced;
        let game = crate::database::games::insert(&conn, &submission).unwrap();

        assert!(find_emergency_referee(&conn, &game, &settings(), Utc::now())
            .unwrap()
            .is_none());
    }
}
