use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::config::settings::MatchingSettings;
use crate::database::models::{Game, User};
use crate::database::users;
use crate::geo;

use super::availability;

/// Referees allowed to take the game, paired with their distance to the
/// venue in km. Order is unspecified; callers re-sort by score.
///
/// Role, activity, background check and certification narrowing happen in
/// SQL; travel radius and calendar checks run here per referee. A referee
/// whose calendar fails to parse is skipped with a warning rather than
/// sinking the whole candidate search.
pub fn eligible_referees(
    conn: &rusqlite::Connection,
    game: &Game,
    settings: &MatchingSettings,
    exclude_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Vec<(User, f64)>> {
    let (Some(game_lat), Some(game_lon)) = (game.latitude, game.longitude) else {
        debug!("Game {} has no coordinates; no referees are in range", game.id);
        return Ok(Vec::new());
    };

    let certified =
        users::list_certified_referees(conn, game.sport, game.required_level, exclude_id, now)?;

    let mut eligible = Vec::new();
    for referee in certified {
        let (Some(lat), Some(lon)) = (referee.latitude, referee.longitude) else {
            continue;
        };

        let distance = geo::distance_km(lat, lon, game_lat, game_lon);
        if distance > referee.travel_radius_km {
            continue;
        }

        match availability::is_available(conn, referee.id, game, settings.conflict_window_hours) {
            Ok(true) => eligible.push((referee, distance)),
            Ok(false) => {}
            Err(err) => {
                warn!("Skipping referee {} for game {}: {err:#}", referee.id, game.id);
            }
        }
    }

    Ok(eligible)
}
