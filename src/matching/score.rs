use crate::database::models::User;

// Component weights; reliability dominates, and harder still on the
// emergency path where distance barely matters.
const STANDARD_WEIGHTS: ScoreWeights = ScoreWeights {
    reliability: 0.5,
    distance: 0.3,
    experience: 0.2,
};
const EMERGENCY_WEIGHTS: ScoreWeights = ScoreWeights {
    reliability: 0.7,
    distance: 0.2,
    experience: 0.1,
};

const NO_SHOW_PENALTY: f64 = 0.2;
const EXPERIENCE_CEILING: f64 = 100.0;
const PERFECT_RECORD_BOOST: f64 = 1.10;
const BOOST_MIN_COMPLETED: i64 = 10;

struct ScoreWeights {
    reliability: f64,
    distance: f64,
    experience: f64,
}

/// Composite match score for a referee against one game. Pure: reads only
/// the referee snapshot and the precomputed distance. A missing distance
/// contributes zero, which is how the emergency path ignores travel radius.
pub fn score_referee(referee: &User, distance_km: Option<f64>, emergency: bool) -> f64 {
    let weights = if emergency {
        &EMERGENCY_WEIGHTS
    } else {
        &STANDARD_WEIGHTS
    };

    let distance_score = match distance_km {
        Some(distance) if referee.travel_radius_km > 0.0 => {
            (1.0 - distance / referee.travel_radius_km).max(0.0)
        }
        _ => 0.0,
    };
    let experience_score = (referee.total_games_completed as f64 / EXPERIENCE_CEILING).min(1.0);

    let raw = weights.reliability * referee.reliability_score
        + weights.distance * distance_score
        + weights.experience * experience_score;

    let mut score = (raw - referee.no_show_count as f64 * NO_SHOW_PENALTY).max(0.0);

    if referee.reliability_score == 1.0 && referee.total_games_completed >= BOOST_MIN_COMPLETED {
        score *= PERFECT_RECORD_BOOST;
    }

    round3(score)
}

pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
