use crate::database::models::{CertLevel, Sport};

/// Base pay per game in dollars, by sport and required certification tier.
pub fn base_rate(sport: Sport, level: CertLevel) -> f64 {
    let (entry, intermediate, advanced) = match sport {
        Sport::Basketball => (50.0, 75.0, 100.0),
        Sport::Football => (60.0, 85.0, 120.0),
        Sport::Soccer => (45.0, 70.0, 95.0),
        Sport::Softball => (40.0, 65.0, 85.0),
        Sport::Volleyball => (40.0, 60.0, 80.0),
        Sport::Baseball => (45.0, 70.0, 95.0),
    };
    match level {
        CertLevel::Entry => entry,
        CertLevel::Intermediate => intermediate,
        CertLevel::Advanced => advanced,
    }
}
