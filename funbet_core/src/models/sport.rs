//! Sport-specific behavior keyed off the provider's sport_key.

/// Whether the sport's head-to-head market carries a draw outcome.
///
/// Football and the cricket formats can end level; the US leagues and
/// other two-outcome sports cannot.
pub fn has_draw_outcome(sport_key: &str) -> bool {
    sport_key.starts_with("soccer") || sport_key.starts_with("cricket")
}

/// Hours after commence_time before a fixture is treated as "must be
/// finished" by the verification engine.
///
/// Five-day test matches need days; limited-overs cricket runs long but
/// finishes same-day; everything else is done within a few hours.
pub fn verification_grace_hours(sport_key: &str) -> i64 {
    if sport_key.contains("test_match") {
        120
    } else if sport_key.starts_with("cricket") {
        8
    } else {
        3
    }
}
