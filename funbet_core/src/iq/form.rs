//! Form-derived sub-scores: historical record and momentum

use crate::models::{FormResult, TeamHistoricalStats, Venue};

/// Points available from the last five games (five wins at 3 each).
const FORM_POINTS_MAX: f64 = 15.0;

/// Theoretical momentum maximum: ten away wins at 5 base + 2 unbeaten
/// bonus each.
const MOMENTUM_MAX: f64 = 70.0;

/// Goal-differential scaling: one net goal per game moves the score by
/// this many points around the 50 midpoint.
const GOAL_DIFF_SCALE: f64 = 10.0;

/// Team-stats sub-score: win rate (40%), normalized goal differential
/// (30%), share of wins earned at the venue the team plays this fixture
/// at (15%), and points from the last five games (15%).
pub fn team_stats_score(stats: Option<&TeamHistoricalStats>, venue: Venue, neutral: f64) -> f64 {
    let stats = match stats {
        Some(s) if s.total_games > 0 => s,
        _ => return neutral,
    };

    let games = stats.total_games as f64;
    let win_rate = stats.wins as f64 / games * 100.0;

    let diff_per_game = (stats.goals_for - stats.goals_against) as f64 / games;
    let goal_diff = (50.0 + diff_per_game * GOAL_DIFF_SCALE).clamp(0.0, 100.0);

    let balance = if stats.wins == 0 {
        neutral
    } else {
        let venue_wins = match venue {
            Venue::Home => stats.home_wins,
            Venue::Away => stats.away_wins,
        };
        (venue_wins as f64 / stats.wins as f64 * 100.0).clamp(0.0, 100.0)
    };

    let form = if stats.recent_form.is_empty() {
        neutral
    } else {
        let last_five = stats
            .recent_form
            .iter()
            .rev()
            .take(5)
            .map(|r| match r {
                FormResult::Win => 3.0,
                FormResult::Draw => 1.0,
                FormResult::Loss => 0.0,
            })
            .sum::<f64>();
        (last_five / FORM_POINTS_MAX * 100.0).clamp(0.0, 100.0)
    };

    (0.40 * win_rate + 0.30 * goal_diff + 0.15 * balance + 0.15 * form).clamp(0.0, 100.0)
}

/// Momentum sub-score over the last ten results, most-recent-last.
///
/// Home win 3, away win 5, draw 2, plus an unbeaten bonus of +2 per
/// non-loss (and +1 more for a draw that extends an existing unbeaten
/// run). A loss scores nothing and ends the run. Normalized against the
/// theoretical maximum of ten bonus-carrying away wins.
pub fn momentum_score(stats: Option<&TeamHistoricalStats>, neutral: f64) -> f64 {
    let stats = match stats {
        Some(s) if !s.recent_results.is_empty() => s,
        _ => return neutral,
    };

    let mut points = 0.0;
    let mut unbeaten = 0u32;
    for result in &stats.recent_results {
        match result.result {
            FormResult::Win => {
                points += match result.venue {
                    Venue::Home => 3.0,
                    Venue::Away => 5.0,
                };
                points += 2.0;
                unbeaten += 1;
            }
            FormResult::Draw => {
                points += 2.0 + 2.0;
                if unbeaten > 0 {
                    points += 1.0;
                }
                unbeaten += 1;
            }
            FormResult::Loss => {
                unbeaten = 0;
            }
        }
    }

    (points / MOMENTUM_MAX * 100.0).clamp(0.0, 100.0)
}
