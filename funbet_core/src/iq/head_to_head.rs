//! Head-to-head sub-score

use crate::matching::names_equal;
use crate::models::{H2hOutcome, HeadToHeadRecord};

/// Recent meetings needed before the recency blend kicks in.
const RECENCY_MIN_MEETINGS: usize = 3;

/// How many of the most recent meetings feed the recency term.
const RECENCY_WINDOW: usize = 5;

const RECENCY_BLEND: f64 = 0.30;

/// Head-to-head sub-score for `team` against the specific opponent in
/// `record`. Win share plus half the draw share, blended 70/30 with the
/// same share computed over just the last five meetings once at least
/// three are recorded. Unknown team or empty record scores neutral.
pub fn h2h_score(record: Option<&HeadToHeadRecord>, team: &str, neutral: f64) -> f64 {
    let record = match record {
        Some(r) if r.total_matches > 0 => r,
        _ => return neutral,
    };

    let is_team1 = if names_equal(team, &record.team1) {
        true
    } else if names_equal(team, &record.team2) {
        false
    } else {
        return neutral;
    };

    let wins = if is_team1 {
        record.team1_wins
    } else {
        record.team2_wins
    };
    let total = record.total_matches as f64;
    let base = (wins as f64 / total + 0.5 * record.draws as f64 / total) * 100.0;

    let score = if record.recent_results.len() >= RECENCY_MIN_MEETINGS {
        let recent: Vec<_> = record
            .recent_results
            .iter()
            .rev()
            .take(RECENCY_WINDOW)
            .collect();
        let n = recent.len() as f64;
        let share = recent
            .iter()
            .map(|r| match (r.outcome, is_team1) {
                (H2hOutcome::Team1, true) | (H2hOutcome::Team2, false) => 1.0,
                (H2hOutcome::Draw, _) => 0.5,
                _ => 0.0,
            })
            .sum::<f64>()
            / n
            * 100.0;
        (1.0 - RECENCY_BLEND) * base + RECENCY_BLEND * share
    } else {
        base
    };

    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::H2hResult;
    use chrono::Utc;

    fn record(team1_wins: u32, team2_wins: u32, draws: u32) -> HeadToHeadRecord {
        HeadToHeadRecord {
            team1: "Arsenal".into(),
            team2: "Chelsea".into(),
            sport_key: "soccer_epl".into(),
            total_matches: team1_wins + team2_wins + draws,
            team1_wins,
            team2_wins,
            draws,
            recent_results: Vec::new(),
            fetched_at: Utc::now(),
        }
    }

    fn outcome(o: H2hOutcome) -> H2hResult {
        H2hResult {
            outcome: o,
            date: Utc::now(),
        }
    }

    #[test]
    fn base_share_without_recency() {
        // 6 wins, 2 losses, 2 draws: 0.6 + 0.5*0.2 = 0.7
        let r = record(6, 2, 2);
        let got = h2h_score(Some(&r), "Arsenal", 50.0);
        assert!((got - 70.0).abs() < 1e-9);
        // Opposite perspective: 0.2 + 0.1 = 0.3
        let other = h2h_score(Some(&r), "Chelsea", 50.0);
        assert!((other - 30.0).abs() < 1e-9);
    }

    #[test]
    fn suffixed_name_resolves_through_normalizer() {
        let r = record(6, 2, 2);
        let got = h2h_score(Some(&r), "Arsenal FC", 50.0);
        assert!((got - 70.0).abs() < 1e-9);
    }

    #[test]
    fn recency_blend_rewards_recent_wins() {
        // Historically even, but team1 took the last three meetings.
        let mut r = record(5, 5, 0);
        r.recent_results = vec![
            outcome(H2hOutcome::Team2),
            outcome(H2hOutcome::Team1),
            outcome(H2hOutcome::Team1),
            outcome(H2hOutcome::Team1),
        ];
        // base 50, recent share 3/4 -> 0.7*50 + 0.3*75 = 57.5
        let got = h2h_score(Some(&r), "Arsenal", 50.0);
        assert!((got - 57.5).abs() < 1e-9);
    }

    #[test]
    fn too_few_recent_meetings_skip_the_blend() {
        let mut r = record(5, 5, 0);
        r.recent_results = vec![outcome(H2hOutcome::Team1), outcome(H2hOutcome::Team1)];
        assert!((h2h_score(Some(&r), "Arsenal", 50.0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_team_or_empty_record_is_neutral() {
        assert_eq!(h2h_score(None, "Arsenal", 50.0), 50.0);
        let r = record(0, 0, 0);
        assert_eq!(h2h_score(Some(&r), "Arsenal", 50.0), 50.0);
        let r = record(5, 5, 0);
        assert_eq!(h2h_score(Some(&r), "Tottenham", 50.0), 50.0);
    }
}
