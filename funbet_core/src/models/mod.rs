//! Core domain records for fixture aggregation and scoring
//!
//! Defines the canonical merged fixture record, per-team historical
//! stats, head-to-head aggregates, and the immutable prediction record.
//! All records are serde-serializable; nested collections are stored as
//! jsonb in the Postgres backend.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub mod sport;

pub use sport::{has_draw_outcome, verification_grace_hours};

/// One priced outcome within a bookmaker's head-to-head market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomePrice {
    /// Outcome name as the bookmaker reports it (team name or "Draw")
    pub name: String,
    /// Decimal price
    pub price: f64,
}

/// One bookmaker's current head-to-head market for a fixture.
///
/// Entries are replaced wholesale per `source_key` on refresh; the
/// fixture-level list is append-only across sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmakerOdds {
    /// Bookmaker identifier from the odds provider
    pub source_key: String,
    pub outcomes: Vec<OutcomePrice>,
    pub last_update: DateTime<Utc>,
}

/// Latest observed score for a fixture, last-writer-wins from linked
/// providers only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveScore {
    pub home_score: i32,
    pub away_score: i32,
    /// Provider's human-readable status ("2nd Half", "Stumps", ...)
    pub status_text: String,
    pub is_live: bool,
    pub completed: bool,
    /// Which provider supplied this score
    pub source: String,
    pub updated_at: DateTime<Utc>,
}

/// One real-world sporting event, merged across providers.
///
/// Identity fields (`fixture_id`, teams, `commence_time`) are set by the
/// provider that first created the record and are never contradicted by
/// a later merge. Only odds, scores, completion and enrichment fields
/// change post-creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub fixture_id: String,
    /// League/competition identifier (e.g. "soccer_epl", "cricket_t20")
    pub sport_key: String,
    /// League display name, enrichment field
    pub sport_title: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: DateTime<Utc>,
    pub bookmakers: Vec<BookmakerOdds>,
    pub live_score: Option<LiveScore>,
    /// Monotonic: once true, never reverts
    pub completed: bool,
    pub home_logo: Option<String>,
    pub away_logo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Fixture {
    /// Collect the prices every bookmaker quotes for the named outcome.
    pub fn prices_for_outcome(&self, outcome_name: &str) -> Vec<f64> {
        let wanted = outcome_name.to_lowercase();
        self.bookmakers
            .iter()
            .filter_map(|b| {
                b.outcomes
                    .iter()
                    .find(|o| o.name.to_lowercase() == wanted)
                    .map(|o| o.price)
            })
            .filter(|p| *p > 1.0)
            .collect()
    }

    /// Final (home, away) score, present only once the fixture is done.
    pub fn final_score(&self) -> Option<(i32, i32)> {
        match &self.live_score {
            Some(s) if s.completed || self.completed => Some((s.home_score, s.away_score)),
            _ => None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.live_score.as_ref().map_or(false, |s| s.is_live) && !self.completed
    }
}

/// Match outcome from one side's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormResult {
    Win,
    Draw,
    Loss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Venue {
    Home,
    Away,
}

/// One game in a team's recent history, most-recent-last in sequences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentResult {
    pub result: FormResult,
    pub venue: Venue,
    pub goals_for: i32,
    pub goals_against: i32,
    pub date: DateTime<Utc>,
}

/// Cap applied to `recent_form` and `recent_results` sequences.
pub const RECENT_RESULTS_CAP: usize = 10;

/// Aggregated historical record per (team_name, sport_key).
///
/// Refreshed wholesale from a stats provider; never updated
/// incrementally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamHistoricalStats {
    pub team_name: String,
    pub sport_key: String,
    pub total_games: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub home_wins: u32,
    pub away_wins: u32,
    pub goals_for: i64,
    pub goals_against: i64,
    /// Outcome symbols for the last 10 games, most-recent-last
    pub recent_form: Vec<FormResult>,
    /// Detailed results for the last 10 games, most-recent-last
    pub recent_results: Vec<RecentResult>,
    pub fetched_at: DateTime<Utc>,
}

impl TeamHistoricalStats {
    /// Whether the record is older than the refetch threshold.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        now - self.fetched_at > threshold
    }

    /// Enforce the recent-sequence caps after a wholesale refresh.
    pub fn truncate_recent(&mut self) {
        if self.recent_form.len() > RECENT_RESULTS_CAP {
            let excess = self.recent_form.len() - RECENT_RESULTS_CAP;
            self.recent_form.drain(..excess);
        }
        if self.recent_results.len() > RECENT_RESULTS_CAP {
            let excess = self.recent_results.len() - RECENT_RESULTS_CAP;
            self.recent_results.drain(..excess);
        }
    }
}

/// Winner of one past head-to-head meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum H2hOutcome {
    Team1,
    Team2,
    Draw,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct H2hResult {
    pub outcome: H2hOutcome,
    pub date: DateTime<Utc>,
}

/// Aggregated record per unordered team pair.
///
/// The order observed from the first provider is authoritative; lookups
/// must try both orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadToHeadRecord {
    pub team1: String,
    pub team2: String,
    pub sport_key: String,
    pub total_matches: u32,
    pub team1_wins: u32,
    pub team2_wins: u32,
    pub draws: u32,
    /// Most-recent-last, capped at 10
    pub recent_results: Vec<H2hResult>,
    pub fetched_at: DateTime<Utc>,
}

/// Predicted or actual match winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Home,
    Away,
    Draw,
}

impl Winner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Away => "away",
            Self::Draw => "draw",
        }
    }
}

impl std::str::FromStr for Winner {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home" => Ok(Self::Home),
            "away" => Ok(Self::Away),
            "draw" => Ok(Self::Draw),
            other => Err(format!("unknown winner: {other}")),
        }
    }
}

/// Confidence band derived from the IQ gap between sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::str::FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown confidence: {other}")),
        }
    }
}

/// The six named sub-scores behind one side's composite IQ.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IqComponents {
    pub odds: f64,
    pub volume: f64,
    pub movement: f64,
    pub team_stats: f64,
    pub momentum: f64,
    pub head_to_head: f64,
}

impl IqComponents {
    /// All-neutral components, used when every data source is absent.
    pub fn neutral() -> Self {
        Self {
            odds: 50.0,
            volume: 50.0,
            movement: 50.0,
            team_stats: 50.0,
            momentum: 50.0,
            head_to_head: 50.0,
        }
    }
}

/// One immutable pre-match prediction per fixture.
///
/// Every field except the three verification fields is frozen at
/// creation; the verification fields transition exactly once from unset
/// to set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub fixture_id: String,
    pub sport_key: String,
    pub home_team: String,
    pub away_team: String,
    pub home_iq: f64,
    pub away_iq: f64,
    /// Absent for sports without a draw outcome
    pub draw_iq: Option<f64>,
    pub home_components: IqComponents,
    pub away_components: IqComponents,
    pub predicted_winner: Winner,
    pub confidence: Confidence,
    /// Strictly before the fixture's commence_time
    pub calculated_at: DateTime<Utc>,
    pub actual_winner: Option<Winner>,
    pub prediction_correct: Option<bool>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl Prediction {
    pub fn is_verified(&self) -> bool {
        self.verified_at.is_some()
    }

    /// The winner this prediction backs, as the verification engine
    /// reads it: argmax of home/away/draw IQ.
    pub fn predicted_side(&self) -> Winner {
        let draw = self.draw_iq.unwrap_or(0.0);
        if self.home_iq >= self.away_iq && self.home_iq >= draw {
            Winner::Home
        } else if self.away_iq >= self.home_iq && self.away_iq >= draw {
            Winner::Away
        } else {
            Winner::Draw
        }
    }
}

/// A persisted linking decision: one provider's event id resolved to a
/// canonical fixture. Written once, reused on every later poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchLink {
    pub provider: String,
    pub provider_event_id: String,
    pub fixture_id: String,
    pub linked_at: DateTime<Utc>,
}
