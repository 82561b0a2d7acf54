//! Provider adapter abstractions
//!
//! Every external data source is wrapped in an adapter that returns
//! normalized records and swallows its own failures: a broken provider
//! yields an empty list for this cycle, never an error past this
//! boundary and never a structurally-complete record holding zeroed
//! data. Previously stored data is untouched by a failed fetch.

use crate::models::{BookmakerOdds, Fixture, HeadToHeadRecord, TeamHistoricalStats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod odds_api;

pub use odds_api::OddsApiProvider;

/// One fixture record as a provider reports it, already converted from
/// the provider's raw payload shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedFixture {
    /// Adapter identifier ("odds_api", "livescore", ...)
    pub provider: String,
    /// The provider's own id for this event
    pub provider_event_id: String,
    pub sport_key: String,
    /// League display name, when the provider supplies one
    pub sport_title: Option<String>,
    pub home_team: String,
    pub away_team: String,
    /// Absent for live-score providers with no reliable timing
    pub commence_time: Option<DateTime<Utc>>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub status_text: Option<String>,
    pub is_live: bool,
    pub completed: bool,
    pub bookmakers: Vec<BookmakerOdds>,
}

impl NormalizedFixture {
    /// Build the canonical fixture this record creates when it is the
    /// first (primary) observation of the event.
    pub fn into_fixture(self, now: DateTime<Utc>) -> Fixture {
        let live_score = match (self.home_score, self.away_score) {
            (Some(home), Some(away)) => Some(crate::models::LiveScore {
                home_score: home,
                away_score: away,
                status_text: self.status_text.unwrap_or_default(),
                is_live: self.is_live,
                completed: self.completed,
                source: self.provider.clone(),
                updated_at: now,
            }),
            _ => None,
        };

        Fixture {
            fixture_id: self.provider_event_id,
            sport_key: self.sport_key,
            sport_title: self.sport_title,
            home_team: self.home_team,
            away_team: self.away_team,
            commence_time: self.commence_time.unwrap_or(now),
            bookmakers: self.bookmakers,
            live_score,
            completed: self.completed,
            home_logo: None,
            away_logo: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A source of fixture records (odds or live scores).
#[async_trait]
pub trait FixtureProvider: Send + Sync {
    /// Fetch the provider's current view. Returns an empty list on any
    /// failure; errors never cross this boundary.
    async fn fetch(&self) -> Vec<NormalizedFixture>;

    /// Adapter name for logging and link-decision keys
    fn provider_name(&self) -> &str;
}

/// A source of historical team stats and head-to-head aggregates.
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Wholesale stats snapshot for one team, or None on failure.
    async fn fetch_team_stats(
        &self,
        team_name: &str,
        sport_key: &str,
    ) -> Option<TeamHistoricalStats>;

    /// Head-to-head aggregate for a pair, or None on failure.
    async fn fetch_head_to_head(
        &self,
        team_a: &str,
        team_b: &str,
        sport_key: &str,
    ) -> Option<HeadToHeadRecord>;

    fn provider_name(&self) -> &str;
}
