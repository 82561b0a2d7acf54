//! In-memory store backend
//!
//! Backs tests and local runs. Each operation takes the collection lock
//! for its whole duration, which gives the same per-key atomicity the
//! Postgres backend gets from transactions and unique constraints.

use super::{FixtureStore, LinkStore, PredictionStore, StatsStore, StoreError};
use crate::matching::normalize::names_equal;
use crate::models::{
    Fixture, HeadToHeadRecord, MatchLink, Prediction, TeamHistoricalStats, Winner,
};
use crate::store::merge::merge_fixture;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryFixtureStore {
    fixtures: RwLock<HashMap<String, Fixture>>,
}

impl MemoryFixtureStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FixtureStore for MemoryFixtureStore {
    async fn find_by_id(&self, fixture_id: &str) -> Result<Option<Fixture>, StoreError> {
        Ok(self.fixtures.read().get(fixture_id).cloned())
    }

    async fn upsert(&self, incoming: Fixture) -> Result<(), StoreError> {
        let mut fixtures = self.fixtures.write();
        match fixtures.get_mut(&incoming.fixture_id) {
            Some(existing) => merge_fixture(existing, incoming, Utc::now()),
            None => {
                fixtures.insert(incoming.fixture_id.clone(), incoming);
            }
        }
        Ok(())
    }

    async fn find_upcoming(&self, now: DateTime<Utc>) -> Result<Vec<Fixture>, StoreError> {
        let mut upcoming: Vec<Fixture> = self
            .fixtures
            .read()
            .values()
            .filter(|f| f.commence_time > now && !f.completed)
            .cloned()
            .collect();
        upcoming.sort_by_key(|f| f.commence_time);
        Ok(upcoming)
    }

    async fn find_linkable(
        &self,
        around: DateTime<Utc>,
        window_hours: i64,
    ) -> Result<Vec<Fixture>, StoreError> {
        let window = Duration::hours(window_hours);
        Ok(self
            .fixtures
            .read()
            .values()
            .filter(|f| {
                let delta = (f.commence_time - around).abs();
                delta <= window || f.is_live()
            })
            .cloned()
            .collect())
    }

    async fn find_final_score_by_teams(
        &self,
        home_team: &str,
        away_team: &str,
        sport_key: &str,
    ) -> Result<Option<(i32, i32)>, StoreError> {
        Ok(self
            .fixtures
            .read()
            .values()
            .filter(|f| f.sport_key == sport_key)
            .filter(|f| {
                names_equal(&f.home_team, home_team) && names_equal(&f.away_team, away_team)
            })
            .find_map(|f| f.final_score()))
    }

    async fn sweep_stuck_live(
        &self,
        now: DateTime<Utc>,
        threshold_hours: i64,
    ) -> Result<u64, StoreError> {
        let cutoff = now - Duration::hours(threshold_hours);
        let mut swept = 0;
        for fixture in self.fixtures.write().values_mut() {
            if !fixture.completed && fixture.is_live() && fixture.commence_time < cutoff {
                fixture.completed = true;
                if let Some(score) = fixture.live_score.as_mut() {
                    score.is_live = false;
                }
                fixture.updated_at = now;
                swept += 1;
            }
        }
        Ok(swept)
    }
}

#[derive(Default)]
pub struct MemoryPredictionStore {
    predictions: RwLock<HashMap<String, Prediction>>,
}

impl MemoryPredictionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PredictionStore for MemoryPredictionStore {
    async fn insert_if_absent(&self, prediction: Prediction) -> Result<bool, StoreError> {
        let mut predictions = self.predictions.write();
        if predictions.contains_key(&prediction.fixture_id) {
            return Ok(false);
        }
        predictions.insert(prediction.fixture_id.clone(), prediction);
        Ok(true)
    }

    async fn find_by_fixture(&self, fixture_id: &str) -> Result<Option<Prediction>, StoreError> {
        Ok(self.predictions.read().get(fixture_id).cloned())
    }

    async fn find_unverified(&self) -> Result<Vec<Prediction>, StoreError> {
        Ok(self
            .predictions
            .read()
            .values()
            .filter(|p| !p.is_verified())
            .cloned()
            .collect())
    }

    async fn find_verified(&self) -> Result<Vec<Prediction>, StoreError> {
        Ok(self
            .predictions
            .read()
            .values()
            .filter(|p| p.is_verified())
            .cloned()
            .collect())
    }

    async fn mark_verified(
        &self,
        fixture_id: &str,
        actual_winner: Winner,
        prediction_correct: bool,
        verified_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut predictions = self.predictions.write();
        match predictions.get_mut(fixture_id) {
            Some(p) if !p.is_verified() => {
                p.actual_winner = Some(actual_winner);
                p.prediction_correct = Some(prediction_correct);
                p.verified_at = Some(verified_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

fn stats_key(team_name: &str, sport_key: &str) -> String {
    format!("{}:{}", sport_key, team_name.to_lowercase())
}

fn h2h_key(team1: &str, team2: &str, sport_key: &str) -> String {
    format!(
        "{}:{}:{}",
        sport_key,
        team1.to_lowercase(),
        team2.to_lowercase()
    )
}

#[derive(Default)]
pub struct MemoryStatsStore {
    team_stats: RwLock<HashMap<String, TeamHistoricalStats>>,
    h2h: RwLock<HashMap<String, HeadToHeadRecord>>,
}

impl MemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatsStore for MemoryStatsStore {
    async fn put_team_stats(&self, stats: TeamHistoricalStats) -> Result<(), StoreError> {
        let key = stats_key(&stats.team_name, &stats.sport_key);
        self.team_stats.write().insert(key, stats);
        Ok(())
    }

    async fn find_team_stats(
        &self,
        team_name: &str,
        sport_key: &str,
    ) -> Result<Option<TeamHistoricalStats>, StoreError> {
        Ok(self
            .team_stats
            .read()
            .get(&stats_key(team_name, sport_key))
            .cloned())
    }

    async fn put_h2h(&self, record: HeadToHeadRecord) -> Result<(), StoreError> {
        // The first observed order stays authoritative: a refresh for
        // the reversed pair lands on the same slot.
        let mut h2h = self.h2h.write();
        let reversed = h2h_key(&record.team2, &record.team1, &record.sport_key);
        if h2h.contains_key(&reversed) {
            h2h.insert(reversed, record);
        } else {
            let key = h2h_key(&record.team1, &record.team2, &record.sport_key);
            h2h.insert(key, record);
        }
        Ok(())
    }

    async fn find_h2h(
        &self,
        team_a: &str,
        team_b: &str,
        sport_key: &str,
    ) -> Result<Option<HeadToHeadRecord>, StoreError> {
        let h2h = self.h2h.read();
        Ok(h2h
            .get(&h2h_key(team_a, team_b, sport_key))
            .or_else(|| h2h.get(&h2h_key(team_b, team_a, sport_key)))
            .cloned())
    }
}

#[derive(Default)]
pub struct MemoryLinkStore {
    links: RwLock<HashMap<(String, String), MatchLink>>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn insert_if_absent(&self, link: MatchLink) -> Result<bool, StoreError> {
        let key = (link.provider.clone(), link.provider_event_id.clone());
        let mut links = self.links.write();
        if links.contains_key(&key) {
            return Ok(false);
        }
        links.insert(key, link);
        Ok(true)
    }

    async fn find(
        &self,
        provider: &str,
        provider_event_id: &str,
    ) -> Result<Option<MatchLink>, StoreError> {
        Ok(self
            .links
            .read()
            .get(&(provider.to_string(), provider_event_id.to_string()))
            .cloned())
    }
}
