//! Storage traits for fixtures, predictions, stats and link decisions
//!
//! The store is the serialization point for the whole system: every
//! cross-job coordination happens through atomic upsert-by-key or
//! insert-if-absent operations here, never through in-process locks in
//! the engines. Two backends implement these traits: an in-memory store
//! (tests, local runs) and Postgres (production).

use crate::models::{
    Fixture, HeadToHeadRecord, MatchLink, Prediction, TeamHistoricalStats, Winner,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod memory;
pub mod merge;
pub mod postgres;

pub use memory::{MemoryFixtureStore, MemoryLinkStore, MemoryPredictionStore, MemoryStatsStore};
pub use merge::merge_fixture;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("decode error: {0}")]
    Decode(String),
}

/// Canonical, time-indexed collection of merged fixture records.
#[async_trait]
pub trait FixtureStore: Send + Sync {
    async fn find_by_id(&self, fixture_id: &str) -> Result<Option<Fixture>, StoreError>;

    /// Merge-upsert keyed by fixture_id. Inserts as-is when absent;
    /// otherwise merges per the discipline in [`merge::merge_fixture`].
    /// Atomic per fixture.
    async fn upsert(&self, incoming: Fixture) -> Result<(), StoreError>;

    /// Fixtures with commence_time strictly after `now`, the scoring
    /// engine's eligible set.
    async fn find_upcoming(&self, now: DateTime<Utc>) -> Result<Vec<Fixture>, StoreError>;

    /// Candidate pool for linking: fixtures whose commence_time is
    /// within ±`window_hours` of `around`, or which are currently live.
    async fn find_linkable(
        &self,
        around: DateTime<Utc>,
        window_hours: i64,
    ) -> Result<Vec<Fixture>, StoreError>;

    /// Final (home, away) score from any completed record whose team
    /// names match after normalization. Read-only; used by verification
    /// when the prediction's own fixture lacks a final score.
    async fn find_final_score_by_teams(
        &self,
        home_team: &str,
        away_team: &str,
        sport_key: &str,
    ) -> Result<Option<(i32, i32)>, StoreError>;

    /// Stuck-live sweep: force-complete fixtures still flagged live
    /// more than `threshold_hours` after their commence_time. Returns
    /// the number of fixtures swept.
    async fn sweep_stuck_live(
        &self,
        now: DateTime<Utc>,
        threshold_hours: i64,
    ) -> Result<u64, StoreError>;
}

/// Append-mostly collection of per-fixture prediction snapshots.
#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// Atomic insert-if-absent keyed by fixture_id, backed by a unique
    /// constraint. Returns false (and writes nothing) when a prediction
    /// already exists; this is what makes predictions write-once.
    async fn insert_if_absent(&self, prediction: Prediction) -> Result<bool, StoreError>;

    async fn find_by_fixture(&self, fixture_id: &str) -> Result<Option<Prediction>, StoreError>;

    async fn find_unverified(&self) -> Result<Vec<Prediction>, StoreError>;

    async fn find_verified(&self) -> Result<Vec<Prediction>, StoreError>;

    /// One-shot verification write: sets the three verification fields
    /// iff they are still unset. Returns false (no-op) when the
    /// prediction was already verified.
    async fn mark_verified(
        &self,
        fixture_id: &str,
        actual_winner: Winner,
        prediction_correct: bool,
        verified_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}

/// Historical stats and head-to-head aggregates, refreshed wholesale.
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn put_team_stats(&self, stats: TeamHistoricalStats) -> Result<(), StoreError>;

    async fn find_team_stats(
        &self,
        team_name: &str,
        sport_key: &str,
    ) -> Result<Option<TeamHistoricalStats>, StoreError>;

    async fn put_h2h(&self, record: HeadToHeadRecord) -> Result<(), StoreError>;

    /// Lookup tries both team orders; the stored order (first provider's
    /// home/away) is authoritative for which side is team1.
    async fn find_h2h(
        &self,
        team_a: &str,
        team_b: &str,
        sport_key: &str,
    ) -> Result<Option<HeadToHeadRecord>, StoreError>;
}

/// Persisted linking decisions keyed by (provider, provider_event_id).
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Returns false when a decision for the key already exists.
    async fn insert_if_absent(&self, link: MatchLink) -> Result<bool, StoreError>;

    async fn find(
        &self,
        provider: &str,
        provider_event_id: &str,
    ) -> Result<Option<MatchLink>, StoreError>;
}
