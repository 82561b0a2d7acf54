//! Postgres store backend
//!
//! Atomicity contracts:
//! - `predictions.fixture_id` carries a unique constraint; write-once is
//!   `INSERT .. ON CONFLICT DO NOTHING`, not check-then-insert.
//! - merge-upsert runs in a transaction with `SELECT .. FOR UPDATE`, so
//!   overlapping job runs serialize per fixture.
//! - verification is a single conditional `UPDATE .. WHERE verified_at
//!   IS NULL`.
//!
//! Nested collections (bookmakers, live score, recent results) are
//! jsonb columns; see schema.sql at the workspace root.

use super::{FixtureStore, LinkStore, PredictionStore, StatsStore, StoreError};
use crate::models::{
    Fixture, HeadToHeadRecord, MatchLink, Prediction, TeamHistoricalStats, Winner,
};
use crate::store::merge::merge_fixture;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::info;

/// Create the connection pool with the settings every service shares.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(
            std::env::var("DB_POOL_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        )
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(database_url)
        .await
        .context("Failed to create database pool")?;
    info!("Database pool created");
    Ok(pool)
}

fn row_to_fixture(row: &PgRow) -> Result<Fixture, StoreError> {
    let bookmakers: serde_json::Value = row.try_get("bookmakers")?;
    let live_score: Option<serde_json::Value> = row.try_get("live_score")?;
    Ok(Fixture {
        fixture_id: row.try_get("fixture_id")?,
        sport_key: row.try_get("sport_key")?,
        sport_title: row.try_get("sport_title")?,
        home_team: row.try_get("home_team")?,
        away_team: row.try_get("away_team")?,
        commence_time: row.try_get("commence_time")?,
        bookmakers: serde_json::from_value(bookmakers)?,
        live_score: live_score.map(serde_json::from_value).transpose()?,
        completed: row.try_get("completed")?,
        home_logo: row.try_get("home_logo")?,
        away_logo: row.try_get("away_logo")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn write_fixture<'e, E>(executor: E, f: &Fixture) -> Result<(), StoreError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO fixtures (
            fixture_id, sport_key, sport_title, home_team, away_team,
            commence_time, bookmakers, live_score, completed,
            home_logo, away_logo, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ON CONFLICT (fixture_id) DO UPDATE SET
            sport_title = EXCLUDED.sport_title,
            bookmakers = EXCLUDED.bookmakers,
            live_score = EXCLUDED.live_score,
            completed = EXCLUDED.completed,
            home_logo = EXCLUDED.home_logo,
            away_logo = EXCLUDED.away_logo,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(&f.fixture_id)
    .bind(&f.sport_key)
    .bind(&f.sport_title)
    .bind(&f.home_team)
    .bind(&f.away_team)
    .bind(f.commence_time)
    .bind(serde_json::to_value(&f.bookmakers)?)
    .bind(
        f.live_score
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?,
    )
    .bind(f.completed)
    .bind(&f.home_logo)
    .bind(&f.away_logo)
    .bind(f.created_at)
    .bind(f.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub struct PgFixtureStore {
    pool: PgPool,
}

impl PgFixtureStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FixtureStore for PgFixtureStore {
    async fn find_by_id(&self, fixture_id: &str) -> Result<Option<Fixture>, StoreError> {
        let row = sqlx::query("SELECT * FROM fixtures WHERE fixture_id = $1")
            .bind(fixture_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_fixture).transpose()
    }

    async fn upsert(&self, incoming: Fixture) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT * FROM fixtures WHERE fixture_id = $1 FOR UPDATE")
            .bind(&incoming.fixture_id)
            .fetch_optional(&mut *tx)
            .await?;

        let merged = match existing {
            Some(row) => {
                let mut fixture = row_to_fixture(&row)?;
                merge_fixture(&mut fixture, incoming, Utc::now());
                fixture
            }
            None => incoming,
        };
        write_fixture(&mut *tx, &merged).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_upcoming(&self, now: DateTime<Utc>) -> Result<Vec<Fixture>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM fixtures
             WHERE commence_time > $1 AND completed = false
             ORDER BY commence_time",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_fixture).collect()
    }

    async fn find_linkable(
        &self,
        around: DateTime<Utc>,
        window_hours: i64,
    ) -> Result<Vec<Fixture>, StoreError> {
        let window = Duration::hours(window_hours);
        let rows = sqlx::query(
            r#"
            SELECT * FROM fixtures
            WHERE (commence_time BETWEEN $1 AND $2)
               OR (completed = false AND (live_score->>'is_live')::boolean = true)
            "#,
        )
        .bind(around - window)
        .bind(around + window)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_fixture).collect()
    }

    async fn find_final_score_by_teams(
        &self,
        home_team: &str,
        away_team: &str,
        sport_key: &str,
    ) -> Result<Option<(i32, i32)>, StoreError> {
        use crate::matching::normalize::names_equal;

        // Name normalization lives in Rust, so filter coarsely by sport
        // and finish the match in memory.
        let rows = sqlx::query(
            "SELECT * FROM fixtures
             WHERE sport_key = $1 AND live_score IS NOT NULL",
        )
        .bind(sport_key)
        .fetch_all(&self.pool)
        .await?;

        for row in &rows {
            let fixture = row_to_fixture(row)?;
            if names_equal(&fixture.home_team, home_team)
                && names_equal(&fixture.away_team, away_team)
            {
                if let Some(score) = fixture.final_score() {
                    return Ok(Some(score));
                }
            }
        }
        Ok(None)
    }

    async fn sweep_stuck_live(
        &self,
        now: DateTime<Utc>,
        threshold_hours: i64,
    ) -> Result<u64, StoreError> {
        let cutoff = now - Duration::hours(threshold_hours);
        let result = sqlx::query(
            r#"
            UPDATE fixtures
            SET completed = true,
                live_score = jsonb_set(live_score, '{is_live}', 'false'),
                updated_at = $1
            WHERE completed = false
              AND (live_score->>'is_live')::boolean = true
              AND commence_time < $2
            "#,
        )
        .bind(now)
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

fn row_to_prediction(row: &PgRow) -> Result<Prediction, StoreError> {
    let home_components: serde_json::Value = row.try_get("home_components")?;
    let away_components: serde_json::Value = row.try_get("away_components")?;
    let predicted_winner: String = row.try_get("predicted_winner")?;
    let confidence: String = row.try_get("confidence")?;
    let actual_winner: Option<String> = row.try_get("actual_winner")?;
    Ok(Prediction {
        fixture_id: row.try_get("fixture_id")?,
        sport_key: row.try_get("sport_key")?,
        home_team: row.try_get("home_team")?,
        away_team: row.try_get("away_team")?,
        home_iq: row.try_get("home_iq")?,
        away_iq: row.try_get("away_iq")?,
        draw_iq: row.try_get("draw_iq")?,
        home_components: serde_json::from_value(home_components)?,
        away_components: serde_json::from_value(away_components)?,
        predicted_winner: predicted_winner.parse().map_err(StoreError::Decode)?,
        confidence: confidence.parse().map_err(StoreError::Decode)?,
        calculated_at: row.try_get("calculated_at")?,
        actual_winner: actual_winner
            .map(|w| w.parse().map_err(StoreError::Decode))
            .transpose()?,
        prediction_correct: row.try_get("prediction_correct")?,
        verified_at: row.try_get("verified_at")?,
    })
}

pub struct PgPredictionStore {
    pool: PgPool,
}

impl PgPredictionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PredictionStore for PgPredictionStore {
    async fn insert_if_absent(&self, p: Prediction) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO predictions (
                fixture_id, sport_key, home_team, away_team,
                home_iq, away_iq, draw_iq,
                home_components, away_components,
                predicted_winner, confidence, calculated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (fixture_id) DO NOTHING
            "#,
        )
        .bind(&p.fixture_id)
        .bind(&p.sport_key)
        .bind(&p.home_team)
        .bind(&p.away_team)
        .bind(p.home_iq)
        .bind(p.away_iq)
        .bind(p.draw_iq)
        .bind(serde_json::to_value(p.home_components)?)
        .bind(serde_json::to_value(p.away_components)?)
        .bind(p.predicted_winner.as_str())
        .bind(p.confidence.as_str())
        .bind(p.calculated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_fixture(&self, fixture_id: &str) -> Result<Option<Prediction>, StoreError> {
        let row = sqlx::query("SELECT * FROM predictions WHERE fixture_id = $1")
            .bind(fixture_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_prediction).transpose()
    }

    async fn find_unverified(&self) -> Result<Vec<Prediction>, StoreError> {
        let rows = sqlx::query("SELECT * FROM predictions WHERE verified_at IS NULL")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_prediction).collect()
    }

    async fn find_verified(&self) -> Result<Vec<Prediction>, StoreError> {
        let rows = sqlx::query("SELECT * FROM predictions WHERE verified_at IS NOT NULL")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_prediction).collect()
    }

    async fn mark_verified(
        &self,
        fixture_id: &str,
        actual_winner: Winner,
        prediction_correct: bool,
        verified_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE predictions
            SET actual_winner = $2,
                prediction_correct = $3,
                verified_at = $4
            WHERE fixture_id = $1 AND verified_at IS NULL
            "#,
        )
        .bind(fixture_id)
        .bind(actual_winner.as_str())
        .bind(prediction_correct)
        .bind(verified_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_team_stats(row: &PgRow) -> Result<TeamHistoricalStats, StoreError> {
    let recent_form: serde_json::Value = row.try_get("recent_form")?;
    let recent_results: serde_json::Value = row.try_get("recent_results")?;
    Ok(TeamHistoricalStats {
        team_name: row.try_get("team_name")?,
        sport_key: row.try_get("sport_key")?,
        total_games: row.try_get::<i32, _>("total_games")? as u32,
        wins: row.try_get::<i32, _>("wins")? as u32,
        draws: row.try_get::<i32, _>("draws")? as u32,
        losses: row.try_get::<i32, _>("losses")? as u32,
        home_wins: row.try_get::<i32, _>("home_wins")? as u32,
        away_wins: row.try_get::<i32, _>("away_wins")? as u32,
        goals_for: row.try_get("goals_for")?,
        goals_against: row.try_get("goals_against")?,
        recent_form: serde_json::from_value(recent_form)?,
        recent_results: serde_json::from_value(recent_results)?,
        fetched_at: row.try_get("fetched_at")?,
    })
}

fn row_to_h2h(row: &PgRow) -> Result<HeadToHeadRecord, StoreError> {
    let recent_results: serde_json::Value = row.try_get("recent_results")?;
    Ok(HeadToHeadRecord {
        team1: row.try_get("team1")?,
        team2: row.try_get("team2")?,
        sport_key: row.try_get("sport_key")?,
        total_matches: row.try_get::<i32, _>("total_matches")? as u32,
        team1_wins: row.try_get::<i32, _>("team1_wins")? as u32,
        team2_wins: row.try_get::<i32, _>("team2_wins")? as u32,
        draws: row.try_get::<i32, _>("draws")? as u32,
        recent_results: serde_json::from_value(recent_results)?,
        fetched_at: row.try_get("fetched_at")?,
    })
}

pub struct PgStatsStore {
    pool: PgPool,
}

impl PgStatsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatsStore for PgStatsStore {
    async fn put_team_stats(&self, s: TeamHistoricalStats) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO team_stats (
                team_name, sport_key, total_games, wins, draws, losses,
                home_wins, away_wins, goals_for, goals_against,
                recent_form, recent_results, fetched_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (team_name, sport_key) DO UPDATE SET
                total_games = EXCLUDED.total_games,
                wins = EXCLUDED.wins,
                draws = EXCLUDED.draws,
                losses = EXCLUDED.losses,
                home_wins = EXCLUDED.home_wins,
                away_wins = EXCLUDED.away_wins,
                goals_for = EXCLUDED.goals_for,
                goals_against = EXCLUDED.goals_against,
                recent_form = EXCLUDED.recent_form,
                recent_results = EXCLUDED.recent_results,
                fetched_at = EXCLUDED.fetched_at
            "#,
        )
        .bind(&s.team_name)
        .bind(&s.sport_key)
        .bind(s.total_games as i32)
        .bind(s.wins as i32)
        .bind(s.draws as i32)
        .bind(s.losses as i32)
        .bind(s.home_wins as i32)
        .bind(s.away_wins as i32)
        .bind(s.goals_for)
        .bind(s.goals_against)
        .bind(serde_json::to_value(&s.recent_form)?)
        .bind(serde_json::to_value(&s.recent_results)?)
        .bind(s.fetched_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_team_stats(
        &self,
        team_name: &str,
        sport_key: &str,
    ) -> Result<Option<TeamHistoricalStats>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM team_stats WHERE lower(team_name) = lower($1) AND sport_key = $2",
        )
        .bind(team_name)
        .bind(sport_key)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_team_stats).transpose()
    }

    async fn put_h2h(&self, r: HeadToHeadRecord) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Keep the first observed order authoritative: a refresh under
        // the reversed pair updates the stored row instead.
        let reversed: Option<PgRow> = sqlx::query(
            "SELECT team1 FROM h2h_records
             WHERE lower(team1) = lower($1) AND lower(team2) = lower($2) AND sport_key = $3
             FOR UPDATE",
        )
        .bind(&r.team2)
        .bind(&r.team1)
        .bind(&r.sport_key)
        .fetch_optional(&mut *tx)
        .await?;

        let (team1, team2) = if reversed.is_some() {
            (r.team2.clone(), r.team1.clone())
        } else {
            (r.team1.clone(), r.team2.clone())
        };

        sqlx::query(
            r#"
            INSERT INTO h2h_records (
                team1, team2, sport_key, total_matches,
                team1_wins, team2_wins, draws, recent_results, fetched_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (team1, team2, sport_key) DO UPDATE SET
                total_matches = EXCLUDED.total_matches,
                team1_wins = EXCLUDED.team1_wins,
                team2_wins = EXCLUDED.team2_wins,
                draws = EXCLUDED.draws,
                recent_results = EXCLUDED.recent_results,
                fetched_at = EXCLUDED.fetched_at
            "#,
        )
        .bind(&team1)
        .bind(&team2)
        .bind(&r.sport_key)
        .bind(r.total_matches as i32)
        .bind(r.team1_wins as i32)
        .bind(r.team2_wins as i32)
        .bind(r.draws as i32)
        .bind(serde_json::to_value(&r.recent_results)?)
        .bind(r.fetched_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_h2h(
        &self,
        team_a: &str,
        team_b: &str,
        sport_key: &str,
    ) -> Result<Option<HeadToHeadRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT * FROM h2h_records
            WHERE sport_key = $3
              AND ((lower(team1) = lower($1) AND lower(team2) = lower($2))
                OR (lower(team1) = lower($2) AND lower(team2) = lower($1)))
            "#,
        )
        .bind(team_a)
        .bind(team_b)
        .bind(sport_key)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_h2h).transpose()
    }
}

pub struct PgLinkStore {
    pool: PgPool,
}

impl PgLinkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkStore for PgLinkStore {
    async fn insert_if_absent(&self, link: MatchLink) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO match_links (provider, provider_event_id, fixture_id, linked_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (provider, provider_event_id) DO NOTHING
            "#,
        )
        .bind(&link.provider)
        .bind(&link.provider_event_id)
        .bind(&link.fixture_id)
        .bind(link.linked_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find(
        &self,
        provider: &str,
        provider_event_id: &str,
    ) -> Result<Option<MatchLink>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM match_links WHERE provider = $1 AND provider_event_id = $2",
        )
        .bind(provider)
        .bind(provider_event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row
            .map(|r| -> Result<MatchLink, StoreError> {
                Ok(MatchLink {
                    provider: r.try_get("provider")?,
                    provider_event_id: r.try_get("provider_event_id")?,
                    fixture_id: r.try_get("fixture_id")?,
                    linked_at: r.try_get("linked_at")?,
                })
            })
            .transpose()?)
    }
}
