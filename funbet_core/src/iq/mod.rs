//! Composite scoring engine ("FunBet IQ")
//!
//! Computes a 0-100 confidence score per side of a fixture from six
//! weighted sub-scores, pins the result as an immutable pre-match
//! prediction, and never touches fixtures that have already started.
//! Every sub-score degrades to neutral 50 on missing data; the engine
//! produces a prediction for a fixture with no data at all rather than
//! failing.

use crate::config::ScoringConfig;
use crate::models::{
    has_draw_outcome, Confidence, Fixture, HeadToHeadRecord, IqComponents, Prediction,
    TeamHistoricalStats, Venue, Winner,
};
use crate::store::{FixtureStore, PredictionStore, StatsStore, StoreError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod form;
pub mod head_to_head;
pub mod market;

pub use form::{momentum_score, team_stats_score};
pub use head_to_head::h2h_score;
pub use market::{draw_score, movement_score, odds_score, volume_score};

/// Outcome counts from one batch pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchReport {
    /// Eligible fixtures considered
    pub total: usize,
    /// New predictions written
    pub calculated: usize,
    /// Fixtures that failed and were skipped
    pub errors: usize,
}

/// Weighted combiner over one side's sub-scores.
///
/// The ai-boost term is a secondary blend of the same components
/// rescaled to [0,10]; the external slot is a placeholder for a
/// third-party prediction signal and stays neutral until one is wired
/// in.
pub fn side_iq(components: &IqComponents, external: Option<f64>, config: &ScoringConfig) -> f64 {
    let ai_boost =
        (0.5 * components.odds + 0.3 * components.team_stats + 0.2 * components.momentum) / 10.0;
    let external = external.unwrap_or(config.neutral);

    let iq = config.odds_weight * components.odds
        + config.team_stats_weight * components.team_stats
        + config.momentum_weight * components.momentum
        + config.ai_boost_weight * ai_boost
        + config.external_weight * external;

    iq.clamp(0.0, 100.0)
}

/// Band the IQ gap between the winning score and the runner-up.
pub fn confidence_for_gap(gap: f64, config: &ScoringConfig) -> Confidence {
    if gap >= config.high_confidence_gap {
        Confidence::High
    } else if gap >= config.medium_confidence_gap {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

pub struct IqEngine {
    fixtures: Arc<dyn FixtureStore>,
    predictions: Arc<dyn PredictionStore>,
    stats: Arc<dyn StatsStore>,
    config: ScoringConfig,
}

impl IqEngine {
    pub fn new(
        fixtures: Arc<dyn FixtureStore>,
        predictions: Arc<dyn PredictionStore>,
        stats: Arc<dyn StatsStore>,
        config: ScoringConfig,
    ) -> Self {
        Self {
            fixtures,
            predictions,
            stats,
            config,
        }
    }

    /// One batch pass: score every strictly-upcoming fixture that has no
    /// prediction yet. Per-fixture failures are tallied and skipped so
    /// one bad record cannot starve the rest of the batch.
    pub async fn run_batch(&self, now: DateTime<Utc>) -> Result<BatchReport, StoreError> {
        let upcoming = self.fixtures.find_upcoming(now).await?;
        let mut report = BatchReport {
            total: upcoming.len(),
            ..Default::default()
        };

        for fixture in upcoming {
            match self.predictions.find_by_fixture(&fixture.fixture_id).await {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => {
                    warn!(fixture_id = %fixture.fixture_id, error = %e, "prediction lookup failed");
                    report.errors += 1;
                    continue;
                }
            }

            match self.score_fixture(&fixture, now).await {
                Ok(prediction) => {
                    // The unique key decides the race if another pass
                    // scored the same fixture concurrently.
                    match self.predictions.insert_if_absent(prediction).await {
                        Ok(true) => report.calculated += 1,
                        Ok(false) => {
                            debug!(fixture_id = %fixture.fixture_id, "prediction already pinned");
                        }
                        Err(e) => {
                            warn!(fixture_id = %fixture.fixture_id, error = %e, "prediction write failed");
                            report.errors += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!(fixture_id = %fixture.fixture_id, error = %e, "scoring failed");
                    report.errors += 1;
                }
            }
        }

        info!(
            total = report.total,
            calculated = report.calculated,
            errors = report.errors,
            "iq batch complete"
        );
        Ok(report)
    }

    /// Build the prediction for one fixture at `now`. Pure given the
    /// stats lookups; never fails on missing market or stats data.
    pub async fn score_fixture(
        &self,
        fixture: &Fixture,
        now: DateTime<Utc>,
    ) -> Result<Prediction, StoreError> {
        let home_stats = self
            .stats
            .find_team_stats(&fixture.home_team, &fixture.sport_key)
            .await?;
        let away_stats = self
            .stats
            .find_team_stats(&fixture.away_team, &fixture.sport_key)
            .await?;
        let h2h = self
            .stats
            .find_h2h(&fixture.home_team, &fixture.away_team, &fixture.sport_key)
            .await?;

        let home_components = self.side_components(
            fixture,
            &fixture.home_team,
            Venue::Home,
            home_stats.as_ref(),
            h2h.as_ref(),
        );
        let away_components = self.side_components(
            fixture,
            &fixture.away_team,
            Venue::Away,
            away_stats.as_ref(),
            h2h.as_ref(),
        );

        let home_iq = side_iq(&home_components, None, &self.config);
        let away_iq = side_iq(&away_components, None, &self.config);

        let draw_iq = if has_draw_outcome(&fixture.sport_key) {
            Some(market::draw_score(
                &fixture.prices_for_outcome("Draw"),
                &self.config,
            ))
        } else {
            None
        };

        let (predicted_winner, gap) = verdict(home_iq, away_iq, draw_iq);
        let confidence = confidence_for_gap(gap, &self.config);

        Ok(Prediction {
            fixture_id: fixture.fixture_id.clone(),
            sport_key: fixture.sport_key.clone(),
            home_team: fixture.home_team.clone(),
            away_team: fixture.away_team.clone(),
            home_iq,
            away_iq,
            draw_iq,
            home_components,
            away_components,
            predicted_winner,
            confidence,
            calculated_at: now,
            actual_winner: None,
            prediction_correct: None,
            verified_at: None,
        })
    }

    fn side_components(
        &self,
        fixture: &Fixture,
        team: &str,
        venue: Venue,
        stats: Option<&TeamHistoricalStats>,
        h2h: Option<&HeadToHeadRecord>,
    ) -> IqComponents {
        let prices = fixture.prices_for_outcome(team);
        let neutral = self.config.neutral;
        IqComponents {
            odds: market::odds_score(&prices, neutral),
            volume: market::volume_score(&prices, neutral),
            movement: market::movement_score(&prices, neutral),
            team_stats: form::team_stats_score(stats, venue, neutral),
            momentum: form::momentum_score(stats, neutral),
            head_to_head: head_to_head::h2h_score(h2h, team, neutral),
        }
    }
}

/// Highest score wins; the confidence gap is the margin over the
/// runner-up among whichever outcomes exist for this sport.
fn verdict(home_iq: f64, away_iq: f64, draw_iq: Option<f64>) -> (Winner, f64) {
    let mut ranked = vec![(Winner::Home, home_iq), (Winner::Away, away_iq)];
    if let Some(d) = draw_iq {
        ranked.push((Winner::Draw, d));
    }
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    (ranked[0].0, ranked[0].1 - ranked[1].1)
}
