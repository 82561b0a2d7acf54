//! Post-match verification and accuracy reporting
//!
//! Reconciles pinned predictions against final results. A prediction is
//! verified at most once: the store's conditional update is the
//! serialization point, so overlapping passes cannot double-write. A
//! fixture that cannot be resolved yet is left pending for the next
//! pass, never guessed at from mid-match data.

use crate::models::{verification_grace_hours, Confidence, Fixture, Prediction, Winner};
use crate::store::{FixtureStore, PredictionStore, StoreError};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome counts from one verification pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct VerificationReport {
    /// Unverified predictions examined
    pub checked: usize,
    /// Predictions verified this pass
    pub verified: usize,
    /// Predictions left pending for a later pass
    pub pending: usize,
    pub errors: usize,
}

/// Accuracy counters for one slice of verified predictions.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct BandAccuracy {
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub accuracy_percentage: f64,
}

impl BandAccuracy {
    fn record(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        } else {
            self.incorrect += 1;
        }
        self.accuracy_percentage = self.correct as f64 / self.total as f64 * 100.0;
    }
}

/// Overall accuracy plus the per-confidence-band breakdown.
#[derive(Debug, Default, Clone, Copy)]
pub struct AccuracyReport {
    pub overall: BandAccuracy,
    pub high: BandAccuracy,
    pub medium: BandAccuracy,
    pub low: BandAccuracy,
}

/// Winner read strictly from the final (home, away) score pair.
pub fn winner_from_score(home: i32, away: i32) -> Winner {
    if home > away {
        Winner::Home
    } else if away > home {
        Winner::Away
    } else {
        Winner::Draw
    }
}

pub struct VerificationEngine {
    fixtures: Arc<dyn FixtureStore>,
    predictions: Arc<dyn PredictionStore>,
}

impl VerificationEngine {
    pub fn new(fixtures: Arc<dyn FixtureStore>, predictions: Arc<dyn PredictionStore>) -> Self {
        Self {
            fixtures,
            predictions,
        }
    }

    /// One pass over every unverified prediction.
    pub async fn run_pass(&self, now: DateTime<Utc>) -> Result<VerificationReport, StoreError> {
        let unverified = self.predictions.find_unverified().await?;
        let mut report = VerificationReport {
            checked: unverified.len(),
            ..Default::default()
        };

        for prediction in unverified {
            match self.verify_one(&prediction, now).await {
                Ok(true) => report.verified += 1,
                Ok(false) => report.pending += 1,
                Err(e) => {
                    warn!(fixture_id = %prediction.fixture_id, error = %e, "verification failed");
                    report.errors += 1;
                }
            }
        }

        info!(
            checked = report.checked,
            verified = report.verified,
            pending = report.pending,
            errors = report.errors,
            "verification pass complete"
        );
        Ok(report)
    }

    /// Attempt to settle one prediction. Returns Ok(false) when the
    /// result is not yet decidable (fixture missing, still inside the
    /// grace window, or no final score anywhere).
    async fn verify_one(
        &self,
        prediction: &Prediction,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let fixture = match self.fixtures.find_by_id(&prediction.fixture_id).await? {
            Some(f) => f,
            None => return Ok(false),
        };

        let final_score = match self.resolve_final_score(&fixture, now).await? {
            Some(score) => score,
            None => return Ok(false),
        };

        let actual = winner_from_score(final_score.0, final_score.1);
        let correct = prediction.predicted_side() == actual;

        let wrote = self
            .predictions
            .mark_verified(&prediction.fixture_id, actual, correct, now)
            .await?;
        if !wrote {
            debug!(fixture_id = %prediction.fixture_id, "already verified by another pass");
        }
        Ok(wrote)
    }

    /// Final score for a fixture, or None while still pending.
    ///
    /// A completed fixture's own score settles immediately. Otherwise
    /// the fixture must have aged past its sport's grace window before
    /// any result is declared, and even then only a completed record
    /// found under the same team names counts; mid-match data never
    /// does.
    async fn resolve_final_score(
        &self,
        fixture: &Fixture,
        now: DateTime<Utc>,
    ) -> Result<Option<(i32, i32)>, StoreError> {
        if let Some(score) = fixture.final_score() {
            return Ok(Some(score));
        }

        let grace = Duration::hours(verification_grace_hours(&fixture.sport_key));
        if now < fixture.commence_time + grace {
            return Ok(None);
        }

        self.fixtures
            .find_final_score_by_teams(&fixture.home_team, &fixture.away_team, &fixture.sport_key)
            .await
    }

    /// Accuracy over every verified prediction, overall and per band.
    pub async fn accuracy_report(&self) -> Result<AccuracyReport, StoreError> {
        let verified = self.predictions.find_verified().await?;
        let mut report = AccuracyReport::default();

        for prediction in verified {
            let correct = prediction.prediction_correct.unwrap_or(false);
            report.overall.record(correct);
            match prediction.confidence {
                Confidence::High => report.high.record(correct),
                Confidence::Medium => report.medium.record(correct),
                Confidence::Low => report.low.record(correct),
            }
        }

        Ok(report)
    }
}
