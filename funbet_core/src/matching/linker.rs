//! Fixture linking across providers
//!
//! `link` decides whether a secondary provider's record denotes a
//! fixture already in the store. A failed link returns None: data
//! withheld for this cycle, not an error. A later poll may succeed once
//! the odds job has populated the store.

use crate::config::LinkingConfig;
use crate::matching::normalize::similarity;
use crate::models::{Fixture, MatchLink};
use crate::providers::NormalizedFixture;
use crate::store::{FixtureStore, LinkStore, StoreError};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::debug;

pub struct MatchLinker {
    fixtures: Arc<dyn FixtureStore>,
    links: Arc<dyn LinkStore>,
    config: LinkingConfig,
}

/// Pick the pool fixture best matching the candidate's team names.
///
/// Both the home and away similarity must independently clear
/// `min_similarity`, so one strong side never masks a wrong opponent.
/// Ties on combined score break toward the closest commence time.
pub fn best_match<'a>(
    home_team: &str,
    away_team: &str,
    reported_time: DateTime<Utc>,
    pool: &'a [Fixture],
    min_similarity: f64,
) -> Option<&'a Fixture> {
    let mut best: Option<(&Fixture, f64)> = None;

    for fixture in pool {
        let home_sim = similarity(home_team, &fixture.home_team);
        let away_sim = similarity(away_team, &fixture.away_team);
        if home_sim < min_similarity || away_sim < min_similarity {
            continue;
        }
        let score = (home_sim + away_sim) / 2.0;

        let better = match best {
            None => true,
            Some((current, current_score)) => {
                if (score - current_score).abs() < f64::EPSILON {
                    let cur_delta = (current.commence_time - reported_time).abs();
                    let new_delta = (fixture.commence_time - reported_time).abs();
                    new_delta < cur_delta
                } else {
                    score > current_score
                }
            }
        };
        if better {
            best = Some((fixture, score));
        }
    }

    best.map(|(f, _)| f)
}

/// Exact case-insensitive match on both names, used as a fallback when
/// the similarity gate finds nothing: some live-score providers supply
/// no reliable timing at all.
fn exact_fallback<'a>(home_team: &str, away_team: &str, pool: &'a [Fixture]) -> Option<&'a Fixture> {
    let home = home_team.to_lowercase();
    let away = away_team.to_lowercase();
    pool.iter().find(|f| {
        f.home_team.to_lowercase() == home && f.away_team.to_lowercase() == away
    })
}

impl MatchLinker {
    pub fn new(
        fixtures: Arc<dyn FixtureStore>,
        links: Arc<dyn LinkStore>,
        config: LinkingConfig,
    ) -> Self {
        Self {
            fixtures,
            links,
            config,
        }
    }

    /// Resolve a secondary-provider record to a stored fixture id.
    pub async fn link(&self, candidate: &NormalizedFixture) -> Result<Option<String>, StoreError> {
        // Reuse a persisted decision before any fuzzy work.
        if let Some(link) = self
            .links
            .find(&candidate.provider, &candidate.provider_event_id)
            .await?
        {
            return Ok(Some(link.fixture_id));
        }

        let now = Utc::now();
        let reported_time = candidate.commence_time.unwrap_or(now);

        let pool = self
            .fixtures
            .find_linkable(reported_time, self.config.window_hours)
            .await?;

        let mut matched = best_match(
            &candidate.home_team,
            &candidate.away_team,
            reported_time,
            &pool,
            self.config.min_similarity,
        )
        .map(|f| f.fixture_id.clone());

        if matched.is_none() {
            // Widened window covering the last `fallback_hours`.
            let half = self.config.fallback_hours / 2;
            let recent = self
                .fixtures
                .find_linkable(now - Duration::hours(half), half)
                .await?;
            matched = exact_fallback(&candidate.home_team, &candidate.away_team, &recent)
                .map(|f| f.fixture_id.clone());
        }

        match matched {
            Some(fixture_id) => {
                self.links
                    .insert_if_absent(MatchLink {
                        provider: candidate.provider.clone(),
                        provider_event_id: candidate.provider_event_id.clone(),
                        fixture_id: fixture_id.clone(),
                        linked_at: now,
                    })
                    .await?;
                Ok(Some(fixture_id))
            }
            None => {
                debug!(
                    provider = %candidate.provider,
                    home = %candidate.home_team,
                    away = %candidate.away_team,
                    "could not link fixture"
                );
                Ok(None)
            }
        }
    }
}
