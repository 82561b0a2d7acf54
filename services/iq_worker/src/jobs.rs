//! Periodic job bodies
//!
//! Each cycle is a zero-argument idempotent pass: fetch, reconcile
//! against the store, log one summary line. The store's atomic
//! operations make overlapping or repeated runs safe, so the scheduler
//! needs no coordination beyond timers.

use crate::config::Config;
use chrono::{Duration, Utc};
use funbet_core::cache::{CacheClass, TtlCache};
use funbet_core::matching::MatchLinker;
use funbet_core::providers::{FixtureProvider, StatsProvider};
use funbet_core::store::{FixtureStore, StatsStore};
use funbet_core::verification::VerificationEngine;
use funbet_core::IqEngine;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Worker {
    pub fixtures: Arc<dyn FixtureStore>,
    pub stats: Arc<dyn StatsStore>,
    pub linker: Arc<MatchLinker>,
    pub iq: Arc<IqEngine>,
    pub verification: Arc<VerificationEngine>,
    pub odds_provider: Arc<dyn FixtureProvider>,
    /// Live-score feeds; records from these are linked before merging.
    pub score_providers: Vec<Arc<dyn FixtureProvider>>,
    pub stats_provider: Option<Arc<dyn StatsProvider>>,
    pub cache: Arc<TtlCache<()>>,
    pub config: Config,
}

impl Worker {
    /// Odds refresh. The odds provider is canonical: its records create
    /// fixtures under the provider's own event id, no linking involved.
    pub async fn run_odds_cycle(&self) {
        let records = self.odds_provider.fetch().await;
        let total = records.len();
        let mut stored = 0usize;

        for record in records {
            match self.fixtures.upsert(record.into_fixture(Utc::now())).await {
                Ok(()) => stored += 1,
                Err(e) => warn!(error = %e, "odds upsert failed"),
            }
        }
        info!(total, stored, "odds cycle complete");
    }

    /// Live-score refresh: every record must resolve to a known fixture
    /// before its score is merged; unlinked records are dropped for this
    /// cycle.
    pub async fn run_live_cycle(&self) {
        let mut total = 0usize;
        let mut linked = 0usize;
        let mut unlinked = 0usize;

        for provider in &self.score_providers {
            for record in provider.fetch().await {
                total += 1;
                let fixture_id = match self.linker.link(&record).await {
                    Ok(Some(id)) => id,
                    Ok(None) => {
                        unlinked += 1;
                        continue;
                    }
                    Err(e) => {
                        warn!(provider = %record.provider, error = %e, "linking failed");
                        continue;
                    }
                };

                let mut incoming = record.into_fixture(Utc::now());
                incoming.fixture_id = fixture_id;
                match self.fixtures.upsert(incoming).await {
                    Ok(()) => linked += 1,
                    Err(e) => warn!(error = %e, "live upsert failed"),
                }
            }
        }

        if total > 0 {
            info!(total, linked, unlinked, "live cycle complete");
        }
    }

    pub async fn run_iq_cycle(&self) {
        if let Err(e) = self.iq.run_batch(Utc::now()).await {
            warn!(error = %e, "iq batch failed");
        }
    }

    pub async fn run_verification_cycle(&self) {
        match self.verification.run_pass(Utc::now()).await {
            Ok(report) if report.verified > 0 => match self.verification.accuracy_report().await {
                Ok(accuracy) => info!(
                    total = accuracy.overall.total,
                    correct = accuracy.overall.correct,
                    accuracy_pct = accuracy.overall.accuracy_percentage,
                    "accuracy after verification"
                ),
                Err(e) => warn!(error = %e, "accuracy report failed"),
            },
            Ok(_) => {}
            Err(e) => warn!(error = %e, "verification pass failed"),
        }
    }

    /// Refresh historical stats for teams playing soon. The cache keeps
    /// a cycle from re-fetching a team it already refreshed within the
    /// stats TTL; the store's `fetched_at` staleness check covers
    /// restarts.
    pub async fn run_stats_cycle(&self) {
        let provider = match &self.stats_provider {
            Some(p) => p,
            None => {
                debug!("no stats provider configured");
                return;
            }
        };

        let now = Utc::now();
        let upcoming = match self.fixtures.find_upcoming(now).await {
            Ok(fixtures) => fixtures,
            Err(e) => {
                warn!(error = %e, "upcoming lookup failed");
                return;
            }
        };

        let mut refreshed = 0usize;
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let staleness = Duration::hours(self.config.stats_staleness_hours);

        for fixture in &upcoming {
            for team in [&fixture.home_team, &fixture.away_team] {
                if !seen.insert((team.clone(), fixture.sport_key.clone())) {
                    continue;
                }
                let cache_key = format!("{}:{}", fixture.sport_key, team.to_lowercase());
                if self.cache.get(CacheClass::Stats, &cache_key).is_some() {
                    continue;
                }
                let fresh = match self.stats.find_team_stats(team, &fixture.sport_key).await {
                    Ok(Some(existing)) => !existing.is_stale(now, staleness),
                    Ok(None) => false,
                    Err(e) => {
                        warn!(team = %team, error = %e, "stats lookup failed");
                        continue;
                    }
                };
                if fresh {
                    continue;
                }

                if let Some(mut stats) = provider.fetch_team_stats(team, &fixture.sport_key).await {
                    stats.truncate_recent();
                    match self.stats.put_team_stats(stats).await {
                        Ok(()) => {
                            refreshed += 1;
                            self.cache.put(CacheClass::Stats, &cache_key, ());
                        }
                        Err(e) => warn!(team = %team, error = %e, "stats write failed"),
                    }
                }
            }

            if let Some(h2h) = provider
                .fetch_head_to_head(&fixture.home_team, &fixture.away_team, &fixture.sport_key)
                .await
            {
                if let Err(e) = self.stats.put_h2h(h2h).await {
                    warn!(fixture_id = %fixture.fixture_id, error = %e, "h2h write failed");
                }
            }
        }

        info!(
            upcoming = upcoming.len(),
            refreshed, "stats cycle complete"
        );
    }

    /// Housekeeping: force-complete fixtures stuck live and drop expired
    /// cache entries.
    pub async fn run_cleanup_cycle(&self) {
        match self
            .fixtures
            .sweep_stuck_live(Utc::now(), self.config.stuck_live_hours)
            .await
        {
            Ok(swept) if swept > 0 => info!(swept, "stuck live fixtures completed"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "stuck live sweep failed"),
        }
        let purged = self.cache.purge_expired();
        if purged > 0 {
            debug!(purged, "cache entries purged");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use funbet_core::config::{CacheConfig, LinkingConfig, ScoringConfig};
    use funbet_core::models::{
        BookmakerOdds, FormResult, HeadToHeadRecord, OutcomePrice, TeamHistoricalStats,
    };
    use funbet_core::store::{
        MemoryFixtureStore, MemoryLinkStore, MemoryPredictionStore, MemoryStatsStore,
        PredictionStore,
    };
    use funbet_core::NormalizedFixture;
    use parking_lot::Mutex;

    struct StubFixtureProvider {
        name: &'static str,
        records: Mutex<Vec<NormalizedFixture>>,
    }

    #[async_trait]
    impl FixtureProvider for StubFixtureProvider {
        async fn fetch(&self) -> Vec<NormalizedFixture> {
            self.records.lock().clone()
        }

        fn provider_name(&self) -> &str {
            self.name
        }
    }

    struct StubStatsProvider;

    #[async_trait]
    impl StatsProvider for StubStatsProvider {
        async fn fetch_team_stats(
            &self,
            team_name: &str,
            sport_key: &str,
        ) -> Option<TeamHistoricalStats> {
            Some(TeamHistoricalStats {
                team_name: team_name.into(),
                sport_key: sport_key.into(),
                total_games: 20,
                wins: 12,
                draws: 4,
                losses: 4,
                home_wins: 7,
                away_wins: 5,
                goals_for: 40,
                goals_against: 20,
                recent_form: vec![FormResult::Win; 10],
                recent_results: Vec::new(),
                fetched_at: Utc::now(),
            })
        }

        async fn fetch_head_to_head(
            &self,
            team_a: &str,
            team_b: &str,
            sport_key: &str,
        ) -> Option<HeadToHeadRecord> {
            Some(HeadToHeadRecord {
                team1: team_a.into(),
                team2: team_b.into(),
                sport_key: sport_key.into(),
                total_matches: 6,
                team1_wins: 3,
                team2_wins: 2,
                draws: 1,
                recent_results: Vec::new(),
                fetched_at: Utc::now(),
            })
        }

        fn provider_name(&self) -> &str {
            "stub_stats"
        }
    }

    fn odds_record(event_id: &str, commence: DateTime<Utc>) -> NormalizedFixture {
        NormalizedFixture {
            provider: "odds_api".into(),
            provider_event_id: event_id.into(),
            sport_key: "soccer_epl".into(),
            sport_title: Some("EPL".into()),
            home_team: "Arsenal".into(),
            away_team: "Chelsea".into(),
            commence_time: Some(commence),
            home_score: None,
            away_score: None,
            status_text: None,
            is_live: false,
            completed: false,
            bookmakers: vec![BookmakerOdds {
                source_key: "betfair".into(),
                outcomes: vec![OutcomePrice {
                    name: "Arsenal".into(),
                    price: 1.5,
                }],
                last_update: Utc::now(),
            }],
        }
    }

    fn live_record(event_id: &str) -> NormalizedFixture {
        NormalizedFixture {
            provider: "livescore".into(),
            provider_event_id: event_id.into(),
            sport_key: "soccer_epl".into(),
            sport_title: None,
            home_team: "Arsenal FC".into(),
            away_team: "Chelsea FC".into(),
            commence_time: Some(Utc::now()),
            home_score: Some(1),
            away_score: Some(0),
            status_text: Some("1st Half".into()),
            is_live: true,
            completed: false,
            bookmakers: Vec::new(),
        }
    }

    fn worker(
        odds: Vec<NormalizedFixture>,
        live: Vec<NormalizedFixture>,
    ) -> (Worker, Arc<MemoryPredictionStore>) {
        let fixtures = Arc::new(MemoryFixtureStore::new());
        let predictions = Arc::new(MemoryPredictionStore::new());
        let stats = Arc::new(MemoryStatsStore::new());
        let links = Arc::new(MemoryLinkStore::new());

        let linker = Arc::new(MatchLinker::new(
            fixtures.clone(),
            links,
            LinkingConfig::default(),
        ));
        let iq = Arc::new(IqEngine::new(
            fixtures.clone(),
            predictions.clone(),
            stats.clone(),
            ScoringConfig::default(),
        ));
        let verification = Arc::new(VerificationEngine::new(
            fixtures.clone(),
            predictions.clone(),
        ));

        let worker = Worker {
            fixtures,
            stats,
            linker,
            iq,
            verification,
            odds_provider: Arc::new(StubFixtureProvider {
                name: "odds_api",
                records: Mutex::new(odds),
            }),
            score_providers: vec![Arc::new(StubFixtureProvider {
                name: "livescore",
                records: Mutex::new(live),
            })],
            stats_provider: Some(Arc::new(StubStatsProvider)),
            cache: Arc::new(TtlCache::new(CacheConfig::default())),
            config: Config::from_env(),
        };
        (worker, predictions)
    }

    #[tokio::test]
    async fn odds_then_live_then_iq() {
        let commence = Utc::now() + Duration::hours(2);
        let (worker, predictions) = worker(
            vec![odds_record("ev1", commence)],
            vec![live_record("ls-1")],
        );

        worker.run_odds_cycle().await;
        let fixture = worker.fixtures.find_by_id("ev1").await.unwrap().unwrap();
        assert_eq!(fixture.home_team, "Arsenal");

        worker.run_live_cycle().await;
        let fixture = worker.fixtures.find_by_id("ev1").await.unwrap().unwrap();
        assert!(fixture.is_live());

        // Fixture is pre-match by schedule even though a feed flagged it
        // live early; the batch keys off commence_time.
        worker.run_iq_cycle().await;
        assert!(predictions.find_by_fixture("ev1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn stats_cycle_fills_store_and_skips_fresh() {
        let commence = Utc::now() + Duration::hours(2);
        let (worker, _) = worker(vec![odds_record("ev1", commence)], Vec::new());
        worker.run_odds_cycle().await;

        worker.run_stats_cycle().await;
        let stats = worker
            .stats
            .find_team_stats("Arsenal", "soccer_epl")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.total_games, 20);
        let first_fetch = stats.fetched_at;

        // Second pass within the TTL leaves the record alone.
        worker.run_stats_cycle().await;
        let again = worker
            .stats
            .find_team_stats("Arsenal", "soccer_epl")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.fetched_at, first_fetch);

        assert!(worker
            .stats
            .find_h2h("Arsenal", "Chelsea", "soccer_epl")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn unlinked_live_record_is_dropped() {
        let (worker, _) = worker(Vec::new(), vec![live_record("ls-1")]);
        // No fixtures exist, so the live record has nothing to link to.
        worker.run_live_cycle().await;
        assert!(worker
            .fixtures
            .find_by_id("ls-1")
            .await
            .unwrap()
            .is_none());
    }
}
