mod config;
mod jobs;

use crate::config::Config;
use crate::jobs::Worker;
use anyhow::Result;
use dotenv::dotenv;
use funbet_core::cache::TtlCache;
use funbet_core::config::{CacheConfig, LinkingConfig, ScoringConfig};
use funbet_core::matching::MatchLinker;
use funbet_core::providers::OddsApiProvider;
use funbet_core::store::postgres::{
    create_pool, PgFixtureStore, PgLinkStore, PgPredictionStore, PgStatsStore,
};
use funbet_core::store::{FixtureStore, LinkStore, PredictionStore, StatsStore};
use funbet_core::verification::VerificationEngine;
use funbet_core::IqEngine;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn spawn_cycle<F, Fut>(name: &'static str, interval: Duration, worker: Arc<Worker>, f: F) -> JoinHandle<()>
where
    F: Fn(Arc<Worker>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        info!(job = name, interval_secs = interval.as_secs(), "job started");
        loop {
            f(worker.clone()).await;
            tokio::time::sleep(interval).await;
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting FunBet IQ worker...");

    let config = Config::from_env();
    let pool = create_pool(&config.database_url).await?;

    let fixtures: Arc<dyn FixtureStore> = Arc::new(PgFixtureStore::new(pool.clone()));
    let predictions: Arc<dyn PredictionStore> = Arc::new(PgPredictionStore::new(pool.clone()));
    let stats: Arc<dyn StatsStore> = Arc::new(PgStatsStore::new(pool.clone()));
    let links: Arc<dyn LinkStore> = Arc::new(PgLinkStore::new(pool));

    let linker = Arc::new(MatchLinker::new(
        fixtures.clone(),
        links,
        LinkingConfig::from_env(),
    ));
    let iq = Arc::new(IqEngine::new(
        fixtures.clone(),
        predictions.clone(),
        stats.clone(),
        ScoringConfig::from_env(),
    ));
    let verification = Arc::new(VerificationEngine::new(fixtures.clone(), predictions));

    let worker = Arc::new(Worker {
        fixtures,
        stats,
        linker,
        iq,
        verification,
        odds_provider: Arc::new(OddsApiProvider::from_env()?),
        // Additional live-score feeds register here as they come online.
        score_providers: Vec::new(),
        stats_provider: None,
        cache: Arc::new(TtlCache::new(CacheConfig::default())),
        config: config.clone(),
    });

    let tasks = vec![
        spawn_cycle("odds", config.odds_interval, worker.clone(), |w| async move {
            w.run_odds_cycle().await
        }),
        spawn_cycle("live", config.live_interval, worker.clone(), |w| async move {
            w.run_live_cycle().await
        }),
        spawn_cycle("iq", config.iq_interval, worker.clone(), |w| async move {
            w.run_iq_cycle().await
        }),
        spawn_cycle(
            "verification",
            config.verification_interval,
            worker.clone(),
            |w| async move { w.run_verification_cycle().await },
        ),
        spawn_cycle("stats", config.stats_interval, worker.clone(), |w| async move {
            w.run_stats_cycle().await
        }),
        spawn_cycle("cleanup", config.cleanup_interval, worker, |w| async move {
            w.run_cleanup_cycle().await
        }),
    ];

    join_all(tasks).await;
    Ok(())
}
