//! End-to-end pipeline tests over the in-memory stores: provider
//! records in, linking, merge-upsert, scoring, verification and the
//! accuracy rollup.

use chrono::{Duration, Utc};
use funbet_core::config::{LinkingConfig, ScoringConfig};
use funbet_core::matching::MatchLinker;
use funbet_core::models::{BookmakerOdds, IqComponents, OutcomePrice, Winner};
use funbet_core::store::{
    MemoryFixtureStore, MemoryLinkStore, MemoryPredictionStore, MemoryStatsStore,
};
use funbet_core::verification::VerificationEngine;
use funbet_core::{FixtureStore, IqEngine, NormalizedFixture, PredictionStore};
use std::sync::Arc;

struct Harness {
    fixtures: Arc<MemoryFixtureStore>,
    predictions: Arc<MemoryPredictionStore>,
    linker: MatchLinker,
    iq: IqEngine,
    verification: VerificationEngine,
}

fn harness() -> Harness {
    let fixtures = Arc::new(MemoryFixtureStore::new());
    let predictions = Arc::new(MemoryPredictionStore::new());
    let stats = Arc::new(MemoryStatsStore::new());
    let links = Arc::new(MemoryLinkStore::new());

    let linker = MatchLinker::new(fixtures.clone(), links, LinkingConfig::default());
    let iq = IqEngine::new(
        fixtures.clone(),
        predictions.clone(),
        stats,
        ScoringConfig::default(),
    );
    let verification = VerificationEngine::new(fixtures.clone(), predictions.clone());

    Harness {
        fixtures,
        predictions,
        linker,
        iq,
        verification,
    }
}

fn odds_record(event_id: &str, commence_offset_hours: i64, home_price: f64) -> NormalizedFixture {
    NormalizedFixture {
        provider: "odds_api".into(),
        provider_event_id: event_id.into(),
        sport_key: "soccer_epl".into(),
        sport_title: Some("EPL".into()),
        home_team: "Arsenal".into(),
        away_team: "Chelsea".into(),
        commence_time: Some(Utc::now() + Duration::hours(commence_offset_hours)),
        home_score: None,
        away_score: None,
        status_text: None,
        is_live: false,
        completed: false,
        bookmakers: vec![BookmakerOdds {
            source_key: "betfair".into(),
            outcomes: vec![
                OutcomePrice {
                    name: "Arsenal".into(),
                    price: home_price,
                },
                OutcomePrice {
                    name: "Chelsea".into(),
                    price: 4.0,
                },
                OutcomePrice {
                    name: "Draw".into(),
                    price: 3.5,
                },
            ],
            last_update: Utc::now(),
        }],
    }
}

fn live_record(home_score: i32, away_score: i32, completed: bool) -> NormalizedFixture {
    NormalizedFixture {
        provider: "livescore".into(),
        provider_event_id: "ls-1".into(),
        sport_key: "soccer_epl".into(),
        sport_title: None,
        home_team: "Arsenal FC".into(),
        away_team: "Chelsea FC".into(),
        commence_time: Some(Utc::now()),
        home_score: Some(home_score),
        away_score: Some(away_score),
        status_text: Some(if completed { "FT" } else { "2nd Half" }.into()),
        is_live: !completed,
        completed,
        bookmakers: Vec::new(),
    }
}

/// Link a live record and merge it onto its canonical fixture, the way
/// the worker's live-score job does.
async fn apply_live(h: &Harness, record: NormalizedFixture) -> Option<String> {
    let fixture_id = h.linker.link(&record).await.unwrap()?;
    let mut incoming = record.into_fixture(Utc::now());
    incoming.fixture_id = fixture_id.clone();
    h.fixtures.upsert(incoming).await.unwrap();
    Some(fixture_id)
}

#[tokio::test]
async fn odds_to_verified_prediction() {
    let h = harness();

    // Odds provider creates the canonical fixture.
    h.fixtures
        .upsert(odds_record("ev1", 2, 1.5).into_fixture(Utc::now()))
        .await
        .unwrap();

    // Pre-match scoring pins a prediction.
    let report = h.iq.run_batch(Utc::now()).await.unwrap();
    assert_eq!(report.calculated, 1);
    let prediction = h.predictions.find_by_fixture("ev1").await.unwrap().unwrap();
    assert_eq!(prediction.predicted_winner, Winner::Home);
    assert!(prediction.calculated_at < Utc::now() + Duration::hours(2));

    // A live-score provider reports the same game under suffixed names.
    let linked = apply_live(&h, live_record(1, 0, false)).await;
    assert_eq!(linked.as_deref(), Some("ev1"));
    let fixture = h.fixtures.find_by_id("ev1").await.unwrap().unwrap();
    assert!(fixture.is_live());
    // Identity and enrichment stay with the odds provider's record; a
    // live update without a league title must not clear it.
    assert_eq!(fixture.home_team, "Arsenal");
    assert_eq!(fixture.sport_title.as_deref(), Some("EPL"));
    assert!(!fixture.bookmakers.is_empty());

    // Full time.
    apply_live(&h, live_record(2, 1, true)).await.unwrap();
    let fixture = h.fixtures.find_by_id("ev1").await.unwrap().unwrap();
    assert!(fixture.completed);
    assert_eq!(fixture.final_score(), Some((2, 1)));

    // Verification settles the prediction once.
    let pass = h.verification.run_pass(Utc::now()).await.unwrap();
    assert_eq!(pass.verified, 1);
    let verified = h.predictions.find_by_fixture("ev1").await.unwrap().unwrap();
    assert_eq!(verified.actual_winner, Some(Winner::Home));
    assert_eq!(verified.prediction_correct, Some(true));

    let again = h.verification.run_pass(Utc::now()).await.unwrap();
    assert_eq!(again.checked, 0);
    let unchanged = h.predictions.find_by_fixture("ev1").await.unwrap().unwrap();
    assert_eq!(unchanged.verified_at, verified.verified_at);

    let accuracy = h.verification.accuracy_report().await.unwrap();
    assert_eq!(accuracy.overall.total, 1);
    assert_eq!(accuracy.overall.correct, 1);
    assert!((accuracy.overall.accuracy_percentage - 100.0).abs() < 1e-9);
}

#[tokio::test]
async fn later_odds_never_touch_a_pinned_prediction() {
    let h = harness();
    h.fixtures
        .upsert(odds_record("ev1", 3, 1.5).into_fixture(Utc::now()))
        .await
        .unwrap();
    h.iq.run_batch(Utc::now()).await.unwrap();
    let pinned = h.predictions.find_by_fixture("ev1").await.unwrap().unwrap();

    // The market moves sharply and the batch runs again.
    h.fixtures
        .upsert(odds_record("ev1", 3, 2.9).into_fixture(Utc::now()))
        .await
        .unwrap();
    let report = h.iq.run_batch(Utc::now()).await.unwrap();
    assert_eq!(report.calculated, 0);

    let after = h.predictions.find_by_fixture("ev1").await.unwrap().unwrap();
    assert_eq!(after.home_iq, pinned.home_iq);
    assert_eq!(after.calculated_at, pinned.calculated_at);
    // The fixture itself did take the new odds.
    let fixture = h.fixtures.find_by_id("ev1").await.unwrap().unwrap();
    assert_eq!(fixture.prices_for_outcome("Arsenal"), vec![2.9]);
}

#[tokio::test]
async fn started_fixture_is_never_scored() {
    let h = harness();
    // Kicked off 10 minutes ago, still no prediction pinned.
    let mut started = odds_record("ev1", 0, 1.5);
    started.commence_time = Some(Utc::now() - Duration::minutes(10));
    h.fixtures
        .upsert(started.into_fixture(Utc::now()))
        .await
        .unwrap();

    let report = h.iq.run_batch(Utc::now()).await.unwrap();
    assert_eq!(report.total, 0);
    assert!(h
        .predictions
        .find_by_fixture("ev1")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn completion_is_monotonic_across_provider_updates() {
    let h = harness();
    h.fixtures
        .upsert(odds_record("ev1", -3, 1.5).into_fixture(Utc::now() - Duration::hours(4)))
        .await
        .unwrap();
    apply_live(&h, live_record(2, 1, true)).await.unwrap();
    assert!(h.fixtures.find_by_id("ev1").await.unwrap().unwrap().completed);

    // A stale live update arrives after full time.
    apply_live(&h, live_record(2, 1, false)).await.unwrap();
    let fixture = h.fixtures.find_by_id("ev1").await.unwrap().unwrap();
    assert!(fixture.completed);
    assert!(!fixture.is_live());
}

#[tokio::test]
async fn unrelated_teams_never_link() {
    let h = harness();
    h.fixtures
        .upsert(odds_record("ev1", 1, 1.5).into_fixture(Utc::now()))
        .await
        .unwrap();

    let mut stranger = live_record(0, 0, false);
    stranger.home_team = "Everton".into();
    stranger.away_team = "Fulham".into();
    assert!(apply_live(&h, stranger).await.is_none());
    // The canonical fixture picked up nothing.
    let fixture = h.fixtures.find_by_id("ev1").await.unwrap().unwrap();
    assert!(fixture.live_score.is_none());
}

#[tokio::test]
async fn dataless_fixture_still_gets_a_neutral_prediction() {
    let h = harness();
    let mut bare = odds_record("ev1", 2, 1.5);
    bare.bookmakers = Vec::new();
    h.fixtures
        .upsert(bare.into_fixture(Utc::now()))
        .await
        .unwrap();

    let report = h.iq.run_batch(Utc::now()).await.unwrap();
    assert_eq!(report.calculated, 1);
    assert_eq!(report.errors, 0);

    let p = h.predictions.find_by_fixture("ev1").await.unwrap().unwrap();
    assert_eq!(p.home_components, IqComponents::neutral());
    assert_eq!(p.away_components, IqComponents::neutral());
}

#[tokio::test]
async fn stuck_live_fixture_gets_swept_then_verified() {
    let h = harness();
    let mut record = odds_record("ev1", 0, 1.5);
    record.commence_time = Some(Utc::now() - Duration::hours(6));
    h.fixtures
        .upsert(record.into_fixture(Utc::now() - Duration::hours(7)))
        .await
        .unwrap();
    h.predictions
        .insert_if_absent(funbet_core::Prediction {
            fixture_id: "ev1".into(),
            sport_key: "soccer_epl".into(),
            home_team: "Arsenal".into(),
            away_team: "Chelsea".into(),
            home_iq: 60.0,
            away_iq: 40.0,
            draw_iq: Some(30.0),
            home_components: IqComponents::neutral(),
            away_components: IqComponents::neutral(),
            predicted_winner: Winner::Home,
            confidence: funbet_core::Confidence::High,
            calculated_at: Utc::now() - Duration::hours(8),
            actual_winner: None,
            prediction_correct: None,
            verified_at: None,
        })
        .await
        .unwrap();

    // The score feed died at 3-1 and never sent full time.
    apply_live(&h, live_record(3, 1, false)).await.unwrap();
    let swept = h.fixtures.sweep_stuck_live(Utc::now(), 4).await.unwrap();
    assert_eq!(swept, 1);

    let pass = h.verification.run_pass(Utc::now()).await.unwrap();
    assert_eq!(pass.verified, 1);
    let p = h.predictions.find_by_fixture("ev1").await.unwrap().unwrap();
    assert_eq!(p.actual_winner, Some(Winner::Home));
}
