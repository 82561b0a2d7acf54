//! Odds aggregator adapter
//!
//! Fetches head-to-head markets per sport from the primary odds
//! aggregator. This provider is the one that creates fixture records
//! and assigns the canonical fixture id; everything else links against
//! it. The raw payload is modeled as its own types and converted in one
//! place; nothing downstream indexes into raw JSON.

use super::{FixtureProvider, NormalizedFixture};
use crate::models::{BookmakerOdds, OutcomePrice};
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.the-odds-api.com/v4";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause between per-sport requests; call volume is bounded so a fixed
/// sleep is enough rate limiting.
const INTER_REQUEST_DELAY: Duration = Duration::from_millis(250);

// Raw payload shapes, exactly as the aggregator serves them.

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    sport_key: String,
    #[serde(default)]
    sport_title: Option<String>,
    commence_time: DateTime<Utc>,
    home_team: String,
    away_team: String,
    #[serde(default)]
    bookmakers: Vec<RawBookmaker>,
}

#[derive(Debug, Deserialize)]
struct RawBookmaker {
    key: String,
    #[serde(default)]
    last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    markets: Vec<RawMarket>,
}

#[derive(Debug, Deserialize)]
struct RawMarket {
    key: String,
    #[serde(default)]
    outcomes: Vec<RawOutcome>,
}

#[derive(Debug, Deserialize)]
struct RawOutcome {
    name: String,
    price: f64,
}

/// Total conversion from the raw event to the shared record shape.
fn convert_event(raw: RawEvent, provider: &str) -> NormalizedFixture {
    let bookmakers = raw
        .bookmakers
        .into_iter()
        .filter_map(|b| {
            let outcomes: Vec<OutcomePrice> = b
                .markets
                .iter()
                .find(|m| m.key == "h2h")
                .map(|m| {
                    m.outcomes
                        .iter()
                        .map(|o| OutcomePrice {
                            name: o.name.clone(),
                            price: o.price,
                        })
                        .collect()
                })
                .unwrap_or_default();
            if outcomes.is_empty() {
                return None;
            }
            Some(BookmakerOdds {
                source_key: b.key,
                outcomes,
                last_update: b.last_update.unwrap_or_else(Utc::now),
            })
        })
        .collect();

    NormalizedFixture {
        provider: provider.to_string(),
        provider_event_id: raw.id,
        sport_key: raw.sport_key,
        sport_title: raw.sport_title,
        home_team: raw.home_team,
        away_team: raw.away_team,
        commence_time: Some(raw.commence_time),
        home_score: None,
        away_score: None,
        status_text: None,
        is_live: false,
        completed: false,
        bookmakers,
    }
}

pub struct OddsApiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    sport_keys: Vec<String>,
}

impl OddsApiProvider {
    /// Refuses to construct without credentials: running with a
    /// silently empty odds capability is a startup error, not a
    /// degraded mode.
    pub fn from_env() -> Result<Self> {
        let api_key = match std::env::var("ODDS_API_KEY") {
            Ok(key) if !key.is_empty() => key,
            _ => bail!("ODDS_API_KEY is required"),
        };
        let sport_keys = std::env::var("ODDS_API_SPORTS")
            .unwrap_or_else(|_| "soccer_epl,cricket_t20,basketball_nba".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()?,
            base_url: std::env::var("ODDS_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            api_key,
            sport_keys,
        })
    }

    async fn fetch_sport(&self, sport_key: &str) -> Result<Vec<RawEvent>> {
        let url = format!(
            "{}/sports/{}/odds?regions=uk,eu&markets=h2h&apiKey={}",
            self.base_url, sport_key, self.api_key
        );
        let events = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<RawEvent>>()
            .await?;
        Ok(events)
    }
}

#[async_trait]
impl FixtureProvider for OddsApiProvider {
    async fn fetch(&self) -> Vec<NormalizedFixture> {
        let mut records = Vec::new();
        for sport_key in &self.sport_keys {
            match self.fetch_sport(sport_key).await {
                Ok(events) => {
                    debug!(sport = %sport_key, count = events.len(), "fetched odds events");
                    records.extend(
                        events
                            .into_iter()
                            .map(|e| convert_event(e, self.provider_name())),
                    );
                }
                Err(e) => {
                    // No data this cycle for this sport; stored odds stay.
                    warn!(sport = %sport_key, error = %e, "odds fetch failed");
                }
            }
            tokio::time::sleep(INTER_REQUEST_DELAY).await;
        }
        records
    }

    fn provider_name(&self) -> &str {
        "odds_api"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_event_takes_h2h_market_only() {
        let raw = RawEvent {
            id: "ev1".into(),
            sport_key: "soccer_epl".into(),
            sport_title: Some("EPL".into()),
            commence_time: Utc::now(),
            home_team: "Arsenal".into(),
            away_team: "Chelsea".into(),
            bookmakers: vec![RawBookmaker {
                key: "betfair".into(),
                last_update: None,
                markets: vec![
                    RawMarket {
                        key: "totals".into(),
                        outcomes: vec![RawOutcome {
                            name: "Over 2.5".into(),
                            price: 1.9,
                        }],
                    },
                    RawMarket {
                        key: "h2h".into(),
                        outcomes: vec![
                            RawOutcome {
                                name: "Arsenal".into(),
                                price: 1.5,
                            },
                            RawOutcome {
                                name: "Chelsea".into(),
                                price: 2.8,
                            },
                        ],
                    },
                ],
            }],
        };

        let record = convert_event(raw, "odds_api");
        assert_eq!(record.provider_event_id, "ev1");
        assert_eq!(record.bookmakers.len(), 1);
        assert_eq!(record.bookmakers[0].outcomes.len(), 2);
        assert_eq!(record.bookmakers[0].outcomes[0].price, 1.5);
        // The league title is enrichment, not a match status.
        assert_eq!(record.sport_title.as_deref(), Some("EPL"));
        assert_eq!(record.status_text, None);

        let fixture = record.into_fixture(Utc::now());
        assert_eq!(fixture.sport_title.as_deref(), Some("EPL"));
    }

    #[test]
    fn convert_event_drops_bookmaker_without_h2h() {
        let raw = RawEvent {
            id: "ev2".into(),
            sport_key: "soccer_epl".into(),
            sport_title: None,
            commence_time: Utc::now(),
            home_team: "Everton".into(),
            away_team: "Fulham".into(),
            bookmakers: vec![RawBookmaker {
                key: "betfair".into(),
                last_update: None,
                markets: Vec::new(),
            }],
        };

        let record = convert_event(raw, "odds_api");
        assert!(record.bookmakers.is_empty());
    }
}
