//! FunBet core: odds/scores aggregation, match identity resolution,
//! composite confidence scoring and prediction verification.
//!
//! The worker binary in `services/iq_worker` drives everything here on
//! timers; this crate holds all domain logic and owns no schedule.

pub mod cache;
pub mod config;
pub mod iq;
pub mod matching;
pub mod models;
pub mod providers;
pub mod store;
pub mod verification;

pub use cache::{CacheClass, TtlCache};
pub use iq::{BatchReport, IqEngine};
pub use matching::MatchLinker;
pub use models::{Confidence, Fixture, Prediction, Winner};
pub use providers::{FixtureProvider, NormalizedFixture, StatsProvider};
pub use store::{FixtureStore, LinkStore, PredictionStore, StatsStore, StoreError};
pub use verification::{AccuracyReport, VerificationEngine, VerificationReport};
