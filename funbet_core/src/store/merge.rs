//! Fixture merge discipline
//!
//! One pure function shared by every storage backend, so the merge
//! invariants hold identically in memory and in Postgres:
//!
//! - identity fields (teams, commence_time, sport_key) are write-once
//! - a source's bookmaker entry is replaced wholesale, other sources'
//!   entries are preserved, and an empty incoming list never clears
//!   previously observed odds
//! - live score is last-writer-wins
//! - `completed` only ever transitions false -> true

use crate::models::Fixture;
use chrono::{DateTime, Utc};

/// Merge `incoming` into `existing` in place.
pub fn merge_fixture(existing: &mut Fixture, incoming: Fixture, now: DateTime<Utc>) {
    // Per-source wholesale replacement; a failed fetch shows up here as
    // an empty incoming list and touches nothing.
    for book in incoming.bookmakers {
        match existing
            .bookmakers
            .iter_mut()
            .find(|b| b.source_key == book.source_key)
        {
            Some(slot) => *slot = book,
            None => existing.bookmakers.push(book),
        }
    }

    if let Some(score) = incoming.live_score {
        let became_completed = score.completed;
        existing.live_score = Some(score);
        if became_completed {
            existing.completed = true;
        }
    }

    // Monotonic completion: incoming false never reverts existing true.
    if incoming.completed {
        existing.completed = true;
    }
    if existing.completed {
        if let Some(score) = existing.live_score.as_mut() {
            score.is_live = false;
        }
    }

    // Enrichment fields fill in when absent or refresh when supplied.
    if incoming.sport_title.is_some() {
        existing.sport_title = incoming.sport_title;
    }
    if incoming.home_logo.is_some() {
        existing.home_logo = incoming.home_logo;
    }
    if incoming.away_logo.is_some() {
        existing.away_logo = incoming.away_logo;
    }

    existing.updated_at = now;
}
