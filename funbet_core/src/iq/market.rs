//! Market-derived sub-scores
//!
//! All three sub-scores here work from the list of prices the
//! bookmakers currently quote for one outcome. An empty price list
//! always yields the neutral score, never an error.

use crate::config::ScoringConfig;

/// Coefficient-of-variation below which the books are considered in
/// full agreement on a price.
const AGREEMENT_CV_CEILING: f64 = 0.05;

/// Spread ceiling for the market-agreement component of the volume
/// score; wider than this scores zero agreement.
const DISAGREEMENT_CV_CEILING: f64 = 0.15;

const TIGHT_SPREAD: f64 = 0.05;
const MEDIUM_SPREAD: f64 = 0.15;

fn mean(prices: &[f64]) -> f64 {
    prices.iter().sum::<f64>() / prices.len() as f64
}

/// Coefficient of variation (stddev over mean) of the quoted prices.
fn price_cv(prices: &[f64]) -> f64 {
    let avg = mean(prices);
    if avg <= 0.0 {
        return 0.0;
    }
    let variance =
        prices.iter().map(|p| (p - avg).powi(2)).sum::<f64>() / prices.len() as f64;
    variance.sqrt() / avg
}

/// Odds sub-score: implied probability of the average price, plus up to
/// +5 for an above-average best price and up to +5 for cross-bookmaker
/// agreement. The bonuses need at least two quotes to mean anything.
pub fn odds_score(prices: &[f64], neutral: f64) -> f64 {
    if prices.is_empty() {
        return neutral;
    }
    let avg = mean(prices);
    let mut score = (1.0 / avg) * 100.0;

    if prices.len() >= 2 {
        let best = prices.iter().cloned().fold(f64::MIN, f64::max);
        let best_edge = (best - avg) / avg;
        score += (best_edge * 100.0).clamp(0.0, 5.0);

        let cv = price_cv(prices);
        score += ((AGREEMENT_CV_CEILING - cv) / AGREEMENT_CV_CEILING * 5.0).clamp(0.0, 5.0);
    }

    score.clamp(0.0, 100.0)
}

/// Volume/liquidity sub-score: bookmaker count through a step function,
/// blended 40/30/30 with market agreement and implied probability.
pub fn volume_score(prices: &[f64], neutral: f64) -> f64 {
    if prices.is_empty() {
        return neutral;
    }

    let count_score = match prices.len() {
        n if n >= 8 => 90.0,
        n if n >= 4 => 60.0 + 5.0 * (n - 4) as f64,
        n => 40.0 + 6.67 * n as f64,
    };

    let cv = price_cv(prices);
    let agreement =
        ((DISAGREEMENT_CV_CEILING - cv) / DISAGREEMENT_CV_CEILING * 100.0).clamp(0.0, 100.0);

    let implied = ((1.0 / mean(prices)) * 100.0).clamp(0.0, 100.0);

    (0.40 * count_score + 0.30 * agreement + 0.30 * implied).clamp(0.0, 100.0)
}

/// Movement sub-score. No historical snapshots exist, so the intra-market
/// spread (max minus min over average) stands in for temporal movement:
/// a tight market reads as settled, a wide one as unstable.
pub fn movement_score(prices: &[f64], neutral: f64) -> f64 {
    if prices.is_empty() {
        return neutral;
    }
    let avg = mean(prices);
    let max = prices.iter().cloned().fold(f64::MIN, f64::max);
    let min = prices.iter().cloned().fold(f64::MAX, f64::min);
    let spread = (max - min) / avg;

    let base = (1.0 / avg) * 100.0;
    let bonus = if spread < TIGHT_SPREAD {
        10.0
    } else if spread < MEDIUM_SPREAD {
        5.0
    } else {
        -5.0
    };

    (base + bonus).clamp(0.0, 100.0)
}

/// Draw score: purely market-derived, clamped to the realistic band.
pub fn draw_score(prices: &[f64], config: &ScoringConfig) -> f64 {
    if prices.is_empty() {
        return config.draw_default;
    }
    ((1.0 / mean(prices)) * 100.0).clamp(config.draw_floor, config.draw_ceiling)
}
