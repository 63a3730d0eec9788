//! Sentence-level polarity scoring and cluster-level sentiment aggregation.
//!
//! The scorer is a lexicon-based compound model: signed valences per term,
//! negation flipping and booster scaling over a short lookback window, then
//! the usual `x / sqrt(x^2 + 15)` squash into [-1, 1]. The scorer is an
//! owned value constructed by the caller and injected, not module state.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::config::AppConfig;
use crate::schema::SentimentLabel;

/// Multiplier applied to a valence preceded by a negator.
const NEGATION_FACTOR: f32 = -0.74;

/// Raw valences, roughly on the VADER -4..4 scale, biased toward the
/// vocabulary of product feedback.
const LEXICON_TABLE: &[(&str, f32)] = &[
    // positive
    ("love", 3.2),
    ("loves", 3.2),
    ("loved", 2.9),
    ("excellent", 3.4),
    ("amazing", 3.4),
    ("fantastic", 3.3),
    ("wonderful", 3.2),
    ("best", 3.2),
    ("awesome", 3.1),
    ("great", 3.1),
    ("beautiful", 2.9),
    ("happy", 2.7),
    ("perfect", 2.7),
    ("impressive", 2.4),
    ("enjoy", 2.2),
    ("pleased", 2.2),
    ("friendly", 2.2),
    ("satisfied", 2.0),
    ("good", 1.9),
    ("helpful", 1.9),
    ("useful", 1.9),
    ("reliable", 1.9),
    ("thank", 1.9),
    ("thanks", 1.9),
    ("easy", 1.9),
    ("nice", 1.8),
    ("recommend", 1.8),
    ("improved", 1.7),
    ("intuitive", 1.6),
    ("clear", 1.6),
    ("clean", 1.6),
    ("liked", 1.6),
    ("like", 1.5),
    ("likes", 1.5),
    ("smooth", 1.5),
    ("solid", 1.5),
    ("responsive", 1.4),
    ("improvement", 1.4),
    ("value", 1.4),
    ("stable", 1.3),
    ("quick", 1.3),
    ("fast", 1.2),
    ("simple", 1.2),
    // negative
    ("worst", -3.1),
    ("hated", -2.9),
    ("hate", -2.7),
    ("scam", -2.6),
    ("horrible", -2.5),
    ("bad", -2.5),
    ("angry", -2.3),
    ("fail", -2.3),
    ("failed", -2.3),
    ("frustrated", -2.2),
    ("terrible", -2.1),
    ("frustrating", -2.1),
    ("disappointing", -2.1),
    ("failure", -2.1),
    ("awful", -2.0),
    ("disappointed", -2.0),
    ("unusable", -2.0),
    ("upset", -1.9),
    ("poor", -1.9),
    ("useless", -1.9),
    ("crash", -1.9),
    ("crashes", -1.9),
    ("crashed", -1.9),
    ("fails", -1.9),
    ("buggy", -1.8),
    ("annoying", -1.8),
    ("unreliable", -1.8),
    ("error", -1.6),
    ("errors", -1.6),
    ("broken", -1.6),
    ("overpriced", -1.6),
    ("problems", -1.6),
    ("problem", -1.5),
    ("confusing", -1.5),
    ("difficult", -1.5),
    ("refused", -1.5),
    ("losing", -1.4),
    ("confused", -1.4),
    ("laggy", -1.4),
    ("refuse", -1.4),
    ("complaint", -1.4),
    ("complaints", -1.4),
    ("bug", -1.3),
    ("bugs", -1.3),
    ("lost", -1.3),
    ("slow", -1.2),
    ("stuck", -1.2),
    ("missing", -1.1),
    ("lag", -1.1),
    ("issue", -0.9),
    ("issues", -0.9),
    ("expensive", -0.9),
];

const NEGATORS: &[&str] = &[
    "not", "no", "never", "none", "neither", "nor", "cannot", "cant", "can't", "dont", "don't",
    "doesnt", "doesn't", "didnt", "didn't", "isnt", "isn't", "wasnt", "wasn't", "wont", "won't",
    "wouldnt", "wouldn't", "couldnt", "couldn't", "shouldnt", "shouldn't", "aint", "ain't",
    "without", "hardly", "barely",
];

/// Intensity modifiers: added to (or subtracted from) the magnitude of the
/// following scored term.
const BOOSTERS: &[(&str, f32)] = &[
    ("extremely", 0.4),
    ("incredibly", 0.4),
    ("very", 0.29),
    ("really", 0.29),
    ("so", 0.29),
    ("totally", 0.29),
    ("completely", 0.29),
    ("absolutely", 0.29),
    ("slightly", -0.29),
    ("somewhat", -0.25),
    ("kinda", -0.25),
    ("marginally", -0.3),
];

static LEXICON: Lazy<HashMap<&'static str, f32>> =
    Lazy::new(|| LEXICON_TABLE.iter().copied().collect());

static BOOSTER_MAP: Lazy<HashMap<&'static str, f32>> =
    Lazy::new(|| BOOSTERS.iter().copied().collect());

/// Compound polarity scorer. Construct once and inject wherever sentence
/// scores are needed.
#[derive(Debug, Clone, Default)]
pub struct SentimentAnalyzer;

impl SentimentAnalyzer {
    pub fn new() -> Self {
        SentimentAnalyzer
    }

    /// Compound polarity of `text` in [-1, 1]; 0.0 for empty or fully
    /// unscored input.
    pub fn compound(&self, text: &str) -> f32 {
        let tokens = tokenize(text);
        let mut total = 0.0f32;

        for (i, token) in tokens.iter().enumerate() {
            let Some(&valence) = LEXICON.get(token.as_str()) else {
                continue;
            };
            let mut scored = valence;
            let start = i.saturating_sub(3);
            for prior in &tokens[start..i] {
                if NEGATORS.contains(&prior.as_str()) {
                    scored *= NEGATION_FACTOR;
                } else if let Some(&boost) = BOOSTER_MAP.get(prior.as_str()) {
                    scored += if scored >= 0.0 { boost } else { -boost };
                }
            }
            total += scored;
        }

        if total == 0.0 {
            return 0.0;
        }
        (total / (total * total + 15.0).sqrt()).clamp(-1.0, 1.0)
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect()
}

/// Reduces a cluster's per-sentence compound scores to one label.
///
/// A single score below the strong-negative threshold marks the whole
/// cluster negative, overriding the count-based vote. Otherwise sentences
/// strictly above the positive threshold vote positive, strictly below the
/// negative threshold vote negative, and the majority wins; ties and
/// all-dead-zone clusters are neutral.
pub fn cluster_sentiment(compounds: &[f32], config: &AppConfig) -> SentimentLabel {
    if compounds.is_empty() {
        return SentimentLabel::Neutral;
    }

    if compounds
        .iter()
        .any(|&c| c < config.sentiment_strong_negative_threshold)
    {
        return SentimentLabel::Negative;
    }

    let pos = compounds
        .iter()
        .filter(|&&c| c > config.sentiment_positive_threshold)
        .count();
    let neg = compounds
        .iter()
        .filter(|&&c| c < config.sentiment_negative_threshold)
        .count();

    if pos > neg && pos >= 1 {
        return SentimentLabel::Positive;
    }
    if neg > pos && neg >= 1 {
        return SentimentLabel::Negative;
    }
    SentimentLabel::Neutral
}
