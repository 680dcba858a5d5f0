use screener_core::SentimentScorer;
use std::collections::HashSet;

const POSITIVE_WORDS: &[&str] = &[
    "bullish", "rally", "surge", "surges", "gain", "gains", "profit", "growth", "beat",
    "beats", "upgrade", "outperform", "strong", "positive", "rise", "rises", "increase",
    "breakthrough", "success", "exceed", "exceeds", "momentum", "record", "high", "advance",
    "dividend", "buyback", "upside", "recovery", "rebound", "expansion", "robust",
    "accelerating", "overweight", "raised", "upgraded", "tailwind", "wins", "bags", "order",
    "approval", "boost", "boosts", "optimistic", "confident",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bearish", "decline", "declines", "loss", "losses", "fall", "falls", "plunge", "crash",
    "miss", "misses", "downgrade", "underperform", "weak", "negative", "drop", "drops",
    "decrease", "concern", "concerns", "risk", "fail", "disappoint", "slump", "warning",
    "pessimistic", "low", "fear", "trouble", "dilution", "headwind", "lawsuit", "litigation",
    "recall", "investigation", "probe", "default", "bankruptcy", "layoff", "layoffs",
    "downside", "overvalued", "underweight", "lowered", "suspended", "penalty", "fraud",
    "slip", "slips",
];

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "aren't", "wasn't",
    "weren't", "won't", "wouldn't", "couldn't", "shouldn't", "hardly", "barely", "neither",
    "nor", "without",
];

/// A sentiment word within this many tokens after a negation flips polarity.
const NEGATION_WINDOW: usize = 3;

/// Squashing constant for mapping a raw word tally onto `(-1, 1)`.
const ALPHA: f64 = 15.0;

/// Deterministic word-list scorer.
///
/// Counts positive and negative finance words (negation flips the word's
/// polarity) and squashes the tally with `x / sqrt(x^2 + 15)`, so one strong
/// word reads as roughly +-0.25 and the score never leaves `[-1, 1]`.
pub struct LexiconScorer {
    positive: HashSet<&'static str>,
    negative: HashSet<&'static str>,
    negation: HashSet<&'static str>,
}

impl LexiconScorer {
    pub fn new() -> Self {
        Self {
            positive: POSITIVE_WORDS.iter().copied().collect(),
            negative: NEGATIVE_WORDS.iter().copied().collect(),
            negation: NEGATION_WORDS.iter().copied().collect(),
        }
    }

    /// Signed word tally before squashing.
    pub fn raw_tally(&self, text: &str) -> i32 {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '.' | '!' | '?' | ':' | '"'))
            .filter(|w| !w.is_empty())
            .collect();

        let negations: Vec<usize> = words
            .iter()
            .enumerate()
            .filter(|(_, w)| self.negation.contains(*w))
            .map(|(i, _)| i)
            .collect();

        let mut tally = 0;
        for (i, word) in words.iter().enumerate() {
            let polarity = if self.positive.contains(*word) {
                1
            } else if self.negative.contains(*word) {
                -1
            } else {
                continue;
            };

            let negated = negations
                .iter()
                .any(|&n| n < i && i - n <= NEGATION_WINDOW);
            tally += if negated { -polarity } else { polarity };
        }
        tally
    }
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer for LexiconScorer {
    fn score(&self, text: &str) -> f64 {
        let x = self.raw_tally(text) as f64;
        x / (x * x + ALPHA).sqrt()
    }

    fn name(&self) -> &str {
        "lexicon"
    }
}
