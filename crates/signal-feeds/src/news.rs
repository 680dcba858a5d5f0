//! News sentiment summaries.
//!
//! Headlines are scored by a `SentimentScorer`, labelled at +-0.05, summarised
//! per stock and turned into one sentiment signal row per stock plus `news`
//! evidence items.

use chrono::{DateTime, NaiveDate, Utc};
use screener_core::{
    normalize_stock_id, EvidenceItem, SentimentScorer, SignalRecord, SourceType,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Labels and vibes switch at this compound score.
pub const LABEL_THRESHOLD: f64 = 0.05;

/// Distinct links kept per summary.
pub const TOP_LINKS: usize = 3;

/// A fetched headline, before scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub stock_id: String,
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Which sentiment signal a headline stream feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsKind {
    /// Coverage of the company itself.
    Company,
    /// Commentary and interviews of the chief executive.
    Ceo,
}

impl NewsKind {
    pub fn signal_name(&self) -> &'static str {
        match self {
            NewsKind::Company => "company_sentiment",
            NewsKind::Ceo => "ceo_sentiment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= LABEL_THRESHOLD {
            SentimentLabel::Positive
        } else if score <= -LABEL_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn vibe(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive vibe",
            SentimentLabel::Neutral => "neutral vibe",
            SentimentLabel::Negative => "negative vibe",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredHeadline {
    pub headline: Headline,
    pub sentiment: f64,
    pub label: SentimentLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsSummary {
    pub stock_id: String,
    pub news_count: usize,
    pub positive_count: usize,
    pub neutral_count: usize,
    pub negative_count: usize,
    pub avg_sentiment: f64,
    pub top_links: Vec<String>,
    pub vibe: String,
}

/// Score every headline. Headlines with a blank stock id are dropped; the
/// remaining ids are normalized.
pub fn score_headlines(scorer: &dyn SentimentScorer, headlines: &[Headline]) -> Vec<ScoredHeadline> {
    let scored: Vec<ScoredHeadline> = headlines
        .iter()
        .filter_map(|h| {
            let stock_id = match normalize_stock_id(&h.stock_id) {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!("Skipping headline '{}': {}", h.title, e);
                    return None;
                }
            };
            let raw = scorer.score(&h.title);
            let sentiment = if raw.is_finite() { raw.clamp(-1.0, 1.0) } else { 0.0 };
            Some(ScoredHeadline {
                headline: Headline {
                    stock_id,
                    ..h.clone()
                },
                sentiment,
                label: SentimentLabel::from_score(sentiment),
            })
        })
        .collect();

    tracing::debug!("{} scored {} headlines", scorer.name(), scored.len());
    scored
}

/// Per-stock summaries, best average sentiment first, then most coverage,
/// then stock id.
pub fn summarize(scored: &[ScoredHeadline]) -> Vec<NewsSummary> {
    let mut by_stock: BTreeMap<&str, Vec<&ScoredHeadline>> = BTreeMap::new();
    for s in scored {
        by_stock.entry(s.headline.stock_id.as_str()).or_default().push(s);
    }

    let mut summaries: Vec<NewsSummary> = by_stock
        .into_iter()
        .map(|(stock_id, rows)| {
            let count_of = |label| rows.iter().filter(|r| r.label == label).count();
            let avg_sentiment = rows.iter().map(|r| r.sentiment).sum::<f64>() / rows.len() as f64;
            NewsSummary {
                stock_id: stock_id.to_string(),
                news_count: rows.len(),
                positive_count: count_of(SentimentLabel::Positive),
                neutral_count: count_of(SentimentLabel::Neutral),
                negative_count: count_of(SentimentLabel::Negative),
                avg_sentiment,
                top_links: distinct_links(rows.iter().map(|r| &r.headline), TOP_LINKS),
                vibe: SentimentLabel::from_score(avg_sentiment).vibe().to_string(),
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.avg_sentiment
            .total_cmp(&a.avg_sentiment)
            .then(b.news_count.cmp(&a.news_count))
            .then_with(|| a.stock_id.cmp(&b.stock_id))
    });
    summaries
}

/// First `limit` distinct non-blank links, in input order.
pub(crate) fn distinct_links<'a>(
    headlines: impl Iterator<Item = &'a Headline>,
    limit: usize,
) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    for link in headlines.filter_map(|h| h.link.as_deref()) {
        let link = link.trim();
        if !link.is_empty() && !links.iter().any(|l| l == link) {
            links.push(link.to_string());
            if links.len() == limit {
                break;
            }
        }
    }
    links
}

/// One `company_sentiment` or `ceo_sentiment` row per summary.
pub fn signal_records(kind: NewsKind, summaries: &[NewsSummary], as_of: NaiveDate) -> Vec<SignalRecord> {
    summaries
        .iter()
        .map(|s| SignalRecord::new(&s.stock_id, kind.signal_name(), Some(s.avg_sentiment), as_of))
        .collect()
}

/// Every scored headline as a `news` evidence item.
pub fn evidence(scored: &[ScoredHeadline]) -> Vec<EvidenceItem> {
    scored
        .iter()
        .map(|s| EvidenceItem {
            stock_id: s.headline.stock_id.clone(),
            source_type: SourceType::News,
            snippet: s.headline.title.clone(),
            matched_term: None,
            sentiment_value: Some(s.sentiment),
            link: s.headline.link.clone(),
            published: s.headline.published,
        })
        .collect()
}
