//! Feature extraction for the scoring engine.
//!
//! Turns already-fetched fundamentals snapshots and headlines into
//! `SignalRecord` and `EvidenceItem` rows. Nothing here touches the network.

pub mod fundamentals;
pub mod lexicon;
pub mod news;
pub mod policy;

pub use fundamentals::{FundamentalRow, FundamentalsFeed};
pub use lexicon::LexiconScorer;
pub use news::{Headline, NewsKind, NewsSummary, ScoredHeadline, SentimentLabel};
pub use policy::{PolicyKeywords, PolicyScan, PolicyScanner, PolicySummary};

use chrono::NaiveDate;
use screener_core::{EvidenceItem, SentimentScorer, SignalRecord};
use serde::{Deserialize, Serialize};

/// Per-stock news and policy tables, reported next to the ranked output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedSummaries {
    pub company_news: Vec<NewsSummary>,
    pub ceo_news: Vec<NewsSummary>,
    pub policy: Vec<PolicySummary>,
}

/// Rows ready for `ScoringEngine::run`, plus the summaries they came from.
#[derive(Debug, Clone, Default)]
pub struct FeedBundle {
    pub records: Vec<SignalRecord>,
    pub evidence: Vec<EvidenceItem>,
    pub summaries: FeedSummaries,
}

impl FeedBundle {
    pub fn extend(&mut self, other: FeedBundle) {
        self.records.extend(other.records);
        self.evidence.extend(other.evidence);
        self.summaries.company_news.extend(other.summaries.company_news);
        self.summaries.ceo_news.extend(other.summaries.ceo_news);
        self.summaries.policy.extend(other.summaries.policy);
    }
}

/// Raw collaborator inputs for one run.
#[derive(Debug, Clone, Default)]
pub struct FeedInputs {
    pub fundamentals: Vec<FundamentalRow>,
    pub company_news: Vec<Headline>,
    pub ceo_news: Vec<Headline>,
}

/// Build every signal and evidence row from the raw inputs.
///
/// Company headlines feed both the `company_sentiment` signal and the policy
/// scan; CEO commentary only feeds `ceo_sentiment`.
pub fn build_feeds(
    inputs: &FeedInputs,
    scorer: &dyn SentimentScorer,
    keywords: PolicyKeywords,
    as_of: NaiveDate,
) -> FeedBundle {
    let mut bundle = FeedBundle {
        records: FundamentalsFeed::new().signal_records(&inputs.fundamentals, as_of),
        ..Default::default()
    };

    let company = news::score_headlines(scorer, &inputs.company_news);
    let company_summaries = news::summarize(&company);
    bundle
        .records
        .extend(news::signal_records(NewsKind::Company, &company_summaries, as_of));
    bundle.evidence.extend(news::evidence(&company));
    bundle.summaries.company_news = company_summaries;

    let ceo = news::score_headlines(scorer, &inputs.ceo_news);
    let ceo_summaries = news::summarize(&ceo);
    bundle
        .records
        .extend(news::signal_records(NewsKind::Ceo, &ceo_summaries, as_of));
    bundle.evidence.extend(news::evidence(&ceo));
    bundle.summaries.ceo_news = ceo_summaries;

    let scan = PolicyScanner::new(keywords).scan(&company);
    bundle.records.extend(scan.signal_records(as_of));
    bundle.evidence.extend(scan.evidence);
    bundle.summaries.policy = scan.summaries;

    tracing::info!(
        "Built {} signal rows and {} evidence items",
        bundle.records.len(),
        bundle.evidence.len()
    );
    bundle
}

#[cfg(test)]
mod tests {
    use super::*;
    use screener_core::SourceType;

    #[test]
    fn test_build_feeds_end_to_end() {
        let inputs = FeedInputs {
            fundamentals: vec![FundamentalRow {
                stock_id: "NTPC".to_string(),
                industry: Some("Utilities".to_string()),
                trailing_pe: Some(16.0),
                ..Default::default()
            }],
            company_news: vec![Headline {
                stock_id: "ntpc".to_string(),
                title: "NTPC wins solar capacity order, shares surge".to_string(),
                link: Some("https://n/ntpc".to_string()),
                published: None,
                source: None,
            }],
            ceo_news: Vec::new(),
        };
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();

        let bundle = build_feeds(&inputs, &LexiconScorer::new(), PolicyKeywords::default(), as_of);

        // 11 fundamentals + company_sentiment + 3 policy rows
        assert_eq!(bundle.records.len(), 15);
        assert!(bundle.records.iter().all(|r| r.stock_id == "NTPC"));

        let sentiment = bundle
            .records
            .iter()
            .find(|r| r.signal_name == "company_sentiment")
            .and_then(|r| r.raw_value)
            .unwrap();
        assert!(sentiment > 0.0);

        let news = bundle.evidence.iter().filter(|e| e.source_type == SourceType::News).count();
        let keyword = bundle
            .evidence
            .iter()
            .filter(|e| e.source_type == SourceType::Keyword)
            .count();
        assert_eq!((news, keyword), (1, 1));

        let summaries = &bundle.summaries;
        assert_eq!(summaries.company_news.len(), 1);
        assert_eq!(summaries.company_news[0].news_count, 1);
        assert_eq!(summaries.company_news[0].top_links, vec!["https://n/ntpc".to_string()]);
        assert!(summaries.ceo_news.is_empty());

        let policy = &summaries.policy[0];
        assert_eq!(policy.stock_id, "NTPC");
        assert_eq!(policy.scheme_mentions, 1);
        assert!(policy.matched_categories.contains(&"energy_transition".to_string()));
        assert!(policy.policy_benefit_score > 0.0);
    }
}
