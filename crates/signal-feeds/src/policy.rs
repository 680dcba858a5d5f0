//! Policy and government-scheme keyword relevance.
//!
//! A headline counts as a scheme mention when it matches at least one keyword
//! of any configured category. Per stock this yields:
//! - `keyword_coverage`: distinct matched categories / configured categories
//! - `scheme_mentions`: number of matching headlines
//! - `scheme_sentiment`: mean sentiment of matching headlines (absent with no mentions)
//!
//! and one `keyword` evidence item per matched (headline, keyword).

use chrono::NaiveDate;
use screener_core::{ConfigError, EvidenceItem, SignalRecord, SourceType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::news::{distinct_links, ScoredHeadline, TOP_LINKS};

const DEFAULT_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "capex_infra",
        &["infrastructure", "infra", "capex", "highway", "railway", "metro", "airport", "port", "construction"],
    ),
    (
        "manufacturing_pli",
        &["pli", "production linked incentive", "manufacturing", "electronics manufacturing", "domestic manufacturing"],
    ),
    (
        "defence",
        &["defence", "defense", "defence ministry", "military", "order win"],
    ),
    (
        "energy_transition",
        &["renewable", "solar", "wind", "green hydrogen", "battery", "ev", "energy transition"],
    ),
    (
        "banking_credit",
        &["credit growth", "msme", "fiscal", "budget", "policy support", "rate cut"],
    ),
    (
        "agri_rural",
        &["agri", "agriculture", "rural", "fertilizer", "irrigation", "crop"],
    ),
    (
        "healthcare_pharma",
        &["healthcare", "pharma", "drug policy", "medical devices"],
    ),
];

/// Category name to keywords. Keywords are matched case-insensitively on
/// word boundaries, so "port" does not fire inside "report".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<String>>", into = "BTreeMap<String, Vec<String>>")]
pub struct PolicyKeywords {
    categories: BTreeMap<String, Vec<String>>,
}

impl From<BTreeMap<String, Vec<String>>> for PolicyKeywords {
    fn from(raw: BTreeMap<String, Vec<String>>) -> Self {
        Self::new(raw)
    }
}

impl From<PolicyKeywords> for BTreeMap<String, Vec<String>> {
    fn from(keywords: PolicyKeywords) -> Self {
        keywords.categories
    }
}

impl Default for PolicyKeywords {
    fn default() -> Self {
        let categories = DEFAULT_KEYWORDS
            .iter()
            .map(|(cat, words)| (cat.to_string(), words.iter().map(|w| w.to_string()).collect()))
            .collect();
        Self { categories }
    }
}

impl PolicyKeywords {
    /// Keywords are lower-cased and trimmed, blanks dropped. Falls back to the
    /// default map when nothing usable is left.
    pub fn new(categories: impl IntoIterator<Item = (String, Vec<String>)>) -> Self {
        let categories: BTreeMap<String, Vec<String>> = categories
            .into_iter()
            .map(|(cat, words)| {
                let words: Vec<String> = words
                    .iter()
                    .map(|w| w.trim().to_lowercase())
                    .filter(|w| !w.is_empty())
                    .collect();
                (cat.trim().to_string(), words)
            })
            .filter(|(cat, words)| !cat.is_empty() && !words.is_empty())
            .collect();

        if categories.is_empty() {
            tracing::warn!("No usable policy keywords configured, using defaults");
            return Self::default();
        }
        Self { categories }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Every (category, keyword) found in `text`, category order then keyword order.
    pub fn matches<'a>(&'a self, text: &str) -> Vec<(&'a str, &'a str)> {
        let lower = text.to_lowercase();
        self.categories
            .iter()
            .flat_map(|(cat, words)| words.iter().map(move |w| (cat.as_str(), w.as_str())))
            .filter(|(_, word)| contains_word(&lower, word))
            .collect()
    }
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    let boundary = |c: Option<char>| c.map_or(true, |c| !c.is_alphanumeric());
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        boundary(before) && boundary(after)
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySummary {
    pub stock_id: String,
    pub scheme_mentions: usize,
    /// `None` when no headline matched.
    pub avg_scheme_sentiment: Option<f64>,
    pub matched_categories: Vec<String>,
    pub keyword_coverage: f64,
    /// Sum over matching headlines of `1.5 x categories hit + 2 x positive sentiment`.
    pub policy_benefit_score: f64,
    pub top_links: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PolicyScan {
    pub summaries: Vec<PolicySummary>,
    pub evidence: Vec<EvidenceItem>,
}

impl PolicyScan {
    /// The three policy signal rows for every scanned stock.
    pub fn signal_records(&self, as_of: NaiveDate) -> Vec<SignalRecord> {
        self.summaries
            .iter()
            .flat_map(|s| {
                [
                    SignalRecord::new(&s.stock_id, "keyword_coverage", Some(s.keyword_coverage), as_of),
                    SignalRecord::new(&s.stock_id, "scheme_mentions", Some(s.scheme_mentions as f64), as_of),
                    SignalRecord::new(&s.stock_id, "scheme_sentiment", s.avg_scheme_sentiment, as_of),
                ]
            })
            .collect()
    }
}

pub struct PolicyScanner {
    keywords: PolicyKeywords,
}

impl PolicyScanner {
    pub fn new(keywords: PolicyKeywords) -> Self {
        Self { keywords }
    }

    pub fn keywords(&self) -> &PolicyKeywords {
        &self.keywords
    }

    /// Scan scored headlines (stock ids already normalized).
    ///
    /// Every stock with at least one headline gets a summary, so a stock the
    /// news covers but no scheme mentions reads as zero coverage rather than
    /// missing data. Summaries are in stock id order.
    pub fn scan(&self, scored: &[ScoredHeadline]) -> PolicyScan {
        let mut by_stock: BTreeMap<&str, Vec<&ScoredHeadline>> = BTreeMap::new();
        for s in scored {
            by_stock.entry(s.headline.stock_id.as_str()).or_default().push(s);
        }

        let configured = self.keywords.category_count() as f64;
        let mut scan = PolicyScan::default();

        for (stock_id, rows) in by_stock {
            let mut categories: BTreeSet<&str> = BTreeSet::new();
            let mut matching: Vec<&ScoredHeadline> = Vec::new();
            let mut benefit = 0.0;

            for row in rows {
                let hits = self.keywords.matches(&row.headline.title);
                if hits.is_empty() {
                    continue;
                }

                let row_categories: BTreeSet<&str> = hits.iter().map(|(c, _)| *c).collect();
                benefit += row_categories.len() as f64 * 1.5 + row.sentiment.max(0.0) * 2.0;
                categories.extend(row_categories);
                matching.push(row);

                for (_, keyword) in hits {
                    scan.evidence.push(EvidenceItem {
                        stock_id: stock_id.to_string(),
                        source_type: SourceType::Keyword,
                        snippet: row.headline.title.clone(),
                        matched_term: Some(keyword.to_string()),
                        sentiment_value: Some(row.sentiment),
                        link: row.headline.link.clone(),
                        published: row.headline.published,
                    });
                }
            }

            let avg_scheme_sentiment = if matching.is_empty() {
                None
            } else {
                Some(matching.iter().map(|r| r.sentiment).sum::<f64>() / matching.len() as f64)
            };

            scan.summaries.push(PolicySummary {
                stock_id: stock_id.to_string(),
                scheme_mentions: matching.len(),
                avg_scheme_sentiment,
                matched_categories: categories.iter().map(|c| c.to_string()).collect(),
                keyword_coverage: categories.len() as f64 / configured,
                policy_benefit_score: benefit,
                top_links: distinct_links(matching.iter().map(|r| &r.headline), TOP_LINKS),
            });
        }

        tracing::info!(
            "Policy scan: {} stocks, {} keyword evidence items",
            scan.summaries.len(),
            scan.evidence.len()
        );
        scan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::news::{Headline, SentimentLabel};
    use approx::assert_relative_eq;

    fn scored(stock: &str, title: &str, sentiment: f64, link: &str) -> ScoredHeadline {
        ScoredHeadline {
            headline: Headline {
                stock_id: stock.to_string(),
                title: title.to_string(),
                link: Some(link.to_string()),
                published: None,
                source: None,
            },
            sentiment,
            label: SentimentLabel::from_score(sentiment),
        }
    }

    #[test]
    fn test_matches_on_word_boundaries() {
        let keywords = PolicyKeywords::default();
        assert!(keywords.matches("Quarterly report shows weak demand").is_empty());
        assert!(keywords.matches("Every analyst agrees").is_empty());

        let hits = keywords.matches("Govt PLI scheme lifts EV makers");
        assert_eq!(
            hits,
            vec![("energy_transition", "ev"), ("manufacturing_pli", "pli")]
        );
    }

    #[test]
    fn test_blank_keyword_config_falls_back_to_defaults() {
        let keywords = PolicyKeywords::new(vec![("empty".to_string(), vec!["  ".to_string()])]);
        assert_eq!(keywords, PolicyKeywords::default());
        assert_eq!(keywords.category_count(), 7);
    }

    #[test]
    fn test_keywords_from_json() {
        let keywords =
            PolicyKeywords::from_json_str(r#"{"defence": ["Defence", " missile "]}"#).unwrap();
        assert_eq!(keywords.matches("New MISSILE order"), vec![("defence", "missile")]);
        assert!(PolicyKeywords::from_json_str("[1, 2]").is_err());
    }

    #[test]
    fn test_scan_summary_and_records() {
        let scanner = PolicyScanner::new(PolicyKeywords::default());
        let rows = vec![
            scored("LT", "L&T bags metro and airport contracts", 0.5, "https://n/1"),
            scored("LT", "Defence ministry clears L&T order win", 0.3, "https://n/2"),
            scored("LT", "L&T chairman retires", -0.2, "https://n/3"),
            scored("TCS", "TCS hires freshers", 0.1, "https://n/4"),
        ];

        let scan = scanner.scan(&rows);
        assert_eq!(scan.summaries.len(), 2);

        let lt = &scan.summaries[0];
        assert_eq!(lt.stock_id, "LT");
        assert_eq!(lt.scheme_mentions, 2);
        assert_eq!(lt.matched_categories, vec!["capex_infra", "defence"]);
        assert_relative_eq!(lt.keyword_coverage, 2.0 / 7.0);
        assert_relative_eq!(lt.avg_scheme_sentiment.unwrap(), 0.4, epsilon = 1e-12);
        // (1 * 1.5 + 0.5 * 2) + (1 * 1.5 + 0.3 * 2)
        assert_relative_eq!(lt.policy_benefit_score, 4.6, epsilon = 1e-12);
        assert_eq!(lt.top_links, vec!["https://n/1", "https://n/2"]);

        let tcs = &scan.summaries[1];
        assert_eq!(tcs.scheme_mentions, 0);
        assert_eq!(tcs.avg_scheme_sentiment, None);
        assert_eq!(tcs.keyword_coverage, 0.0);

        // metro, airport, defence, defence ministry, order win
        assert_eq!(scan.evidence.len(), 5);
        assert!(scan.evidence.iter().all(|e| e.stock_id == "LT"));

        let as_of = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let records = scan.signal_records(as_of);
        assert_eq!(records.len(), 6);
        let tcs_sentiment = records
            .iter()
            .find(|r| r.stock_id == "TCS" && r.signal_name == "scheme_sentiment")
            .unwrap();
        assert_eq!(tcs_sentiment.raw_value, None);
    }
}
