use std::collections::BTreeMap;

use approx::assert_relative_eq;
use chrono::NaiveDate;
use screener_core::{Category, EvidenceItem, Score, SignalRecord, SourceType, Track};

use crate::config::*;
use crate::engine::ScoringEngine;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
}

/// Helper: a signal row dated at the test run date.
fn rec(stock: &str, signal: &str, value: Option<f64>) -> SignalRecord {
    SignalRecord::new(stock, signal, value, date())
}

/// Helper: fundamentals-only config with pe / roe / sentiment weighted 0.5 / 0.3 / 0.2.
fn test_config() -> EngineConfig {
    let mut signals = BTreeMap::new();
    signals.insert(
        "pe".to_string(),
        SignalDomain::lower_is_better(0.0, 50.0).reject_below(RejectLimit::inclusive(0.0)),
    );
    signals.insert("roe".to_string(), SignalDomain::higher_is_better(0.0, 0.5));
    signals.insert("sentiment".to_string(), SignalDomain::higher_is_better(-1.0, 1.0));
    signals.insert("debt_to_equity".to_string(), SignalDomain::lower_is_better(0.0, 20.0));
    signals.insert(
        "insider_pct".to_string(),
        SignalDomain::higher_is_better(0.0, 100.0).proxy(),
    );

    let weights: BTreeMap<String, f64> = [("pe", 0.5), ("roe", 0.3), ("sentiment", 0.2)]
        .iter()
        .map(|(k, w)| (k.to_string(), *w))
        .collect();

    let mut tracks = BTreeMap::new();
    tracks.insert(
        Track::Fundamentals,
        TrackConfig {
            weights,
            bands: vec![
                Band::new(0.0, 0.4, Category::AvoidNeedsWork),
                Band::new(0.4, 0.7, Category::Watchlist),
                Band::new(0.7, 1.0, Category::HighPotential),
            ],
        },
    );

    EngineConfig {
        signals,
        tracks,
        overrides: vec![OverrideRule {
            name: "excessive_leverage".to_string(),
            track: Track::Fundamentals,
            signal: "debt_to_equity".to_string(),
            comparison: Comparison::Above,
            threshold: 10.0,
            category: None,
        }],
        evidence: EvidenceConfig { max_items_per_stock: 3 },
        top_n: 10,
    }
}

fn engine() -> ScoringEngine {
    ScoringEngine::new(test_config()).unwrap()
}

/// Helper: a headline evidence row.
fn headline(stock: &str, snippet: &str, sentiment: f64, link: &str) -> EvidenceItem {
    EvidenceItem {
        stock_id: stock.to_string(),
        source_type: SourceType::News,
        snippet: snippet.to_string(),
        matched_term: None,
        sentiment_value: Some(sentiment),
        link: Some(link.to_string()),
        published: None,
    }
}

#[test]
fn test_end_to_end_watchlist() {
    // pe 10 -> 0.8, roe 0.3 -> 0.6, sentiment 0.0 -> 0.5
    let records = vec![
        rec("TITAN", "pe", Some(10.0)),
        rec("TITAN", "roe", Some(0.3)),
        rec("TITAN", "sentiment", Some(0.0)),
    ];

    let report = engine().run(&records, &[]);
    let row = report.classification(Track::Fundamentals, "TITAN").unwrap();

    assert_relative_eq!(row.composite_score.value().unwrap(), 0.68, epsilon = 1e-12);
    assert_eq!(row.category, Category::Watchlist);
    assert_eq!(row.override_rule, None);

    let breakdown: Vec<(&str, f64)> = row
        .contributing_signals
        .iter()
        .map(|c| (c.signal_name.as_str(), c.weight))
        .collect();
    assert_eq!(breakdown, vec![("pe", 0.5), ("roe", 0.3), ("sentiment", 0.2)]);
    assert_eq!(row.reasons[0], "strong pe (0.80)");
}

#[test]
fn test_all_unknown_signals_are_reported_but_not_ranked() {
    let records = vec![
        rec("TITAN", "pe", Some(10.0)),
        rec("TITAN", "roe", Some(0.3)),
        rec("YESBANK", "pe", Some(-4.0)),
        rec("YESBANK", "roe", None),
        rec("YESBANK", "sentiment", Some(f64::NAN)),
    ];

    let report = engine().run(&records, &[]);
    let table = report.table(Track::Fundamentals).unwrap();

    let yes = table.get("YESBANK").unwrap();
    assert_eq!(yes.composite_score, Score::Unknown);
    assert_eq!(yes.category, Category::InsufficientData);
    assert!(yes.contributing_signals.is_empty());

    let top: Vec<&str> = table.top_n(10).iter().map(|c| c.stock_id.as_str()).collect();
    assert_eq!(top, vec!["TITAN"]);
    assert_eq!(table.rows.last().unwrap().stock_id, "YESBANK");
}

#[test]
fn test_composite_is_bit_identical_under_reordering() {
    let mut records = Vec::new();
    for (i, stock) in ["ASIANPAINT", "BAJFINANCE", "COALINDIA", "DRREDDY"].iter().enumerate() {
        let k = i as f64;
        records.push(rec(stock, "pe", Some(7.3 + k * 3.1)));
        records.push(rec(stock, "roe", Some(0.11 + k * 0.037)));
        records.push(rec(stock, "sentiment", Some(-0.23 + k * 0.19)));
    }

    let mut reversed = records.clone();
    reversed.reverse();
    let mut rotated = records.clone();
    rotated.rotate_left(5);

    let engine = engine();
    let bits = |records: &[SignalRecord]| -> Vec<(String, u64)> {
        engine
            .run(records, &[])
            .table(Track::Fundamentals)
            .unwrap()
            .rows
            .iter()
            .map(|c| (c.stock_id.clone(), c.composite_score.value().unwrap().to_bits()))
            .collect()
    };

    let expected = bits(&records);
    assert_eq!(bits(&reversed), expected);
    assert_eq!(bits(&rotated), expected);
}

#[test]
fn test_missing_signal_renormalizes_remaining_weights() {
    let records = vec![rec("TITAN", "pe", Some(10.0)), rec("TITAN", "roe", Some(0.3))];

    let report = engine().run(&records, &[]);
    let row = report.classification(Track::Fundamentals, "TITAN").unwrap();

    // (0.8 * 0.5 + 0.6 * 0.3) / 0.8
    assert_relative_eq!(row.composite_score.value().unwrap(), 0.725, epsilon = 1e-12);
    assert_eq!(row.category, Category::HighPotential);
}

#[test]
fn test_hard_override_beats_high_score() {
    // pe 2.5 -> 0.95, roe 0.475 -> 0.95, sentiment 0.9 -> 0.95
    let records = vec![
        rec("VEDL", "pe", Some(2.5)),
        rec("VEDL", "roe", Some(0.475)),
        rec("VEDL", "sentiment", Some(0.9)),
        rec("VEDL", "debt_to_equity", Some(50.0)),
    ];

    let report = engine().run(&records, &[]);
    let row = report.classification(Track::Fundamentals, "VEDL").unwrap();

    assert_relative_eq!(row.composite_score.value().unwrap(), 0.95, epsilon = 1e-12);
    assert_eq!(row.category, Category::AvoidNeedsWork);
    assert_eq!(row.override_rule.as_deref(), Some("excessive_leverage"));
    assert_eq!(row.reasons[0], "override: excessive_leverage");
}

#[test]
fn test_score_on_band_edge_goes_to_higher_band() {
    let mut config = test_config();
    config
        .signals
        .insert("quality".to_string(), SignalDomain::higher_is_better(0.0, 1.0));
    let fundamentals = config.tracks.get_mut(&Track::Fundamentals).unwrap();
    fundamentals.weights = [("quality".to_string(), 1.0)].into_iter().collect();

    let engine = ScoringEngine::new(config).unwrap();
    let records = vec![rec("MARUTI", "quality", Some(0.4)), rec("BHEL", "quality", Some(0.7))];
    let report = engine.run(&records, &[]);

    let maruti = report.classification(Track::Fundamentals, "MARUTI").unwrap();
    assert_eq!(maruti.composite_score, Score::Known(0.4));
    assert_eq!(maruti.category, Category::Watchlist);

    let bhel = report.classification(Track::Fundamentals, "BHEL").unwrap();
    assert_eq!(bhel.category, Category::HighPotential);
}

#[test]
fn test_evidence_is_deduplicated_capped_and_owned_by_stock() {
    let records = vec![rec("TATAMOTORS", "pe", Some(10.0)), rec("M&M", "pe", Some(20.0))];
    let evidence = vec![
        headline("TATAMOTORS", "EV sales surge", 0.6, "https://n/1"),
        headline("TATAMOTORS", "EV sales surge, again", 0.8, "https://n/1"),
        headline("TATAMOTORS", "JLR margins slip", -0.4, "https://n/2"),
        headline("TATAMOTORS", "Plant visit", 0.05, "https://n/3"),
        headline("TATAMOTORS", "Quiet week", 0.01, "https://n/4"),
        headline("m&m ", "Tractor demand up", 0.5, "https://n/5"),
    ];

    let report = engine().run(&records, &evidence);

    let tata = report.classification(Track::Fundamentals, "TATAMOTORS").unwrap();
    let snippets: Vec<&str> = tata.rationale.iter().map(|e| e.snippet.as_str()).collect();
    assert_eq!(snippets, vec!["EV sales surge, again", "JLR margins slip", "Plant visit"]);
    assert!(tata.rationale.iter().all(|e| e.stock_id == "TATAMOTORS"));

    let mm = report.classification(Track::Fundamentals, "M&M").unwrap();
    assert_eq!(mm.rationale.len(), 1);
    assert_eq!(mm.rationale[0].stock_id, "M&M");

    assert_eq!(report.evidence.len(), 4);
}

#[test]
fn test_stock_ids_are_normalized_and_blank_ids_skipped() {
    let records = vec![
        rec(" infy ", "pe", Some(25.0)),
        rec("INFY", "roe", Some(0.3)),
        rec("   ", "pe", Some(12.0)),
    ];

    let report = engine().run(&records, &[]);
    let table = report.table(Track::Fundamentals).unwrap();

    assert_eq!(table.len(), 1);
    assert_eq!(table.rows[0].stock_id, "INFY");
    assert_eq!(table.rows[0].contributing_signals.len(), 2);
    assert_eq!(report.skipped_records, 1);
}

#[test]
fn test_proxy_data_is_flagged() {
    let mut config = test_config();
    let fundamentals = config.tracks.get_mut(&Track::Fundamentals).unwrap();
    fundamentals.weights = [("pe".to_string(), 0.6), ("insider_pct".to_string(), 0.4)]
        .into_iter()
        .collect();
    let engine = ScoringEngine::new(config).unwrap();

    let records = vec![
        rec("ADANIENT", "pe", Some(25.0)),
        rec("ADANIENT", "insider_pct", Some(72.0)),
        rec("ICICIBANK", "pe", Some(18.0)),
    ];
    let report = engine.run(&records, &[]);

    let adani = report.classification(Track::Fundamentals, "ADANIENT").unwrap();
    assert!(adani.uses_proxy_data);
    assert!(adani.reasons.iter().any(|r| r.ends_with("[proxy]")));

    let icici = report.classification(Track::Fundamentals, "ICICIBANK").unwrap();
    assert!(!icici.uses_proxy_data);
}

#[test]
fn test_default_config_scores_both_tracks() {
    let engine = ScoringEngine::new(EngineConfig::default()).unwrap();
    let records = vec![
        rec("LT", "trailing_pe", Some(32.0)),
        rec("LT", "return_on_equity", Some(0.16)),
        rec("LT", "debt_to_equity", Some(120.0)),
        rec("LT", "company_sentiment", Some(0.35)),
        rec("LT", "keyword_coverage", Some(3.0 / 7.0)),
        rec("LT", "scheme_mentions", Some(6.0)),
        rec("LT", "scheme_sentiment", Some(0.4)),
    ];
    let keyword = EvidenceItem {
        stock_id: "LT".to_string(),
        source_type: SourceType::Keyword,
        snippet: "L&T bags metro rail order".to_string(),
        matched_term: Some("metro".to_string()),
        sentiment_value: Some(0.4),
        link: Some("https://n/lt".to_string()),
        published: None,
    };

    let report = engine.run(&records, &[keyword]);

    let policy = report.classification(Track::Policy, "LT").unwrap();
    assert!(policy.is_ranked());
    assert_eq!(policy.category.track(), Some(Track::Policy));
    assert_eq!(policy.rationale.len(), 1);

    let fundamentals = report.classification(Track::Fundamentals, "LT").unwrap();
    assert!(fundamentals.is_ranked());
    assert!(fundamentals.rationale.is_empty());
}

#[test]
fn test_evidence_cap_applies_per_source() {
    let mut config = test_config();
    config.evidence.max_items_per_stock = 2;
    let engine = ScoringEngine::new(config).unwrap();

    let mut evidence: Vec<EvidenceItem> = (0..4)
        .map(|i| headline("BEL", &format!("Order book story {}", i), 0.9, &format!("https://n/{}", i)))
        .collect();
    evidence.push(EvidenceItem {
        stock_id: "BEL".to_string(),
        source_type: SourceType::Keyword,
        snippet: "BEL gets defence ministry nod".to_string(),
        matched_term: Some("defence".to_string()),
        sentiment_value: Some(0.1),
        link: Some("https://n/kw".to_string()),
        published: None,
    });

    let report = engine.run(&[rec("BEL", "pe", Some(30.0))], &evidence);

    let bel = report.classification(Track::Fundamentals, "BEL").unwrap();
    assert_eq!(bel.rationale.len(), 2);
    assert!(bel.rationale.iter().all(|e| e.source_type == SourceType::News));

    let retained: Vec<SourceType> = report.evidence.iter().map(|e| e.source_type).collect();
    assert_eq!(
        retained,
        vec![SourceType::News, SourceType::News, SourceType::Keyword]
    );
}

#[test]
fn test_reruns_on_same_inputs_produce_equal_reports() {
    let records = vec![
        rec("TITAN", "pe", Some(10.0)),
        rec("TITAN", "roe", Some(0.3)),
        rec("ASIANPAINT", "pe", Some(45.0)),
        rec("ASIANPAINT", "sentiment", Some(0.4)),
    ];
    let evidence = vec![headline("TITAN", "Titan beats estimates", 0.6, "https://n/t")];
    let mut reordered = records.clone();
    reordered.reverse();

    let first = engine().run(&records, &evidence);
    assert_eq!(first, engine().run(&records, &evidence));
    assert_eq!(first, engine().run(&reordered, &evidence));
}
