use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use backtest_engine::{BacktestEvaluator, BacktestObservation, BacktestResult};
use scoring_engine::{ScoringEngine, ScreenReport};
use screener_core::{EvidenceItem, SignalRecord, Track};
use serde::Serialize;
use signal_feeds::{
    build_feeds, FeedInputs, FeedSummaries, FundamentalRow, Headline, LexiconScorer,
};

mod config;

use config::{load_rows, RunnerConfig};

#[derive(Serialize)]
struct RunOutput {
    generated_at: DateTime<Utc>,
    as_of: NaiveDate,
    report: ScreenReport,
    feeds: FeedSummaries,
    #[serde(skip_serializing_if = "Option::is_none")]
    backtest: Option<BacktestResult>,
}

fn main() -> Result<()> {
    // 1. Load .env, init tracing
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));

    tracing::info!("Starting equity screener");

    // 2. Configuration; a broken one stops the run before any scoring
    let runner = RunnerConfig::from_env()?;
    let file = runner.screener_file()?;
    let engine = ScoringEngine::new(file.engine).context("Invalid engine configuration")?;
    let evaluator = BacktestEvaluator::new(file.backtest).context("Invalid backtest configuration")?;
    tracing::info!("Configuration loaded and validated (as of {})", runner.as_of);

    // 3. Input rows
    let mut records: Vec<SignalRecord> = load_rows(runner.signals_path.as_deref(), "signal")?;
    let mut evidence: Vec<EvidenceItem> = load_rows(runner.evidence_path.as_deref(), "evidence")?;

    let inputs = FeedInputs {
        fundamentals: load_rows::<FundamentalRow>(runner.fundamentals_path.as_deref(), "fundamentals")?,
        company_news: load_rows::<Headline>(runner.company_news_path.as_deref(), "company news")?,
        ceo_news: load_rows::<Headline>(runner.ceo_news_path.as_deref(), "CEO news")?,
    };
    let feeds = build_feeds(
        &inputs,
        &LexiconScorer::new(),
        file.policy_keywords.unwrap_or_default(),
        runner.as_of,
    );
    records.extend(feeds.records);
    evidence.extend(feeds.evidence);
    let summaries = feeds.summaries;

    // 4. Score
    let report = engine.run(&records, &evidence);
    for track in Track::ALL {
        if let Some(table) = report.table(track) {
            for (rank, row) in table.top_n(engine.config().top_n).iter().enumerate() {
                tracing::debug!(
                    "{} #{}: {} {} ({})",
                    track,
                    rank + 1,
                    row.stock_id,
                    row.category,
                    row.composite_score
                );
            }
        }
    }

    // 5. Optional offline backtest
    let backtest = match runner.history_path.as_deref() {
        Some(path) => {
            let history: Vec<BacktestObservation> = load_rows(Some(path), "backtest history")?;
            let result = evaluator.evaluate(&history);
            if let Err(e) = result.clone().into_checked() {
                tracing::warn!("{}; Sharpe ratio reported as undefined", e);
            }
            Some(result)
        }
        None => None,
    };

    // 6. Emit
    let output = serde_json::to_string_pretty(&RunOutput {
        generated_at: Utc::now(),
        as_of: runner.as_of,
        report,
        feeds: summaries,
        backtest,
    })
        .context("Failed to serialize screener output")?;
    match &runner.output_path {
        Some(path) => {
            std::fs::write(path, output)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            tracing::info!("Wrote screener output to {}", path.display());
        }
        None => println!("{}", output),
    }

    Ok(())
}
