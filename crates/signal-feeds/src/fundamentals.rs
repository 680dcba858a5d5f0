use chrono::NaiveDate;
use screener_core::{normalize_stock_id, SignalRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fundamentals snapshot for one company as delivered by the data provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalRow {
    pub stock_id: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub trailing_pe: Option<f64>,
    #[serde(default)]
    pub forward_pe: Option<f64>,
    /// Used to derive a trailing PE when the provider has none.
    #[serde(default)]
    pub trailing_eps: Option<f64>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub peg_ratio: Option<f64>,
    #[serde(default)]
    pub price_to_book: Option<f64>,
    #[serde(default)]
    pub debt_to_equity: Option<f64>,
    #[serde(default)]
    pub return_on_equity: Option<f64>,
    #[serde(default)]
    pub return_on_assets: Option<f64>,
    #[serde(default)]
    pub profit_margins: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    /// Insider holding fraction scaled to percent. Stands in for promoter holding.
    #[serde(default)]
    pub insider_holding_pct: Option<f64>,
}

pub struct FundamentalsFeed;

impl FundamentalsFeed {
    pub fn new() -> Self {
        Self
    }

    fn calculate_pe_ratio(&self, price: f64, eps: f64) -> Option<f64> {
        if eps > 0.0 && price > 0.0 {
            Some(price / eps)
        } else {
            None
        }
    }

    /// Provider PE, else price / EPS for profitable companies.
    pub fn trailing_pe(&self, row: &FundamentalRow) -> Option<f64> {
        finite(row.trailing_pe).or_else(|| {
            let price = finite(row.current_price)?;
            let eps = finite(row.trailing_eps)?;
            self.calculate_pe_ratio(price, eps)
        })
    }

    /// Median trailing PE per industry, over peers with a positive PE.
    pub fn industry_median_pe<'a, I>(&self, rows: I) -> BTreeMap<String, f64>
    where
        I: IntoIterator<Item = &'a FundamentalRow>,
    {
        let mut by_industry: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for row in rows {
            let (Some(industry), Some(pe)) = (industry_of(row), self.trailing_pe(row)) else {
                continue;
            };
            if pe > 0.0 {
                by_industry.entry(industry).or_default().push(pe);
            }
        }

        by_industry
            .into_iter()
            .filter_map(|(industry, pes)| median(pes).map(|m| (industry, m)))
            .collect()
    }

    /// 1 when forward PE is below trailing PE (both positive), 0 otherwise,
    /// unknown when either is missing.
    fn forward_pe_improvement(&self, trailing: Option<f64>, forward: Option<f64>) -> Option<f64> {
        let (trailing, forward) = (trailing?, finite(forward)?);
        let improving = trailing > 0.0 && forward > 0.0 && forward < trailing;
        Some(if improving { 1.0 } else { 0.0 })
    }

    /// Signal rows for every company. Rows with a blank stock id are skipped;
    /// a repeated stock id keeps its last row.
    pub fn signal_records(&self, rows: &[FundamentalRow], as_of: NaiveDate) -> Vec<SignalRecord> {
        let mut latest: BTreeMap<String, &FundamentalRow> = BTreeMap::new();
        for row in rows {
            match normalize_stock_id(&row.stock_id) {
                Ok(id) => {
                    latest.insert(id, row);
                }
                Err(e) => tracing::warn!("Skipping fundamentals row: {}", e),
            }
        }

        // Peers are the collapsed universe: one row per valid stock id.
        let medians = self.industry_median_pe(latest.values().copied());
        let mut records = Vec::new();

        for (stock_id, row) in latest {
            let trailing = self.trailing_pe(row);
            let pe_vs_industry = match (trailing, industry_of(row).and_then(|i| medians.get(&i))) {
                (Some(pe), Some(median)) if pe > 0.0 && *median > 0.0 => Some(pe / median),
                _ => None,
            };

            let values = [
                ("trailing_pe", trailing),
                ("forward_pe", finite(row.forward_pe)),
                ("pe_vs_industry", pe_vs_industry),
                ("forward_pe_improvement", self.forward_pe_improvement(trailing, row.forward_pe)),
                ("peg_ratio", finite(row.peg_ratio)),
                ("price_to_book", finite(row.price_to_book)),
                ("debt_to_equity", finite(row.debt_to_equity)),
                ("return_on_equity", finite(row.return_on_equity)),
                ("return_on_assets", finite(row.return_on_assets)),
                ("profit_margins", finite(row.profit_margins)),
                ("promoter_holding_pct", finite(row.insider_holding_pct)),
            ];

            records.extend(
                values
                    .into_iter()
                    .map(|(name, value)| SignalRecord::new(&stock_id, name, value, as_of)),
            );
        }

        tracing::info!("Derived {} fundamentals signal rows", records.len());
        records
    }
}

impl Default for FundamentalsFeed {
    fn default() -> Self {
        Self::new()
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn industry_of(row: &FundamentalRow) -> Option<String> {
    row.industry
        .as_deref()
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .map(str::to_string)
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}
