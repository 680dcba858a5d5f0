//! Evidence Collector.
//!
//! Retention priority, applied with a stable sort:
//! 1. larger `|sentiment_value|` first (items without sentiment last)
//! 2. more recent `published` first (undated last)
//! 3. snippet, then link, then matched term, ascending
//! 4. signed sentiment descending, then source type
//!
//! Only identical items compare equal, so input order never decides.

use screener_core::{EvidenceItem, SourceType};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Identity of an evidence item for de-duplication.
type EvidenceKey = (SourceType, Option<String>, Option<String>);

fn key(item: &EvidenceItem) -> EvidenceKey {
    (
        item.source_type,
        item.matched_term.clone(),
        item.link.clone(),
    )
}

/// `Ordering::Less` means `a` is kept ahead of `b`.
pub fn priority_cmp(a: &EvidenceItem, b: &EvidenceItem) -> Ordering {
    let strength = |item: &EvidenceItem| {
        item.sentiment_value
            .filter(|v| v.is_finite())
            .map(f64::abs)
    };

    cmp_desc_none_last(strength(a), strength(b), |x, y| x.total_cmp(y))
        .then_with(|| cmp_desc_none_last(a.published, b.published, |x, y| x.cmp(y)))
        .then_with(|| a.snippet.cmp(&b.snippet))
        .then_with(|| a.link.cmp(&b.link))
        .then_with(|| a.matched_term.cmp(&b.matched_term))
        .then_with(|| {
            let signed = |item: &EvidenceItem| item.sentiment_value.filter(|v| !v.is_nan());
            cmp_desc_none_last(signed(a), signed(b), |x, y| x.total_cmp(y))
        })
        .then_with(|| a.source_type.cmp(&b.source_type))
}

fn cmp_desc_none_last<T>(a: Option<T>, b: Option<T>, cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => cmp(&y, &x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone)]
pub struct EvidenceCollector {
    max_items_per_stock: usize,
}

impl EvidenceCollector {
    pub fn new(max_items_per_stock: usize) -> Self {
        Self { max_items_per_stock }
    }

    /// Retained evidence for `stock_id`, highest priority first.
    ///
    /// Items belonging to other stocks are dropped. Items sharing
    /// (source_type, matched_term, link) collapse to the higher-priority one.
    pub fn collect<'a, I>(&self, stock_id: &str, items: I) -> Vec<EvidenceItem>
    where
        I: IntoIterator<Item = &'a EvidenceItem>,
    {
        let mut unique: BTreeMap<EvidenceKey, &EvidenceItem> = BTreeMap::new();
        for item in items {
            if item.stock_id != stock_id {
                tracing::warn!(
                    "evidence for {} passed to collector for {}, dropped",
                    item.stock_id,
                    stock_id
                );
                continue;
            }
            unique
                .entry(key(item))
                .and_modify(|kept| {
                    if priority_cmp(item, *kept) == Ordering::Less {
                        *kept = item;
                    }
                })
                .or_insert(item);
        }

        let mut retained: Vec<EvidenceItem> = unique.into_values().cloned().collect();
        retained.sort_by(priority_cmp);
        retained.truncate(self.max_items_per_stock);
        retained
    }
}
