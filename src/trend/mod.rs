mod model;
mod parse;

use std::collections::HashSet;

use tracing::{debug, warn};

pub use model::{Platform, Sentiment, SizeMetric, TrendItem};
pub use parse::parse_trends;

use crate::sim::Item;

/// Picks which trends become bubbles and how big they are.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemFilter {
    pub metric: SizeMetric,
    pub min_magnitude: f64,
    pub max_nodes: Option<usize>,
    pub include_marketing: bool,
}

impl Default for ItemFilter {
    fn default() -> Self {
        Self {
            metric: SizeMetric::default(),
            min_magnitude: 0.0,
            max_nodes: None,
            include_marketing: false,
        }
    }
}

impl ItemFilter {
    /// Ranks trends by the metric, largest first, and emits one seed item
    /// per keyword. A keyword seen more than once keeps its largest value.
    pub fn select(&self, trends: &[TrendItem]) -> Vec<Item> {
        let threshold = self.min_magnitude.max(0.0);

        let mut ranked = trends
            .iter()
            .filter(|trend| self.include_marketing || !trend.is_marketing)
            .filter(|trend| !trend.keyword.is_empty())
            .filter_map(|trend| {
                let value = self.metric.value(trend);
                if !value.is_finite() || value < 0.0 {
                    warn!(
                        keyword = %trend.keyword,
                        metric = self.metric.label(),
                        value,
                        "skipping trend with unusable metric"
                    );
                    return None;
                }
                (value >= threshold).then_some((value, trend))
            })
            .collect::<Vec<_>>();

        ranked.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| a.1.keyword.cmp(&b.1.keyword))
        });

        let limit = self.max_nodes.unwrap_or(usize::MAX);
        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for (value, trend) in ranked {
            if items.len() >= limit {
                break;
            }
            if !seen.insert(trend.keyword.as_str()) {
                continue;
            }
            items.push(Item::new(
                trend.keyword.clone(),
                value,
                trend.sentiment.label(),
            ));
        }

        debug!(
            input = trends.len(),
            selected = items.len(),
            metric = self.metric.label(),
            "selected trends"
        );
        items
    }
}
