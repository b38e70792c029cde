use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::Value;

use super::model::TrendItem;

/// Reads a `/trends` response, a `/timeline` response or a bare list of
/// trend items. Timeline months are flattened in order; the same keyword
/// may appear more than once.
pub fn parse_trends(raw: &str) -> Result<Vec<TrendItem>> {
    let parsed: Value = serde_json::from_str(raw).context("invalid trends JSON")?;

    if let Some(list) = parsed.as_array() {
        return parse_list(list, "trend list");
    }

    let object = parsed
        .as_object()
        .ok_or_else(|| anyhow!("unexpected JSON type for trends"))?;

    if let Some(trends) = object.get("trends") {
        let list = trends
            .as_array()
            .ok_or_else(|| anyhow!("`trends` is not a list"))?;
        return parse_list(list, "trends");
    }

    if let Some(timeline) = object.get("timeline") {
        let months = timeline
            .as_array()
            .ok_or_else(|| anyhow!("`timeline` is not a list"))?;
        let mut flattened = Vec::new();
        for month in months {
            let label = month.get("month").and_then(Value::as_str).unwrap_or("?");
            let Some(top) = month.get("top_trends") else {
                continue;
            };
            let list = top
                .as_array()
                .ok_or_else(|| anyhow!("`top_trends` for month {label} is not a list"))?;
            flattened.extend(parse_list(list, label)?);
        }
        return Ok(flattened);
    }

    Err(anyhow!(
        "could not find `trends` or `timeline` in trends JSON"
    ))
}

fn parse_list(list: &[Value], context: &str) -> Result<Vec<TrendItem>> {
    list.iter()
        .enumerate()
        .map(|(index, value)| {
            TrendItem::deserialize(value)
                .with_context(|| format!("invalid trend at index {index} in {context}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trend::model::{Platform, Sentiment};

    #[test]
    fn reads_a_trends_response() {
        let raw = r#"{
            "trends": [
                {
                    "keyword": "延迟退休",
                    "platforms": ["weibo", "zhihu"],
                    "raw_heat_score": 98000,
                    "real_score": 15400.5,
                    "sentiment": "angry",
                    "first_seen": "2024-09-13T08:00:00",
                    "peak_time": "2024-09-14T10:00:00",
                    "last_seen": "2024-09-20T23:00:00",
                    "is_marketing": false,
                    "platform_count": 2
                }
            ],
            "total_count": 1,
            "generated_at": "2024-09-21T00:00:00"
        }"#;

        let trends = parse_trends(raw).unwrap();
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].keyword, "延迟退休");
        assert_eq!(trends[0].platforms, vec![Platform::Weibo, Platform::Zhihu]);
        assert_eq!(trends[0].sentiment, Sentiment::Angry);
        assert_eq!(trends[0].real_score, 15400.5);
    }

    #[test]
    fn flattens_timeline_months() {
        let raw = r#"{
            "year": 2024,
            "timeline": [
                {"month": "2024-01", "top_trends": [
                    {"keyword": "a", "real_score": 1.0},
                    {"keyword": "b", "real_score": 2.0}
                ]},
                {"month": "2024-02", "top_trends": [
                    {"keyword": "a", "real_score": 5.0}
                ]},
                {"month": "2024-03"}
            ]
        }"#;

        let keywords = parse_trends(raw)
            .unwrap()
            .into_iter()
            .map(|trend| (trend.keyword, trend.real_score))
            .collect::<Vec<_>>();
        assert_eq!(
            keywords,
            vec![
                ("a".to_owned(), 1.0),
                ("b".to_owned(), 2.0),
                ("a".to_owned(), 5.0)
            ]
        );
    }

    #[test]
    fn reads_a_bare_list() {
        let trends = parse_trends(r#"[{"keyword": "x", "raw_heat_score": 7}]"#).unwrap();
        assert_eq!(trends[0].raw_heat_score, 7.0);
    }

    #[test]
    fn rejects_unknown_shapes_and_bad_items() {
        assert!(parse_trends("not json").is_err());
        assert!(parse_trends("42").is_err());
        assert!(parse_trends(r#"{"items": []}"#).is_err());
        assert!(parse_trends(r#"{"trends": {}}"#).is_err());

        let error = parse_trends(r#"{"trends": [{"keyword": "ok"}, {"real_score": 1}]}"#)
            .unwrap_err();
        assert!(format!("{error:#}").contains("index 1"));
    }
}
