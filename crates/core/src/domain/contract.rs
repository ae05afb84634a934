use crate::domain::analysis::{KeyMetric, Recommendation, TradeAnalysis, Trend};
use crate::domain::news::{NewsItem, Sentiment};
use anyhow::ensure;
use serde::Deserialize;

/// Wire shape of the analysis payload. The model is only asked, not
/// guaranteed, to conform to the declared schema, so everything is
/// re-validated before it reaches callers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmTradeAnalysis {
    pub recommendation: Recommendation,
    pub confidence_score: f64,
    pub summary: String,
    pub reasoning: Vec<String>,
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub key_metrics: Vec<LlmKeyMetric>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmKeyMetric {
    pub label: String,
    pub value: String,
    pub trend: Trend,
}

impl LlmTradeAnalysis {
    pub fn validate_and_into_analysis(self) -> anyhow::Result<TradeAnalysis> {
        let summary = self.summary.trim().to_string();
        ensure!(!summary.is_empty(), "summary must be non-empty");

        ensure!(
            self.confidence_score.is_finite(),
            "confidenceScore must be a finite number"
        );

        let reasoning: Vec<String> = self
            .reasoning
            .into_iter()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();
        ensure!(!reasoning.is_empty(), "reasoning must have at least one line");

        let risk_factors: Vec<String> = self
            .risk_factors
            .into_iter()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();

        let mut key_metrics = Vec::with_capacity(self.key_metrics.len());
        for metric in self.key_metrics {
            key_metrics.push(metric.validate_and_into_metric()?);
        }

        Ok(TradeAnalysis {
            recommendation: self.recommendation,
            confidence_score: self.confidence_score,
            summary,
            reasoning,
            risk_factors,
            key_metrics,
        })
    }
}

impl LlmKeyMetric {
    fn validate_and_into_metric(self) -> anyhow::Result<KeyMetric> {
        let label = self.label.trim().to_string();
        ensure!(!label.is_empty(), "metric label must be non-empty");

        let value = self.value.trim().to_string();
        ensure!(!value.is_empty(), "metric value must be non-empty");

        Ok(KeyMetric {
            label,
            value,
            trend: self.trend,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmNewsItem {
    pub title: String,
    pub source: String,
    #[serde(default)]
    pub url: Option<String>,
    pub sentiment: Sentiment,
    pub snippet: String,
}

/// The news tool emits `{"items": [...]}` (tool inputs are objects); the
/// text path tends to produce the bare array. Both decode here.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LlmNewsPayload {
    Wrapped { items: Vec<LlmNewsItem> },
    Bare(Vec<LlmNewsItem>),
}

impl LlmNewsPayload {
    pub fn into_items(self) -> Vec<LlmNewsItem> {
        match self {
            LlmNewsPayload::Wrapped { items } => items,
            LlmNewsPayload::Bare(items) => items,
        }
    }
}

impl LlmNewsItem {
    pub fn validate_and_into_item(self) -> anyhow::Result<NewsItem> {
        let title = self.title.trim().to_string();
        ensure!(!title.is_empty(), "news title must be non-empty");

        let source = self.source.trim().to_string();
        ensure!(!source.is_empty(), "news source must be non-empty");

        let snippet = self.snippet.trim().to_string();
        ensure!(!snippet.is_empty(), "news snippet must be non-empty");

        let url = self
            .url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        Ok(NewsItem {
            title,
            source,
            url,
            sentiment: self.sentiment,
            snippet,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_analysis_json() -> serde_json::Value {
        json!({
            "recommendation": "BUY",
            "confidenceScore": 82,
            "summary": "Verdict: BUY. Strong momentum.",
            "reasoning": ["RSI trending up", "Earnings beat"],
            "riskFactors": ["Valuation stretch"],
            "keyMetrics": [
                {"label": "RSI", "value": "62", "trend": "up"}
            ]
        })
    }

    #[test]
    fn accepts_a_valid_analysis() {
        let wire: LlmTradeAnalysis = serde_json::from_value(valid_analysis_json()).unwrap();
        let analysis = wire.validate_and_into_analysis().unwrap();
        assert_eq!(analysis.recommendation, Recommendation::Buy);
        assert_eq!(analysis.confidence_score, 82.0);
        assert_eq!(analysis.key_metrics.len(), 1);
        assert_eq!(analysis.key_metrics[0].trend, Trend::Up);
    }

    #[test]
    fn key_metrics_are_optional_on_the_wire() {
        let mut value = valid_analysis_json();
        value.as_object_mut().unwrap().remove("keyMetrics");
        let wire: LlmTradeAnalysis = serde_json::from_value(value).unwrap();
        let analysis = wire.validate_and_into_analysis().unwrap();
        assert!(analysis.key_metrics.is_empty());
    }

    #[test]
    fn rejects_a_blank_summary() {
        let mut value = valid_analysis_json();
        value["summary"] = json!("   ");
        let wire: LlmTradeAnalysis = serde_json::from_value(value).unwrap();
        assert!(wire.validate_and_into_analysis().is_err());
    }

    #[test]
    fn rejects_empty_reasoning() {
        let mut value = valid_analysis_json();
        value["reasoning"] = json!(["", "  "]);
        let wire: LlmTradeAnalysis = serde_json::from_value(value).unwrap();
        assert!(wire.validate_and_into_analysis().is_err());
    }

    #[test]
    fn news_payload_decodes_wrapped_and_bare() {
        let item = json!({
            "title": "Apple beats estimates",
            "source": "Reuters",
            "sentiment": "positive",
            "snippet": "Q3 revenue up."
        });
        let wrapped: LlmNewsPayload =
            serde_json::from_value(json!({"items": [item.clone()]})).unwrap();
        assert_eq!(wrapped.into_items().len(), 1);

        let bare: LlmNewsPayload = serde_json::from_value(json!([item])).unwrap();
        assert_eq!(bare.into_items().len(), 1);
    }

    #[test]
    fn news_item_blank_url_becomes_none() {
        let wire = LlmNewsItem {
            title: "t".to_string(),
            source: "s".to_string(),
            url: Some("  ".to_string()),
            sentiment: Sentiment::Neutral,
            snippet: "n".to_string(),
        };
        let item = wire.validate_and_into_item().unwrap();
        assert!(item.url.is_none());
    }
}
