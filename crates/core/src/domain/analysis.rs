use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Buy,
    Sell,
    Hold,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Buy => "BUY",
            Recommendation::Sell => "SELL",
            Recommendation::Hold => "HOLD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyMetric {
    pub label: String,
    pub value: String,
    pub trend: Trend,
}

/// The decisive output of the analysis operation. Field names follow the
/// wire format the model is asked to emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeAnalysis {
    pub recommendation: Recommendation,
    pub confidence_score: f64,
    pub summary: String,
    pub reasoning: Vec<String>,
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub key_metrics: Vec<KeyMetric>,
}

impl TradeAnalysis {
    /// Upstream confidence is untrusted; renderers display this instead of
    /// the raw value.
    pub fn confidence_clamped(&self) -> f64 {
        self.confidence_score.clamp(0.0, 100.0)
    }
}

/// A saved analysis. Created on every successful analysis run, never
/// mutated, removable individually or in bulk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub ticker: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub analysis: TradeAnalysis,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recommendation_uses_uppercase_wire_names() {
        let json = serde_json::to_string(&Recommendation::Buy).unwrap();
        assert_eq!(json, "\"BUY\"");
        let back: Recommendation = serde_json::from_str("\"HOLD\"").unwrap();
        assert_eq!(back, Recommendation::Hold);
    }

    #[test]
    fn recommendation_rejects_values_outside_the_enum() {
        assert!(serde_json::from_str::<Recommendation>("\"MAYBE\"").is_err());
    }

    #[test]
    fn confidence_is_clamped_for_rendering() {
        let mut analysis = TradeAnalysis {
            recommendation: Recommendation::Hold,
            confidence_score: 130.0,
            summary: "Verdict: HOLD.".to_string(),
            reasoning: vec!["flat".to_string()],
            risk_factors: vec![],
            key_metrics: vec![],
        };
        assert_eq!(analysis.confidence_clamped(), 100.0);
        analysis.confidence_score = -5.0;
        assert_eq!(analysis.confidence_clamped(), 0.0);
        analysis.confidence_score = 82.0;
        assert_eq!(analysis.confidence_clamped(), 82.0);
    }

    #[test]
    fn history_entry_flattens_the_analysis_fields() {
        let entry = HistoryEntry {
            id: "abc".to_string(),
            ticker: "AAPL".to_string(),
            timestamp: Utc::now(),
            analysis: TradeAnalysis {
                recommendation: Recommendation::Buy,
                confidence_score: 82.0,
                summary: "Verdict: BUY.".to_string(),
                reasoning: vec!["momentum".to_string()],
                risk_factors: vec!["valuation".to_string()],
                key_metrics: vec![],
            },
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["ticker"], "AAPL");
        assert_eq!(value["recommendation"], "BUY");
        assert_eq!(value["confidenceScore"], 82.0);
    }
}
