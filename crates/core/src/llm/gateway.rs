use crate::domain::analysis::TradeAnalysis;
use crate::domain::chat::{ChatMessage, ChatRole};
use crate::domain::contract::{LlmNewsPayload, LlmTradeAnalysis};
use crate::domain::news::NewsItem;
use crate::llm::error::GatewayError;
use crate::llm::{json, GenerateRequest, ModelTier, ModelTransport, OutputSchema, Turn};
use std::sync::Arc;

pub const LOOKUP_FALLBACK: &str = "Could not define term.";
pub const RISK_EMPTY_FALLBACK: &str = "No details available.";
pub const RISK_ERROR_FALLBACK: &str = "Unable to fetch details at this time.";

const CHAT_SYSTEM_PROMPT: &str = "You are a helpful and cautious financial assistant. \
     Do not give binding financial advice, but provide educational analysis.";

const ANALYSIS_TOOL_NAME: &str = "emit_trade_analysis";
const NEWS_TOOL_NAME: &str = "emit_market_news";

const FAST_MAX_TOKENS: u32 = 1024;
const NEWS_MAX_TOKENS: u32 = 2048;
const CHAT_MAX_TOKENS: u32 = 2048;
const ANALYSIS_MAX_TOKENS: u32 = 8192;
const ANALYSIS_THINKING_BUDGET: u32 = 4096;

/// The five operations the views call. Single-shot, no retries; the failure
/// policy differs per operation: supplementary results degrade to
/// empty/fallback values, the decisive analysis fails loudly.
#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn ModelTransport>,
}

impl Gateway {
    pub fn new(transport: Arc<dyn ModelTransport>) -> Self {
        Self { transport }
    }

    /// Search-grounded headlines for a ticker or topic. News is
    /// supplementary, so every failure is logged and swallowed.
    pub async fn fetch_market_news(&self, query: &str) -> Vec<NewsItem> {
        match self.fetch_market_news_inner(query).await {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(query, error = %err, "market news fetch failed; returning no items");
                Vec::new()
            }
        }
    }

    async fn fetch_market_news_inner(&self, query: &str) -> Result<Vec<NewsItem>, GatewayError> {
        let req = GenerateRequest {
            tier: ModelTier::Fast,
            turns: vec![Turn::user(news_prompt(query))],
            max_tokens: NEWS_MAX_TOKENS,
            web_search: true,
            output_schema: Some(news_schema()),
            ..GenerateRequest::default()
        };

        let reply = self.transport.generate(req).await?;
        let payload: LlmNewsPayload = match reply.structured {
            Some(value) => serde_json::from_value(value)
                .map_err(|err| GatewayError::decode(format!("news tool payload: {err}")))?,
            None => {
                if reply.text.trim().is_empty() {
                    return Ok(Vec::new());
                }
                json::decode_payload(&reply.text)?
            }
        };

        payload
            .into_items()
            .into_iter()
            .map(|item| {
                item.validate_and_into_item()
                    .map_err(|err| GatewayError::decode(err.to_string()))
            })
            .collect()
    }

    /// The decisive operation: a full BUY/SELL/HOLD analysis. Failures
    /// propagate; a recommendation is never fabricated or defaulted.
    pub async fn analyze_trade(
        &self,
        ticker: &str,
        context: &str,
    ) -> Result<TradeAnalysis, GatewayError> {
        let req = GenerateRequest {
            tier: ModelTier::Analysis,
            turns: vec![Turn::user(analysis_prompt(ticker, context))],
            max_tokens: ANALYSIS_MAX_TOKENS,
            web_search: true,
            output_schema: Some(analysis_schema()),
            thinking_budget: Some(ANALYSIS_THINKING_BUDGET),
            ..GenerateRequest::default()
        };

        let reply = self.transport.generate(req).await?;
        let wire: LlmTradeAnalysis = match reply.structured {
            Some(value) => serde_json::from_value(value)
                .map_err(|err| GatewayError::decode(format!("analysis tool payload: {err}")))?,
            None => {
                if reply.text.trim().is_empty() {
                    return Err(GatewayError::EmptyResponse);
                }
                json::decode_payload(&reply.text)?
            }
        };

        wire.validate_and_into_analysis()
            .map_err(|err| GatewayError::decode(err.to_string()))
    }

    /// One-sentence definition of a financial term. Degrades to a fixed
    /// fallback; never fails.
    pub async fn quick_lookup(&self, term: &str) -> String {
        let req = GenerateRequest {
            tier: ModelTier::Fast,
            turns: vec![Turn::user(format!(
                "Explain the financial term or concept \"{term}\" briefly in one sentence."
            ))],
            max_tokens: FAST_MAX_TOKENS,
            ..GenerateRequest::default()
        };

        match self.transport.generate(req).await {
            Ok(reply) => {
                let text = reply.text.trim();
                if text.is_empty() {
                    LOOKUP_FALLBACK.to_string()
                } else {
                    text.to_string()
                }
            }
            Err(err) => {
                tracing::warn!(term, error = %err, "term lookup failed");
                LOOKUP_FALLBACK.to_string()
            }
        }
    }

    /// One conversational exchange. The gateway is stateless across calls:
    /// it replays the history it is handed and appends the new message; the
    /// caller owns the session log.
    pub async fn send_chat_message(
        &self,
        history: &[ChatMessage],
        new_message: &str,
    ) -> Result<String, GatewayError> {
        let mut turns: Vec<Turn> = history
            .iter()
            .map(|message| match message.role {
                ChatRole::User => Turn::user(message.text.as_str()),
                ChatRole::Model => Turn::assistant(message.text.as_str()),
            })
            .collect();
        turns.push(Turn::user(new_message));

        let req = GenerateRequest {
            tier: ModelTier::Analysis,
            system: Some(CHAT_SYSTEM_PROMPT.to_string()),
            turns,
            max_tokens: CHAT_MAX_TOKENS,
            ..GenerateRequest::default()
        };

        let reply = self.transport.generate(req).await?;
        Ok(reply.text)
    }

    /// Concise explanation of why a named risk matters for a ticker right
    /// now. Always invoked from an expandable detail panel, so it degrades
    /// to an inline fallback instead of failing.
    pub async fn explain_risk_factor(&self, ticker: &str, risk: &str) -> String {
        let req = GenerateRequest {
            tier: ModelTier::Fast,
            turns: vec![Turn::user(format!(
                "Explain why \"{risk}\" is a specific significant risk factor for the asset \
                 \"{ticker}\" right now. Keep the explanation concise (under 50 words) and \
                 specific to the current market context."
            ))],
            max_tokens: FAST_MAX_TOKENS,
            ..GenerateRequest::default()
        };

        match self.transport.generate(req).await {
            Ok(reply) => {
                let text = reply.text.trim();
                if text.is_empty() {
                    RISK_EMPTY_FALLBACK.to_string()
                } else {
                    text.to_string()
                }
            }
            Err(err) => {
                tracing::warn!(ticker, risk, error = %err, "risk explanation failed");
                RISK_ERROR_FALLBACK.to_string()
            }
        }
    }
}

fn news_prompt(query: &str) -> String {
    format!(
        "Find the latest financial news, earnings reports, and market sentiment for {query}. \
         Return a list of 3-5 key news items with their sentiment."
    )
}

fn analysis_prompt(ticker: &str, context: &str) -> String {
    let steps = [
        "MANDATORY STEPS:",
        "1. SEARCH: Use the web search tool to retrieve the LATEST real-time data:",
        "   - Technical analysis: RSI, MACD, moving averages (50/200 day), support/resistance levels.",
        "   - Fundamental analysis: recent earnings, revenue growth, net income, balance sheet health.",
        "   - Sentiment: recent news, analyst upgrades/downgrades.",
        "2. DECIDE:",
        "   - Evaluate all factors.",
        "   - If the trend is bullish and fundamentals are strong -> BUY.",
        "   - If the trend is bearish or fundamentals are deteriorating -> SELL.",
        "   - If signals are mixed or the market is flat -> HOLD.",
        "   - Be decisive. Do not simply list facts; form a conclusion.",
        "3. OUTPUT:",
        "   - The 'summary' MUST start with a clear verdict (e.g., \"Verdict: BUY. The stock is showing strong momentum...\").",
        "   - Provide specific reasoning for the decision in the 'reasoning' list.",
    ]
    .join("\n");

    format!(
        "You are an expert financial trading AI. Your goal is to provide a clear, decisive \
         BUY, SELL, or HOLD recommendation for {ticker} based on data.\n\n\
         User context: \"{context}\"\n\n\
         {steps}\n\n\
         Emit the final analysis through the {ANALYSIS_TOOL_NAME} tool."
    )
}

fn analysis_schema() -> OutputSchema {
    // Strict and explicit to maximize compliance.
    let schema = serde_json::json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["recommendation", "confidenceScore", "summary", "reasoning", "riskFactors"],
        "properties": {
            "recommendation": {"type": "string", "enum": ["BUY", "SELL", "HOLD"]},
            "confidenceScore": {"type": "number", "minimum": 0, "maximum": 100},
            "summary": {"type": "string"},
            "reasoning": {"type": "array", "items": {"type": "string"}},
            "riskFactors": {"type": "array", "items": {"type": "string"}},
            "keyMetrics": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["label", "value", "trend"],
                    "properties": {
                        "label": {"type": "string"},
                        "value": {"type": "string"},
                        "trend": {"type": "string", "enum": ["up", "down", "neutral"]}
                    }
                }
            }
        }
    });

    OutputSchema {
        name: ANALYSIS_TOOL_NAME,
        description: "Emit the final trade analysis as structured JSON",
        schema,
    }
}

fn news_schema() -> OutputSchema {
    let schema = serde_json::json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["items"],
        "properties": {
            "items": {
                "type": "array",
                "minItems": 3,
                "maxItems": 5,
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["title", "source", "sentiment", "snippet"],
                    "properties": {
                        "title": {"type": "string"},
                        "source": {"type": "string"},
                        "url": {"type": "string"},
                        "sentiment": {"type": "string", "enum": ["positive", "negative", "neutral"]},
                        "snippet": {"type": "string"}
                    }
                }
            }
        }
    });

    OutputSchema {
        name: NEWS_TOOL_NAME,
        description: "Emit the collected market news items as structured JSON",
        schema,
    }
}
