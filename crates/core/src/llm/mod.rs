pub mod anthropic;
pub mod error;
pub mod gateway;
pub mod json;

use error::GatewayError;

/// Which model variant a request runs on. The fast tier serves definitions,
/// risk explanations and news; the analysis tier serves the full trade
/// analysis and chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Fast,
    Analysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
        }
    }
}

/// Output shape declared to the model. Declared, not guaranteed: decoded
/// payloads are still validated on the way in.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub tier: ModelTier,
    pub system: Option<String>,
    pub turns: Vec<Turn>,
    pub max_tokens: u32,
    pub web_search: bool,
    pub output_schema: Option<OutputSchema>,
    pub thinking_budget: Option<u32>,
}

impl Default for GenerateRequest {
    fn default() -> Self {
        Self {
            tier: ModelTier::Fast,
            system: None,
            turns: Vec::new(),
            max_tokens: 1024,
            web_search: false,
            output_schema: None,
            thinking_budget: None,
        }
    }
}

/// One model reply: the concatenated text blocks, plus the structured tool
/// payload when the model emitted one.
#[derive(Debug, Clone, Default)]
pub struct GenerateReply {
    pub text: String,
    pub structured: Option<serde_json::Value>,
}

/// Seam between the gateway operations and the concrete provider. Injected
/// at construction so tests can substitute a stub.
#[async_trait::async_trait]
pub trait ModelTransport: Send + Sync {
    async fn generate(&self, req: GenerateRequest) -> Result<GenerateReply, GatewayError>;
}
