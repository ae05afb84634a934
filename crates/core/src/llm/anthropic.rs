use crate::config::Settings;
use crate::llm::error::GatewayError;
use crate::llm::{GenerateReply, GenerateRequest, ModelTier, ModelTransport, Turn, TurnRole};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_ANALYSIS_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_FAST_MODEL: &str = "claude-3-5-haiku-latest";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

const WEB_SEARCH_TOOL_TYPE: &str = "web_search_20250305";
const WEB_SEARCH_MAX_USES: u32 = 5;

/// Messages-API client. Credentials and model names are injected at
/// construction; nothing global.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: HeaderValue,
    base_url: String,
    analysis_model: String,
    fast_model: String,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let mut api_key = HeaderValue::from_str(settings.require_anthropic_api_key()?)
            .context("ANTHROPIC_API_KEY is not a valid header value")?;
        api_key.set_sensitive(true);
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let analysis_model = std::env::var("ANTHROPIC_ANALYSIS_MODEL")
            .unwrap_or_else(|_| DEFAULT_ANALYSIS_MODEL.to_string());
        let fast_model = std::env::var("ANTHROPIC_FAST_MODEL")
            .unwrap_or_else(|_| DEFAULT_FAST_MODEL.to_string());

        let timeout_secs = std::env::var("ANTHROPIC_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            analysis_model,
            fast_model,
        })
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast_model,
            ModelTier::Analysis => &self.analysis_model,
        }
    }

    async fn create_message(
        &self,
        req: CreateMessageRequest,
    ) -> Result<CreateMessageResponse, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", self.api_key.clone());
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        tracing::debug!(model = %req.model, "sending messages request");

        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str::<CreateMessageResponse>(&text)
            .map_err(|err| GatewayError::Envelope(format!("{err}")))
    }
}

#[async_trait::async_trait]
impl ModelTransport for AnthropicClient {
    async fn generate(&self, req: GenerateRequest) -> Result<GenerateReply, GatewayError> {
        let mut tools = Vec::new();
        if req.web_search {
            tools.push(Tool::WebSearch {
                kind: WEB_SEARCH_TOOL_TYPE,
                name: "web_search",
                max_uses: WEB_SEARCH_MAX_USES,
            });
        }

        let mut tool_choice = None;
        let mut emit_tool = None;
        if let Some(schema) = &req.output_schema {
            tools.push(Tool::Custom {
                name: schema.name,
                description: schema.description,
                input_schema: schema.schema.clone(),
            });
            emit_tool = Some(schema.name);
            // A search-grounded call must stay free to run the search tool
            // first, so the emit tool is only forced when search is off.
            if !req.web_search {
                tool_choice = Some(ToolChoice::Tool { name: schema.name });
            }
        }

        let request = CreateMessageRequest {
            model: self.model_for(req.tier).to_string(),
            max_tokens: req.max_tokens,
            system: req.system,
            messages: req.turns.iter().map(Message::from_turn).collect(),
            tools: if tools.is_empty() { None } else { Some(tools) },
            tool_choice,
            thinking: req
                .thinking_budget
                .map(|budget_tokens| Thinking::Enabled { budget_tokens }),
        };

        let res = self.create_message(request).await?;
        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            tracing::warn!("response truncated at max_tokens");
        }
        Ok(reply_from_response(res, emit_tool))
    }
}

fn reply_from_response(
    res: CreateMessageResponse,
    emit_tool: Option<&'static str>,
) -> GenerateReply {
    let mut text = String::new();
    let mut structured = None;
    for block in res.content {
        match block {
            ContentBlock::Text { text: t } => {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&t);
            }
            ContentBlock::ToolUse { name, input, .. } => {
                if structured.is_none() && emit_tool == Some(name.as_str()) {
                    structured = Some(input);
                }
            }
            ContentBlock::Thinking { .. } | ContentBlock::RedactedThinking { .. } => {}
            ContentBlock::Unknown => {}
        }
    }
    GenerateReply { text, structured }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<Thinking>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

impl Message {
    fn from_turn(turn: &Turn) -> Self {
        let role = match turn.role {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        };
        Self {
            role,
            content: turn.text.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum Tool {
    WebSearch {
        #[serde(rename = "type")]
        kind: &'static str,
        name: &'static str,
        max_uses: u32,
    },
    Custom {
        name: &'static str,
        description: &'static str,
        input_schema: serde_json::Value,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ToolChoice {
    #[serde(rename = "tool")]
    Tool { name: &'static str },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Thinking {
    Enabled { budget_tokens: u32 },
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },

    #[serde(rename = "thinking")]
    Thinking {
        #[serde(default)]
        thinking: String,
        #[serde(default)]
        signature: String,
    },

    #[serde(rename = "redacted_thinking")]
    RedactedThinking {
        #[serde(default)]
        data: String,
    },

    #[serde(other)]
    Unknown,
}
