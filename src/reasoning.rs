use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{LegalMethod, Scope};
use crate::error::ChatError;
use crate::gemini::{self, Content, GenerateRequest, GenerationConfig, GoogleSearch, Part, Tool};
use crate::session::GroundingSource;

const TEXT_MODEL: &str = "gemini-3-pro-preview";

pub const NO_ANSWER_TEXT: &str = "I was unable to find specific information for this query.";

/// Input to the reasoning collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningRequest {
    pub prompt: String,
    /// Base64 images (optionally `data:` URLs) sent alongside the prompt.
    pub attachments: Vec<String>,
    pub legal_method: LegalMethod,
    pub scope: Scope,
}

/// Answer text plus citations in the order the collaborator returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReasoningReply {
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn generate(&self, request: ReasoningRequest) -> Result<ReasoningReply, ChatError>;
}

pub fn system_instruction(scope: Scope, legal_method: LegalMethod) -> String {
    let jurisdiction = match scope {
        Scope::Nigeria => "Nigeria (Constitution and Laws)",
        Scope::Global => "Global/International",
    };
    let method = match legal_method {
        LegalMethod::None => "Provide a detailed, well-structured response.".to_string(),
        other => format!("Apply the {other} methodology to your reasoning."),
    };

    format!(
        "You are OmniSearch AI, a high-intelligence research assistant.\n\
         CRITICAL: For every query, ALWAYS use the 'googleSearch' tool to verify facts, \
         check recent events, and cite sources.\n\
         JURISDICTION FOCUS: {jurisdiction}.\n\
         {method}\n\
         Always provide factual citations and link to sources."
    )
}

/// Grounded answers straight from Gemini with the search tool enabled.
pub struct GeminiReasoning {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiReasoning {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: gemini::API_BASE.to_string(),
        }
    }

    /// Point at a different models endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_request(request: &ReasoningRequest) -> GenerateRequest {
        let mut parts = vec![Part::text(request.prompt.clone())];
        for image in &request.attachments {
            // Strip a `data:image/...;base64,` prefix if present.
            let data = image.split_once(',').map_or(image.as_str(), |(_, d)| d);
            parts.push(Part::inline("image/jpeg", data));
        }

        GenerateRequest {
            system_instruction: Some(Content::text(system_instruction(
                request.scope,
                request.legal_method,
            ))),
            contents: vec![Content { parts }],
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
            generation_config: GenerationConfig {
                temperature: Some(0.1),
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl ReasoningService for GeminiReasoning {
    async fn generate(&self, request: ReasoningRequest) -> Result<ReasoningReply, ChatError> {
        let body = Self::build_request(&request);
        let resp = gemini::generate_content(&self.client, &self.base_url, TEXT_MODEL, &self.api_key, &body)
            .await?;

        Ok(ReasoningReply {
            text: resp.text().unwrap_or_else(|| NO_ANSWER_TEXT.to_string()),
            sources: resp.grounding_sources(),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProxyRequest<'a> {
    prompt: &'a str,
    sources: &'a [GroundingSource],
    legal_method: LegalMethod,
    scope: Scope,
}

#[derive(Deserialize)]
struct ProxyResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    sources: Vec<ProxySource>,
}

/// Proxies disagree on the link field name; the first non-empty of `uri`,
/// `link`, `url` wins.
#[derive(Deserialize)]
struct ProxySource {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl ProxySource {
    fn into_source(self) -> Option<GroundingSource> {
        let uri = [self.uri, self.link, self.url]
            .into_iter()
            .flatten()
            .find(|u| !u.is_empty())?;
        Some(GroundingSource {
            title: self
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Search Reference".to_string()),
            uri,
        })
    }
}

impl ProxyResponse {
    fn into_reply(self) -> ReasoningReply {
        ReasoningReply {
            text: self
                .text
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| NO_ANSWER_TEXT.to_string()),
            sources: self
                .sources
                .into_iter()
                .filter_map(ProxySource::into_source)
                .collect(),
        }
    }
}

/// Research proxy that performs search and LLM calls server-side.
pub struct ProxyReasoning {
    client: reqwest::Client,
    endpoint: String,
}

impl ProxyReasoning {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ReasoningService for ProxyReasoning {
    async fn generate(&self, request: ReasoningRequest) -> Result<ReasoningReply, ChatError> {
        let body = ProxyRequest {
            prompt: &request.prompt,
            sources: &[],
            legal_method: request.legal_method,
            scope: request.scope,
        };

        let resp = self.client.post(&self.endpoint).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ChatError::Api { status, body });
        }

        let parsed: ProxyResponse = resp.json().await?;
        Ok(parsed.into_reply())
    }
}
