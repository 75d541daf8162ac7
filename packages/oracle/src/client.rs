//! The HTTP client.

use codex_state::ArchetypalState;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::config::OracleConfig;
use crate::error::{OracleUnavailable, Result};
use crate::insight::{OracleInsight, RitualContext};
use crate::parse::parse_narrative;
use crate::prompt::{build_request, ChatRequest};

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Text and reported model of one completion.
#[derive(Debug)]
struct Reply {
    content: String,
    model: Option<String>,
}

/// Asks a chat-completions service to interpret a transformation.
///
/// [`OracleClient::interpret`] never fails: every error path ends in
/// [`OracleInsight::fallback`].
#[derive(Debug, Clone)]
pub struct OracleClient {
    config: OracleConfig,
    http: Client,
}

impl OracleClient {
    pub fn new(config: OracleConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(OracleConfig::from_env())
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Read the transformation from `pre` to `post`.
    pub async fn interpret(
        &self,
        context: &RitualContext,
        pre: &ArchetypalState,
        post: &ArchetypalState,
    ) -> OracleInsight {
        match self.try_interpret(context, pre, post).await {
            Ok(insight) => insight,
            Err(OracleUnavailable::MissingCredential) => {
                tracing::debug!(ritual = %context.ritual_name, "no oracle credential, using fallback");
                OracleInsight::fallback()
            }
            Err(err) => {
                tracing::warn!(ritual = %context.ritual_name, error = %err, "oracle unavailable, using fallback");
                OracleInsight::fallback()
            }
        }
    }

    async fn try_interpret(
        &self,
        context: &RitualContext,
        pre: &ArchetypalState,
        post: &ArchetypalState,
    ) -> Result<OracleInsight> {
        if !self.config.has_credential() {
            return Err(OracleUnavailable::MissingCredential);
        }
        let endpoint = self.endpoint()?;
        let request = build_request(&self.config, context, pre, post);
        let reply = self.send_with_retry(&endpoint, &request).await?;
        let narrative = parse_narrative(&reply.content);

        Ok(OracleInsight {
            interpretation: narrative.interpretation,
            sections: narrative.sections,
            model: reply.model.unwrap_or_else(|| self.config.model.clone()),
            confidence_score: self.config.confidence_score,
            fallback: false,
        })
    }

    fn endpoint(&self) -> Result<Url> {
        let url = self.config.endpoint();
        Url::parse(&url).map_err(|e| OracleUnavailable::InvalidEndpoint {
            url,
            message: e.to_string(),
        })
    }

    async fn send_with_retry(&self, endpoint: &Url, request: &ChatRequest) -> Result<Reply> {
        let mut attempt = 0;
        loop {
            match self.send_once(endpoint, request).await {
                Ok(reply) => return Ok(reply),
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::debug!(attempt, error = %err, "retrying oracle request");
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once(&self, endpoint: &Url, request: &ChatRequest) -> Result<Reply> {
        let response = self
            .http
            .post(endpoint.clone())
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.timeout)
            .json(request)
            .send()
            .await
            .map_err(OracleUnavailable::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(OracleUnavailable::Status(status.as_u16()));
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                OracleUnavailable::Timeout
            } else {
                OracleUnavailable::MalformedPayload(e.to_string())
            }
        })?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| OracleUnavailable::MalformedPayload("no message content".to_string()))?;

        Ok(Reply {
            content,
            model: body.model.filter(|m| !m.is_empty()),
        })
    }
}
