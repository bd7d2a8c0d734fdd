use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::http_client::HttpClientTrait;
use crate::domain::reply::{Reply, ReplyContext, ReplyGenerator};
use crate::domain::DomainError;

const PROVIDER: &str = "chat_server";

/// Reply generator backed by the agent chat server's `POST /chat`
#[derive(Debug)]
pub struct ChatServerReplyGenerator<C: HttpClientTrait> {
    client: C,
    base_url: String,
    auth_header: Option<String>,
}

impl<C: HttpClientTrait> ChatServerReplyGenerator<C> {
    pub fn new(client: C, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            base_url,
            auth_header: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.auth_header = Some(format!("Bearer {}", api_key.into()));
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/chat", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        let mut headers = vec![("Content-Type", "application/json")];
        if let Some(auth) = &self.auth_header {
            headers.push(("Authorization", auth.as_str()));
        }
        headers
    }

    fn build_request(prompt: &str, context: &ReplyContext) -> Value {
        let mut body = serde_json::json!({
            "message": prompt,
            "agentId": context.agent_id,
            "userId": context.user_id,
        });

        if let Some(step_id) = &context.step_id {
            body["stepId"] = serde_json::json!(step_id);
        }

        if let Some(model) = &context.model {
            body["model"] = serde_json::json!(model);
        }

        body
    }

    fn parse_response(response: Value) -> Result<Reply, DomainError> {
        let parsed: ChatServerResponse = serde_json::from_value(response).map_err(|e| {
            DomainError::provider(PROVIDER, format!("Unexpected response shape: {}", e))
        })?;

        let reply = match parsed.reply {
            ChatServerReply::Text(text) => text,
            ChatServerReply::Agent { agent } => agent,
        };

        Ok(Reply::new(reply))
    }
}

#[async_trait]
impl<C: HttpClientTrait> ReplyGenerator for ChatServerReplyGenerator<C> {
    async fn generate(&self, prompt: &str, context: &ReplyContext) -> Result<Reply, DomainError> {
        let url = self.chat_url();
        let body = Self::build_request(prompt, context);

        debug!(
            agent_id = %context.agent_id,
            step_id = context.step_id.as_ref().map(|s| s.as_str()).unwrap_or(""),
            "Requesting reply"
        );

        let response = self.client.post_json(&url, self.headers(), &body).await?;
        Self::parse_response(response)
    }
}

// Chat server API types

#[derive(Debug, Deserialize)]
struct ChatServerResponse {
    reply: ChatServerReply,
}

/// Older servers answer with a bare string, newer ones with the agent text plus tool output
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatServerReply {
    Text(String),
    Agent { agent: String },
}
