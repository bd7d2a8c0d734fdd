use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::chat_server::ChatServerReplyGenerator;
use super::disabled::DisabledReplyGenerator;
use super::http_client::HttpClient;
use crate::config::ReplyConfig;
use crate::domain::reply::ReplyGenerator;
use crate::domain::DomainError;

/// Factory for creating reply generators
#[derive(Debug)]
pub struct ReplyGeneratorFactory;

impl ReplyGeneratorFactory {
    /// Builds the chat-server generator, or a disabled one when no base URL is set
    pub fn create(config: &ReplyConfig) -> Result<Arc<dyn ReplyGenerator>, DomainError> {
        let Some(base_url) = config.base_url.as_deref().filter(|url| !url.is_empty()) else {
            warn!("reply.base_url is not set, agent actions and judgments will fail");
            return Ok(Arc::new(DisabledReplyGenerator));
        };

        let client = HttpClient::with_timeout(Duration::from_secs(config.timeout_secs))?;
        let mut generator = ChatServerReplyGenerator::new(client, base_url);

        if let Some(api_key) = &config.api_key {
            generator = generator.with_api_key(api_key);
        }

        info!(base_url, "Reply generator configured");
        Ok(Arc::new(generator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reply::ReplyContext;
    use crate::domain::workflow::{AgentId, UserId};

    #[tokio::test]
    async fn test_missing_base_url_disables_replies() {
        let generator = ReplyGeneratorFactory::create(&ReplyConfig::default()).unwrap();
        let context = ReplyContext::new(AgentId::from("a1"), UserId::from("u1"));

        let result = generator.generate("hi", &context).await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[test]
    fn test_base_url_builds_chat_server_generator() {
        let config = ReplyConfig {
            base_url: Some("http://localhost:3000".to_string()),
            ..ReplyConfig::default()
        };

        assert!(ReplyGeneratorFactory::create(&config).is_ok());
    }
}
