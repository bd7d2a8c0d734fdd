use async_trait::async_trait;

use crate::domain::reply::{Reply, ReplyContext, ReplyGenerator};
use crate::domain::DomainError;

/// Reply generator used when no chat server is configured
///
/// Every call fails, so `agent` actions surface an error message and agent
/// judgments fail closed.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledReplyGenerator;

#[async_trait]
impl ReplyGenerator for DisabledReplyGenerator {
    async fn generate(&self, _prompt: &str, _context: &ReplyContext) -> Result<Reply, DomainError> {
        Err(DomainError::configuration("No reply generator configured (reply.base_url)"))
    }
}
