//! Chat session implementations

mod in_memory;
mod storage;

pub use in_memory::InMemoryChatSession;
pub use storage::{MessageContent, MessageRecord, StorageChatSession};
