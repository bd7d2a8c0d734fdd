//! Chat session collaborator

mod message;

pub use message::{ChatMessage, ChatSession, MessageKind, Sender};
