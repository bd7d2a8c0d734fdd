//! Reply generator collaborator

mod generator;

pub use generator::{Reply, ReplyContext, ReplyGenerator};

#[cfg(test)]
pub use generator::MockReplyGenerator;
