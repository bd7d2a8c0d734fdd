//! Reply generator implementations

mod chat_server;
mod disabled;
mod factory;
mod http_client;

pub use chat_server::ChatServerReplyGenerator;
pub use disabled::DisabledReplyGenerator;
pub use factory::ReplyGeneratorFactory;
pub use http_client::{HttpClient, HttpClientTrait};
