pub mod compose;
pub mod decoders;
pub mod message_client;
pub mod parser;

pub use message_client::MessageClient;
