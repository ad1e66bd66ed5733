//! Pure Rust async client for the [Source server queries](https://developer.valvesoftware.com/wiki/Server_queries)
//! (A2S_INFO, A2S_PLAYER and A2S_RULES), for both Source and GoldSource servers.
pub mod error;
pub mod info;
pub mod packet;
pub mod players;
pub mod query;
mod parse;

pub use error::SourceQueryError;
pub use info::{Environment, ServerInfo, ServerType, SourceTv};
pub use players::{PlayerInfo, Rule};
pub use query::{query, Client, ServerFeatures};
