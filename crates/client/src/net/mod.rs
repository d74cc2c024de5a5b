pub mod client;
pub mod config;
pub mod input;
pub mod prediction;

pub use netphys_core::{ConnectionState, NetworkStats};

pub use client::NetworkClient;
pub use config::ClientConfig;
pub use input::InputState;
pub use prediction::{InputBuffer, PendingInput};
