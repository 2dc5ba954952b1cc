//! Terminal communication: the vendor wire protocol and its transport.

mod client;
pub mod protocol;

pub use client::ZkTerminalClient;
