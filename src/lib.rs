//! Authful MCP Server Library
//!
//! MCP tool server whose single bearer credential authenticates the calling
//! application and carries the per-connector tokens its tools need.

pub mod config;
pub mod credential;
pub mod error;
pub mod middleware;
pub mod server;
pub mod session;
pub mod tools;
pub mod transport;
