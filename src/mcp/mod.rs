//! MCP server for the companion
//!
//! Exposes reflection, recall and status as tools over stdio.

mod params;
mod server;

pub use server::{run_mcp_server, CompanionService};
