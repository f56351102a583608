//! Parameter structures for MCP tools

use schemars::JsonSchema;
use serde::Deserialize;

/// Parameters for companion_reflect tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReflectParams {
    /// The user's current thought
    #[schemars(description = "The user's current thought or question")]
    pub thought: String,
    /// Include the assembled prompt in the response
    #[schemars(description = "Include the assembled prompt in the response (default: false)")]
    #[serde(default)]
    pub include_prompt: bool,
}

/// Parameters for companion_recall tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RecallParams {
    /// Text to retrieve context for
    #[schemars(description = "Text to retrieve relevant context for")]
    pub query: String,
    /// Store to search: "memories" (default) or "goals"
    #[schemars(description = "Store to search: 'memories' (default) or 'goals'")]
    #[serde(default)]
    pub source: Option<String>,
    /// Maximum entries to return
    #[schemars(description = "Maximum entries to return (default: configured maxResults)")]
    #[serde(default)]
    pub limit: Option<usize>,
}
