//! Companion MCP Server implementation

use anyhow::Result;
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::params::{RecallParams, ReflectParams};
use crate::companion::{Companion, SourceKind};
use crate::core::paths::HomePaths;

/// Upper bound on entries a single recall may request
const MAX_RECALL_LIMIT: usize = 50;

#[derive(Debug, Serialize)]
struct ReflectionJson {
    reply: String,
    generated: bool,
    recorded: bool,
    memories: Vec<String>,
    goals: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<String>,
}

#[derive(Debug, Serialize)]
struct StatusJson {
    home: String,
    mode: String,
    generator: String,
    memories: usize,
    goals: usize,
    constitution: bool,
    memory_index: bool,
    goals_index: bool,
}

/// Companion MCP Service
#[derive(Clone)]
pub struct CompanionService {
    paths: HomePaths,
    companion: Arc<Mutex<Companion>>,
    tool_router: ToolRouter<Self>,
}

impl CompanionService {
    pub fn new(home: PathBuf) -> Self {
        let paths = HomePaths::from_root(home);
        let companion = Companion::from_home(&paths);
        Self::with_companion(paths, companion)
    }

    pub fn with_companion(paths: HomePaths, companion: Companion) -> Self {
        Self {
            paths,
            companion: Arc::new(Mutex::new(companion)),
            tool_router: Self::tool_router(),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(value).map_err(|e| {
        McpError::internal_error(format!("JSON serialization failed: {}", e), None)
    })
}

#[tool_router]
impl CompanionService {
    /// Reflect on a thought with retrieved context and record it
    #[tool(
        description = "Reflect on the user's thought. Retrieves relevant memories and goals, generates a reply and records the exchange in the memory log."
    )]
    async fn companion_reflect(
        &self,
        params: Parameters<ReflectParams>,
    ) -> Result<CallToolResult, McpError> {
        let ReflectParams {
            thought,
            include_prompt,
        } = params.0;
        if thought.trim().is_empty() {
            return Ok(CallToolResult::success(vec![Content::text(
                "Nothing to reflect on: the thought is empty.",
            )]));
        }

        // Generation may run an external process; keep it off the async workers.
        let companion = self.companion.clone();
        let reflection = tokio::task::spawn_blocking(move || {
            let companion = companion.blocking_lock();
            companion.respond(&thought)
        })
        .await
        .map_err(|e| McpError::internal_error(format!("Reflection task failed: {}", e), None))?;

        let output = to_json(&ReflectionJson {
            reply: reflection.reply,
            generated: reflection.generated,
            recorded: reflection.recorded,
            memories: reflection
                .memories
                .iter()
                .map(|m| m.summary.clone())
                .collect(),
            goals: reflection
                .goals
                .iter()
                .map(|g| format!("{}: {}", g.name, g.description))
                .collect(),
            prompt: include_prompt.then_some(reflection.prompt),
        })?;

        Ok(CallToolResult::success(vec![Content::text(output)]))
    }

    /// Retrieve context without generating or recording
    #[tool(
        description = "Retrieve the memories or goals most relevant to a query, using the configured keyword or semantic strategy. Nothing is recorded."
    )]
    async fn companion_recall(
        &self,
        params: Parameters<RecallParams>,
    ) -> Result<CallToolResult, McpError> {
        let source = match params.0.source.as_deref() {
            None => SourceKind::Memories,
            Some(s) => match SourceKind::parse(s) {
                Some(source) => source,
                None => {
                    return Ok(CallToolResult::success(vec![Content::text(format!(
                        "Unknown source '{}'. Use 'memories' or 'goals'.",
                        s
                    ))]))
                }
            },
        };
        let limit = params.0.limit.map(|l| l.clamp(1, MAX_RECALL_LIMIT));
        let query = params.0.query;

        // Reads the index file and encodes the query
        let companion = self.companion.clone();
        let recall = tokio::task::spawn_blocking(move || {
            let companion = companion.blocking_lock();
            companion.recall(&query, source, limit)
        })
        .await
        .map_err(|e| McpError::internal_error(format!("Recall task failed: {}", e), None))?
        .map_err(|e| McpError::internal_error(format!("Recall failed: {}", e), None))?;

        Ok(CallToolResult::success(vec![Content::text(to_json(
            &recall,
        )?)]))
    }

    /// Store counts and retrieval configuration
    #[tool(description = "Show memory and goal counts, the retrieval mode and whether vector indexes exist.")]
    async fn companion_status(&self) -> Result<CallToolResult, McpError> {
        let companion = self.companion.lock().await;
        let stores = companion.stores();

        let status = StatusJson {
            home: self.paths.root.display().to_string(),
            mode: companion.mode().to_string(),
            generator: companion.generator_name().to_string(),
            memories: stores.memory.load().len(),
            goals: stores.goals.load().len(),
            constitution: self.paths.constitution.exists(),
            memory_index: self.paths.memory_index.exists(),
            goals_index: self.paths.goals_index.exists(),
        };

        Ok(CallToolResult::success(vec![Content::text(to_json(
            &status,
        )?)]))
    }
}

#[rmcp::tool_handler]
impl ServerHandler for CompanionService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Reflective companion MCP Server. Retrieves relevant memories and goals for a thought and keeps a memory log.".to_string()
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Run the MCP server
pub async fn run_mcp_server(home: PathBuf) -> Result<()> {
    use tokio::io::{stdin, stdout};

    let service = CompanionService::new(home.clone());
    info!(home = %home.display(), "starting MCP server on stdio");
    let transport = (stdin(), stdout());
    let server = service.serve(transport).await?;
    server.waiting().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::entry::{GoalEntry, MemoryEntry, TextFields};
    use crate::core::store::{write_json_sequence, MemoryStore};
    use crate::retrieval::RetrievalMode;
    use crate::search::{build_index_file, HtpEmbedder};
    use tempfile::TempDir;

    fn text_of(result: &CallToolResult) -> String {
        let value = serde_json::to_value(result).unwrap();
        value["content"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }

    fn service() -> (TempDir, CompanionService) {
        let dir = TempDir::new().unwrap();
        let paths = HomePaths::from_root(dir.path().to_path_buf());
        write_json_sequence(
            &paths.memory,
            &[MemoryEntry::from_summary("Thinking about an art project")],
        )
        .unwrap();
        write_json_sequence(
            &paths.goals,
            &[GoalEntry::new("Launch AI MVP prototype", "Ship it.")],
        )
        .unwrap();
        let service = CompanionService::new(dir.path().to_path_buf());
        (dir, service)
    }

    #[tokio::test]
    async fn test_reflect_records_memory() {
        let (dir, service) = service();
        let result = service
            .companion_reflect(Parameters(ReflectParams {
                thought: "The art project is going slowly".to_string(),
                include_prompt: true,
            }))
            .await
            .unwrap();

        let json: serde_json::Value = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(json["recorded"], true);
        assert_eq!(json["memories"][0], "Thinking about an art project");
        assert!(json["prompt"].as_str().unwrap().contains("User's current thought"));

        let paths = HomePaths::from_root(dir.path().to_path_buf());
        assert_eq!(MemoryStore::new(&paths.memory).load().len(), 2);
    }

    #[tokio::test]
    async fn test_recall_goals_and_unknown_source() {
        let (_dir, service) = service();
        let result = service
            .companion_recall(Parameters(RecallParams {
                query: "AI prototype".to_string(),
                source: Some("goals".to_string()),
                limit: Some(1),
            }))
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(json["entries"][0]["text"], "Launch AI MVP prototype: Ship it.");
        assert_eq!(json["mode"], "keyword");

        let result = service
            .companion_recall(Parameters(RecallParams {
                query: "anything".to_string(),
                source: Some("dreams".to_string()),
                limit: None,
            }))
            .await
            .unwrap();
        assert!(text_of(&result).starts_with("Unknown source"));
    }

    #[tokio::test]
    async fn test_semantic_recall_reads_index_file() {
        let (dir, _) = service();
        let paths = HomePaths::from_root(dir.path().to_path_buf());
        let mut config = Config::default();
        config.retrieval.mode = RetrievalMode::Semantic;
        config.save(dir.path()).unwrap();
        build_index_file::<MemoryEntry>(
            &paths.memory,
            &paths.memory_index,
            &TextFields::memory(),
            &HtpEmbedder::new(),
        )
        .unwrap();

        let service = CompanionService::new(dir.path().to_path_buf());
        let result = service
            .companion_recall(Parameters(RecallParams {
                query: "Thinking about an art project".to_string(),
                source: None,
                limit: None,
            }))
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(json["mode"], "semantic");
        assert_eq!(json["entries"][0]["text"], "Thinking about an art project");
        assert!(json["entries"][0]["similarity"].as_f64().unwrap() > 0.99);
    }

    #[tokio::test]
    async fn test_status_counts() {
        let (_dir, service) = service();
        let result = service.companion_status().await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(json["memories"], 1);
        assert_eq!(json["goals"], 1);
        assert_eq!(json["memory_index"], false);
    }
}
