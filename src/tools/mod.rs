pub mod add_event;
pub mod query;

use std::future::Future;
use std::sync::Arc;

use add_event::AddEventParams;
use query::QueryParams;
use rmcp::handler::server::tool::{Parameters, ToolRouter};
use rmcp::{tool, tool_handler, tool_router, ServerHandler};

use crate::memory::core::CausalMemory;

/// The tool handler. Holds the shared memory engine and exposes the two
/// memory tools via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct MemoryTools {
    tool_router: ToolRouter<Self>,
    memory: Arc<CausalMemory>,
}

#[tool_router]
impl MemoryTools {
    pub fn new(memory: Arc<CausalMemory>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            memory,
        }
    }

    /// Record an event in causal memory.
    #[tool(
        description = "[MEMORY PROTOCOL] Record an event in causal memory after every action you take. The system will automatically determine causal relationships with previous events using semantic similarity and LLM reasoning, creating links that enable narrative chain reconstruction."
    )]
    async fn add_event(
        &self,
        Parameters(params): Parameters<AddEventParams>,
    ) -> Result<String, String> {
        tracing::info!(effect_len = params.effect.len(), "add_event called");

        let memory = Arc::clone(&self.memory);
        let effect = params.effect;
        let effect_echo = effect.clone();
        let event_id = tokio::task::spawn_blocking(move || memory.add_event(&effect))
            .await
            .map_err(|e| format!("ingest task failed: {e}"))?
            .map_err(|e| e.to_string())?;

        Ok(format!(
            "Successfully added event #{event_id} to memory: {effect_echo}"
        ))
    }

    /// Query causal memory and return the narrative.
    #[tool(
        description = "[MEMORY PROTOCOL] Query the causal memory for context before acting on a complex task. Returns the chronological narrative leading to the most relevant remembered event."
    )]
    async fn query(
        &self,
        Parameters(params): Parameters<QueryParams>,
    ) -> Result<String, String> {
        tracing::info!(query_len = params.query.len(), "query called");

        let memory = Arc::clone(&self.memory);
        let query = params.query;
        let narrative = tokio::task::spawn_blocking(move || memory.query(&query))
            .await
            .map_err(|e| format!("query task failed: {e}"))?
            .map_err(|e| e.to_string())?;

        Ok(narrative)
    }
}

#[tool_handler]
impl ServerHandler for MemoryTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Sequitur is a causal event memory. Query context BEFORE acting on a \
                 complex task, and record an event AFTER every action you take. \
                 Events are automatically linked into causal chains and recalled \
                 as chronological narratives."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
