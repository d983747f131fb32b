//! MCP server over stdio.
//!
//! Advertises the fixed tool catalog and forwards every call to the
//! `Dispatcher`. Per-call failures never surface as protocol errors; only
//! the handshake or the stdio transport itself can end the session.

use std::future::Future;
use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ListToolsResult, PaginatedRequestParam,
    ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::transport::stdio;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler, ServiceExt};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::dispatcher::{Dispatcher, ToolReply};
use crate::tools::ToolName;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("MCP handshake failed: {0}")]
    Handshake(String),

    #[error("MCP transport failed: {0}")]
    Transport(String),
}

/// Lifecycle of the single stdio session, kept for the log. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Uninitialized,
    Initialized,
    Serving,
    ShuttingDown,
    Closed,
}

#[derive(Debug)]
struct Session {
    phase: Phase,
}

impl Session {
    fn new() -> Self {
        Self {
            phase: Phase::Uninitialized,
        }
    }

    /// Move to `next`; backward moves are ignored.
    fn advance(&mut self, next: Phase) {
        if next <= self.phase {
            debug!("Ignoring session move {:?} -> {:?}", self.phase, next);
            return;
        }
        info!("Session {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }
}

/// Resolve once `signal` does. True only for a delivered interrupt; a
/// handler that failed to install is logged and leaves the session running.
async fn interrupted<F>(signal: F) -> bool
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            info!("Interrupt received");
            true
        }
        Err(e) => {
            warn!("Could not listen for Ctrl-C ({e}); only end of input stops the server");
            false
        }
    }
}

/// The tool catalog as advertised in `tools/list`.
pub fn catalog() -> Vec<Tool> {
    ToolName::ALL
        .into_iter()
        .map(|t| Tool::new(t.as_str(), t.description(), Arc::new(t.input_schema())))
        .collect()
}

fn into_call_result(reply: ToolReply) -> CallToolResult {
    let content = vec![Content::text(reply.text)];
    if reply.is_error {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}

#[derive(Clone)]
pub struct VoiceMcp {
    dispatcher: Arc<Dispatcher>,
    tools: Arc<Vec<Tool>>,
}

impl VoiceMcp {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            tools: Arc::new(catalog()),
        }
    }
}

impl ServerHandler for VoiceMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("ElevenLabs voice synthesis and MIA IoT voice control. Use elevenlabs_* tools for voices, speech and profiles, mia_* tools to send commands or read system status.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tools.as_ref().clone()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let reply = self
            .dispatcher
            .call(&request.name, request.arguments)
            .await;
        debug!("Tool {} replied (error: {})", request.name, reply.is_error);
        Ok(into_call_result(reply))
    }
}

/// Serve the MCP protocol on stdin/stdout until the host closes the stream
/// or an interrupt arrives. An interrupt cancels the running service, and
/// the service is awaited to completion before returning, so the dispatcher
/// and its HTTP clients are released on every exit path.
pub async fn serve_stdio(dispatcher: Dispatcher) -> Result<(), ServeError> {
    let mut session = Session::new();
    let server = VoiceMcp::new(dispatcher);
    session.advance(Phase::Initialized);
    info!("Advertising {} tools", server.tools.len());

    let running = match server.serve(stdio()).await {
        Ok(running) => running,
        Err(e) => {
            session.advance(Phase::Closed);
            return Err(ServeError::Handshake(e.to_string()));
        }
    };
    session.advance(Phase::Serving);

    let token = running.cancellation_token();
    let watcher = tokio::spawn(async move {
        if interrupted(tokio::signal::ctrl_c()).await {
            token.cancel();
        }
    });

    let outcome = match running.waiting().await {
        Ok(reason) => {
            info!("Session ended: {reason:?}");
            Ok(())
        }
        Err(e) => Err(ServeError::Transport(e.to_string())),
    };
    watcher.abort();

    session.advance(Phase::ShuttingDown);
    session.advance(Phase::Closed);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_has_eight_unique_tools() {
        let tools = catalog();
        assert_eq!(tools.len(), 8);
        let names: HashSet<_> = tools.iter().map(|t| t.name.to_string()).collect();
        assert_eq!(names.len(), 8);
        assert!(names.contains("elevenlabs_generate_speech_from_profile"));
        assert!(names.contains("mia_get_status_voice"));
    }

    #[test]
    fn session_only_moves_forward() {
        let mut session = Session::new();
        session.advance(Phase::Initialized);
        session.advance(Phase::Serving);
        session.advance(Phase::Initialized);
        assert_eq!(session.phase, Phase::Serving);
        session.advance(Phase::Closed);
        session.advance(Phase::Serving);
        assert_eq!(session.phase, Phase::Closed);
    }

    #[tokio::test]
    async fn delivered_interrupt_stops_the_session() {
        assert!(interrupted(async { Ok(()) }).await);
    }

    #[tokio::test]
    async fn failed_signal_handler_keeps_serving() {
        let failed = async { Err(std::io::Error::other("signal handler unavailable")) };
        assert!(!interrupted(failed).await);
    }

    #[test]
    fn error_replies_are_flagged() {
        let result = into_call_result(ToolReply::error("Error executing x: Unknown tool: x"));
        assert_eq!(result.is_error, Some(true));
        let result = into_call_result(ToolReply::text("ok"));
        assert_eq!(result.is_error, Some(false));
    }
}
