//! Static tool catalog derived from the configured providers.

use async_trait::async_trait;
use ctxforge_core::error::SourceError;
use ctxforge_core::source::Providers;
use ctxforge_core::task::TaskType;
use ctxforge_core::tool::{ToolCatalog, ToolDescriptor};

/// Tools that exist regardless of configured providers.
pub const BASELINE_TOOLS: [&str; 3] = ["project_context", "session_memory", "quality_assessment"];

pub struct StaticToolCatalog {
    tools: Vec<ToolDescriptor>,
}

impl StaticToolCatalog {
    pub fn new(providers: &Providers) -> Self {
        let mut tools = vec![
            ToolDescriptor::new("project_context", "Read project goals, architecture, tasks and decisions")
                .capability("read")
                .capability("internal")
                .limitation("only as current as the project documents"),
            ToolDescriptor::new("session_memory", "Recall prior interactions and user preferences")
                .capability("recall")
                .capability("internal")
                .limitation("bounded to recent entries of this session"),
            ToolDescriptor::new("quality_assessment", "Score a context package and list its gaps")
                .capability("evaluate")
                .limitation("heuristic scoring"),
        ];
        for name in providers.configured() {
            tools.push(provider_tool(name));
        }
        Self { tools }
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }
}

fn provider_tool(name: &str) -> ToolDescriptor {
    match name {
        "web_search" => ToolDescriptor::new(name, "Search the public web")
            .capability("search")
            .capability("external")
            .limitation("unauthenticated, may be outdated"),
        "code_search" => ToolDescriptor::new(name, "Search the indexed codebase")
            .capability("search")
            .capability("code")
            .limitation("index may lag behind the working tree"),
        "file_search" => ToolDescriptor::new(name, "Find files by name or content")
            .capability("search")
            .capability("filesystem"),
        "library_docs" => ToolDescriptor::new(name, "Look up library documentation")
            .capability("docs")
            .capability("external")
            .limitation("only libraries named in the request"),
        other => ToolDescriptor::new(other, "Host-supplied capability"),
    }
}

#[async_trait]
impl ToolCatalog for StaticToolCatalog {
    async fn available_tools(&self, _task_type: TaskType) -> Result<Vec<ToolDescriptor>, SourceError> {
        Ok(self.tools.clone())
    }
}
