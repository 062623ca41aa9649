//! MCP (Model Context Protocol) server for the speed-meter pipeline.
//!
//! Exposes the `ops` layer as MCP tools so that AI assistants can filter,
//! rank, and export verification records over stdio JSON-RPC.
//!
//! Start with: `medidores --mcp`

use rmcp::{
    handler::server::tool::{ToolCallContext, ToolRouter},
    handler::server::wrapper::Parameters,
    model::*,
    service::RequestContext,
    tool, tool_router, ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::config::Config;
use crate::ops::{self, QueryParams};
use crate::pipeline::app_state::ViewConfig;
use crate::pipeline::filter::CriteriaParams;

// ── Parameter structs ───────────────────────────────────────────────────────
// Each struct maps 1:1 with a CLI subcommand. Records may use any of the
// source naming conventions; they are normalized before every operation.

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RecordsParams {
    /// JSON array of raw verification records.
    pub records: Vec<Value>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FilterParams {
    /// JSON array of raw verification records.
    pub records: Vec<Value>,
    #[serde(flatten)]
    pub criteria: CriteriaParams,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TopParams {
    pub records: Vec<Value>,
    /// Category: "state", "city", "type", "result", "owner".
    pub category: String,
    /// Number of entries (default: 5).
    #[serde(default = "default_top")]
    pub n: usize,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TrendsParams {
    pub records: Vec<Value>,
    /// Calendar years of verifications to count, ending this year (default: 5, at most 1000).
    #[serde(default = "default_years")]
    pub years: usize,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SortParams {
    pub records: Vec<Value>,
    /// Column path, e.g. "city", "owner.name", "lanes.nominalSpeed", "validUntilDate".
    pub column: String,
    /// "asc" or "desc" (default: "asc").
    #[serde(default = "default_direction")]
    pub direction: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PaginateParams {
    pub records: Vec<Value>,
    /// 1-based page; out-of-range pages clamp to the last page (default: 1).
    #[serde(default = "default_page")]
    pub page: usize,
    /// Rows per page (default: 25).
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExportParams {
    pub records: Vec<Value>,
    /// "json" or "csv" (default: "json").
    #[serde(default = "default_format")]
    pub format: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LookupParams {
    pub records: Vec<Value>,
    /// Category: "state", "city", "type", "result", "owner".
    pub category: String,
    /// Exact value, case-insensitive.
    pub value: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DistinctParams {
    pub records: Vec<Value>,
    /// Category: "state", "city", "type", "result", "owner".
    pub category: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryToolParams {
    pub records: Vec<Value>,
    #[serde(flatten)]
    pub query: QueryParams,
}

fn default_top() -> usize {
    5
}
fn default_years() -> usize {
    5
}
fn default_direction() -> String {
    "asc".into()
}
fn default_page() -> usize {
    1
}
fn default_page_size() -> usize {
    25
}
fn default_format() -> String {
    "json".into()
}

/// Pretty-print a JSON value for MCP text content.
fn json_text(v: &Value) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
}

/// Run a blocking op off the async runtime. Op errors are caller input
/// errors and map to `invalid_params`.
async fn run_op<F>(op: F) -> Result<CallToolResult, McpError>
where
    F: FnOnce() -> crate::Result<Value> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| McpError::internal_error(format!("task join error: {e}"), None))?
        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json_text(
        &result,
    ))]))
}

// ── MCP Server ──────────────────────────────────────────────────────────────

/// The MCP server struct. Holds the auto-generated tool router and the view
/// settings used by `query`.
#[derive(Clone)]
pub struct MedidoresMcp {
    #[allow(dead_code)] // accessed at runtime by the #[tool_router] macro
    tool_router: ToolRouter<Self>,
    view: ViewConfig,
}

impl Default for MedidoresMcp {
    fn default() -> Self {
        Self::new(ViewConfig::default())
    }
}

#[tool_router]
impl MedidoresMcp {
    pub fn new(view: ViewConfig) -> Self {
        Self {
            tool_router: Self::tool_router(),
            view,
        }
    }

    // ── normalize ───────────────────────────────────────────────────────

    #[tool(
        name = "normalize",
        description = "Normalize raw INMETRO speed-meter records (PascalCase, lowercase Portuguese, or canonical camelCase) into the canonical shape. Missing values become \"N/A\"."
    )]
    async fn normalize(&self, params: Parameters<RecordsParams>) -> Result<CallToolResult, McpError> {
        let p = params.0;
        run_op(move || ops::op_normalize(&p.records)).await
    }

    // ── filter ──────────────────────────────────────────────────────────

    #[tool(
        name = "filter",
        description = "Keep records matching every given criterion: state, city, result (exact, case-insensitive), instrumentType and search (substring), region, date range (dateField, dateFrom, dateTo), speed range (speedMin, speedMax). Input order is preserved."
    )]
    async fn filter(&self, params: Parameters<FilterParams>) -> Result<CallToolResult, McpError> {
        let p = params.0;
        run_op(move || ops::op_filter(&p.records, p.criteria)).await
    }

    // ── metrics ─────────────────────────────────────────────────────────

    #[tool(
        name = "metrics",
        description = "Summary metrics: total, approved/rejected/unknown counts, approval and rejection rates, distinct states and cities, expired count and rate, average/min/max nominal speed."
    )]
    async fn metrics(&self, params: Parameters<RecordsParams>) -> Result<CallToolResult, McpError> {
        let p = params.0;
        run_op(move || ops::op_metrics(&p.records)).await
    }

    // ── top ─────────────────────────────────────────────────────────────

    #[tool(
        name = "top",
        description = "Most frequent values of a category, descending by count. Unknown values are excluded."
    )]
    async fn top(&self, params: Parameters<TopParams>) -> Result<CallToolResult, McpError> {
        let p = params.0;
        run_op(move || ops::op_top(&p.records, &p.category, p.n)).await
    }

    // ── trends ──────────────────────────────────────────────────────────

    #[tool(
        name = "trends",
        description = "Result distribution, validity expirations by month (YYYY-MM), and verifications per year for the last N years."
    )]
    async fn trends(&self, params: Parameters<TrendsParams>) -> Result<CallToolResult, McpError> {
        let p = params.0;
        run_op(move || ops::op_trends(&p.records, p.years)).await
    }

    // ── sort ────────────────────────────────────────────────────────────

    #[tool(
        name = "sort",
        description = "Stable sort by a column path. Text compares case- and accent-insensitively, dates chronologically, speeds numerically. Missing values sort last."
    )]
    async fn sort(&self, params: Parameters<SortParams>) -> Result<CallToolResult, McpError> {
        let p = params.0;
        run_op(move || ops::op_sort(&p.records, &p.column, &p.direction)).await
    }

    // ── paginate ────────────────────────────────────────────────────────

    #[tool(
        name = "paginate",
        description = "One page of records with page, totalPages, startIndex, endIndex, totalItems, and the numbered-button window."
    )]
    async fn paginate(&self, params: Parameters<PaginateParams>) -> Result<CallToolResult, McpError> {
        let p = params.0;
        let radius = self.view.page_window_radius;
        run_op(move || ops::op_paginate(&p.records, p.page, p.page_size, radius)).await
    }

    // ── export ──────────────────────────────────────────────────────────

    #[tool(
        name = "export",
        description = "Export records as pretty JSON or CSV (every field quoted, fixed column order). Returns fileName, format, and content."
    )]
    async fn export(&self, params: Parameters<ExportParams>) -> Result<CallToolResult, McpError> {
        let p = params.0;
        run_op(move || ops::op_export(&p.records, &p.format)).await
    }

    // ── lookup ──────────────────────────────────────────────────────────

    #[tool(
        name = "lookup",
        description = "Records whose category value equals the given value, via the category index."
    )]
    async fn lookup(&self, params: Parameters<LookupParams>) -> Result<CallToolResult, McpError> {
        let p = params.0;
        run_op(move || ops::op_lookup(&p.records, &p.category, &p.value)).await
    }

    // ── distinct ────────────────────────────────────────────────────────

    #[tool(
        name = "distinct",
        description = "Sorted unique values of a category, e.g. the options of a filter dropdown."
    )]
    async fn distinct(&self, params: Parameters<DistinctParams>) -> Result<CallToolResult, McpError> {
        let p = params.0;
        run_op(move || ops::op_distinct(&p.records, &p.category)).await
    }

    // ── query ───────────────────────────────────────────────────────────

    #[tool(
        name = "query",
        description = "Filter, sort, and paginate in one pass. Accepts every filter criterion plus sort, direction, page, pageSize. Returns metrics, rankings, the page, and the page window."
    )]
    async fn query(&self, params: Parameters<QueryToolParams>) -> Result<CallToolResult, McpError> {
        let p = params.0;
        let view = self.view.clone();
        run_op(move || ops::op_query(&p.records, p.query, &view)).await
    }
}

// ── ServerHandler glue ──────────────────────────────────────────────────────

impl ServerHandler for MedidoresMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "INMETRO speed-meter verification records. Tools: normalize, filter, \
                 metrics, top, trends, sort, paginate, export, lookup, distinct, query. \
                 Pass raw records in any source naming convention."
                    .into(),
            ),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: None }),
                ..Default::default()
            },
            server_info: Implementation {
                name: "medidores".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: Some("Medidores de Velocidade".into()),
                description: Some(
                    "Filtering, ranking, and export engine for speed-meter verification records"
                        .into(),
                ),
                icons: None,
                website_url: None,
            },
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult {
            tools: self.tool_router.list_all(),
            next_cursor: None,
            meta: Default::default(),
        }))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        let tool_context = ToolCallContext::new(self, request, context);
        async move { self.tool_router.call(tool_context).await }
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.tool_router.get(name).cloned()
    }
}

// ── Entry point ─────────────────────────────────────────────────────────────

/// Start the MCP server on stdio. Called from `cli.rs` when `--mcp` is passed.
pub async fn serve_stdio(config: Config) -> crate::Result<()> {
    let server = MedidoresMcp::new(config.view);
    let transport = rmcp::transport::io::stdio();
    let service = server
        .serve(transport)
        .await
        .map_err(|e| std::io::Error::other(format!("MCP serve error: {e}")))?;
    tracing::info!("MCP server ready");
    service
        .waiting()
        .await
        .map_err(|e| std::io::Error::other(format!("MCP server error: {e}")))?;
    Ok(())
}
