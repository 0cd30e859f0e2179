//! MCP Server for bookshelf-mcp
//!
//! MCP Protocol (stdio) <-> application::ShelfService / ShelfRenderer
//!
//! 6 tools: shelf, book_add, book_get, book_update, book_toggle, book_delete

use std::sync::{Arc, Mutex, MutexGuard};

use rmcp::{
    handler::server::{tool::ToolCallContext, tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
    transport::stdio,
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::application::error::AppError;
use crate::application::service::ShelfService;
use crate::application::view::ShelfRenderer;
use crate::config::Config;
use crate::domain::clock::SystemClock;
use crate::domain::model::book::BookForm;
use crate::domain::model::id::BookId;
use crate::domain::model::shelf::{Lookup, Removal};
use crate::infra::json_store::JsonShelfRepository;

type Service = ShelfService<JsonShelfRepository, SystemClock>;

// =============================================================================
// Public entry point
// =============================================================================

/// 書棚を読み込んでMCP Serverを起動する。
pub async fn run(config: Config) -> anyhow::Result<()> {
    let repo = JsonShelfRepository::new(&config.store_dir, &config.key)?;
    tracing::info!(path = %repo.path().display(), "opening bookshelf");
    let service = ShelfService::open(repo, SystemClock)?;

    let server = BookshelfMcpServer::new(service);
    let running = server.serve(stdio()).await?;
    running.waiting().await?;
    Ok(())
}

// =============================================================================
// MCP Server
// =============================================================================

#[derive(Clone)]
struct BookshelfMcpServer {
    service: Arc<Mutex<Service>>,
    tool_router: ToolRouter<Self>,
}

impl BookshelfMcpServer {
    fn new(service: Service) -> Self {
        Self {
            service: Arc::new(Mutex::new(service)),
            tool_router: Self::tool_router(),
        }
    }

    fn service(&self) -> Result<MutexGuard<'_, Service>, McpError> {
        self.service
            .lock()
            .map_err(|_| McpError::internal_error("Lock poisoned", None))
    }

    fn to_mcp_error(e: AppError) -> McpError {
        match &e {
            AppError::Domain(_) => McpError::invalid_params(format!("{e}"), None),
            AppError::Storage(_) => McpError::internal_error(format!("{e}"), None),
        }
    }

    // --- tool bodies (テキスト結果を返す) ---

    fn shelf_text(&self, req: McpShelfRequest) -> Result<String, McpError> {
        let svc = self.service()?;
        let view = svc.view(req.keyword.as_deref());

        match req.format.as_deref() {
            Some("json") => ShelfRenderer::render_json(&view)
                .map_err(|e| McpError::internal_error(format!("{e}"), None)),
            Some("markdown") | None => {
                if view.is_empty() && view.keyword.is_none() {
                    return Ok("Bookshelf is empty. Use `book_add` to add a book.".to_string());
                }
                Ok(ShelfRenderer::render_markdown(&view))
            }
            Some(other) => Err(McpError::invalid_params(
                format!("Unknown format: '{other}'. Use: markdown, json"),
                None,
            )),
        }
    }

    fn add_text(&self, req: McpBookAddRequest) -> Result<String, McpError> {
        let form = BookForm::new(
            req.title,
            req.author,
            req.year.into_form_value(),
            req.is_complete.unwrap_or(false),
        );
        let book = self.service()?.add(&form).map_err(Self::to_mcp_error)?;
        Ok(format!(
            "Added: [{}] {} ({})",
            book.id(),
            book.title(),
            status_label(book.is_complete())
        ))
    }

    fn get_text(&self, req: McpBookIdRequest) -> Result<String, McpError> {
        let id = parse_book_id(&req.book_id)?;
        let svc = self.service()?;
        let book = svc.get(id).ok_or_else(|| not_found(id))?;
        Ok(ShelfRenderer::render_book(book))
    }

    /// 省略されたフィールドは現在の値で埋める（編集フォームの事前入力と同じ）
    fn update_text(&self, req: McpBookUpdateRequest) -> Result<String, McpError> {
        let id = parse_book_id(&req.book_id)?;
        let mut svc = self.service()?;
        let mut form = svc
            .get(id)
            .map(BookForm::from_book)
            .ok_or_else(|| not_found(id))?;

        if let Some(title) = req.title {
            form.title = title;
        }
        if let Some(author) = req.author {
            form.author = author;
        }
        if let Some(year) = req.year {
            form.year = year.into_form_value();
        }
        if let Some(is_complete) = req.is_complete {
            form.is_complete = is_complete;
        }

        let book = svc.update(id, &form).map_err(Self::to_mcp_error)?;
        Ok(format!("Updated:\n{}", ShelfRenderer::render_book(&book)))
    }

    fn toggle_text(&self, req: McpBookIdRequest) -> Result<String, McpError> {
        let id = parse_book_id(&req.book_id)?;
        let outcome = self
            .service()?
            .toggle_complete(id)
            .map_err(Self::to_mcp_error)?;
        Ok(match outcome {
            Lookup::Found(book) => format!(
                "Moved to {}: [{}] {}",
                status_label(book.is_complete()),
                book.id(),
                book.title()
            ),
            Lookup::NotFound => format!("No book with id {id}. Nothing changed."),
        })
    }

    fn delete_text(&self, req: McpBookDeleteRequest) -> Result<String, McpError> {
        let id = parse_book_id(&req.book_id)?;
        let confirm = req.confirm;
        let outcome = self
            .service()?
            .delete(id, |_| confirm)
            .map_err(Self::to_mcp_error)?;
        Ok(match outcome {
            Removal::Removed(book) => format!("Deleted: [{}] {}", book.id(), book.title()),
            Removal::Declined => {
                format!("Not deleted: book {id} kept (pass confirm=true to delete).")
            }
            Removal::NotFound => format!("No book with id {id}. Nothing changed."),
        })
    }
}

// =============================================================================
// ServerHandler impl
// =============================================================================

impl ServerHandler for BookshelfMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "bookshelf-mcp".to_string(),
                title: Some("Bookshelf MCP: Reading List".to_string()),
                description: Some(
                    "Personal bookshelf split into unread and finished books. \
                     Ids come from `shelf` output."
                        .to_string(),
                ),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Track books to read and books already finished.\n\
                 \n\
                 Tools: `shelf` (optionally with a title keyword) → pick an id → \
                 `book_toggle` / `book_get` / `book_update` / `book_delete`. \
                 `book_add` for new books. Deleting needs confirm=true."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tool_router.list_all(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool_ctx = ToolCallContext::new(self, request, context);
        self.tool_router.call(tool_ctx).await
    }
}

// =============================================================================
// Request types
// =============================================================================

fn parse_book_id(s: &str) -> Result<BookId, McpError> {
    s.parse()
        .map_err(|_| McpError::invalid_params(format!("Invalid book_id: '{s}'"), None))
}

fn not_found(id: BookId) -> McpError {
    McpError::invalid_params(format!("book not found: {id}"), None)
}

fn status_label(is_complete: bool) -> &'static str {
    if is_complete {
        "finished"
    } else {
        "unread"
    }
}

/// 年はフォーム同様に文字列でも数値でも受け付ける。検証はドメイン側で行う。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
enum RawYear {
    Number(i64),
    Text(String),
}

impl RawYear {
    fn into_form_value(self) -> String {
        match self {
            RawYear::Number(n) => n.to_string(),
            RawYear::Text(s) => s,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpShelfRequest {
    #[schemars(description = "Case-insensitive title keyword. Omit or leave empty to list all books.")]
    pub keyword: Option<String>,
    #[schemars(description = "Output format: 'markdown' (default) or 'json'")]
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpBookAddRequest {
    #[schemars(description = "Book title (required)")]
    pub title: String,
    #[schemars(description = "Author name (required)")]
    pub author: String,
    #[schemars(description = "Publication year, a positive integer (e.g. 2005 or \"2005\")")]
    pub year: RawYear,
    #[schemars(description = "Already finished reading (default: false)")]
    pub is_complete: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpBookIdRequest {
    #[schemars(description = "Book id from `shelf` output")]
    pub book_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpBookUpdateRequest {
    #[schemars(description = "Book id from `shelf` output")]
    pub book_id: String,
    #[schemars(description = "New title (omit to keep current)")]
    pub title: Option<String>,
    #[schemars(description = "New author (omit to keep current)")]
    pub author: Option<String>,
    #[schemars(description = "New year (omit to keep current)")]
    pub year: Option<RawYear>,
    #[schemars(description = "New finished status (omit to keep current)")]
    pub is_complete: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpBookDeleteRequest {
    #[schemars(description = "Book id from `shelf` output")]
    pub book_id: String,
    #[schemars(description = "Must be true to actually delete. Ask the user before setting it.")]
    pub confirm: bool,
}

// =============================================================================
// Tool implementations
// =============================================================================

#[tool_router]
impl BookshelfMcpServer {
    #[tool(
        name = "shelf",
        description = "Show the bookshelf as two lists: unread, then finished. Pass a keyword to filter by title (case-insensitive).",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            open_world_hint = false
        )
    )]
    async fn shelf(
        &self,
        Parameters(req): Parameters<McpShelfRequest>,
    ) -> Result<CallToolResult, McpError> {
        let output = self.shelf_text(req)?;
        Ok(CallToolResult::success(vec![Content::text(output)]))
    }

    #[tool(
        name = "book_add",
        description = "Add a book. Title and author must be non-empty, year a positive integer.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = false
        )
    )]
    async fn book_add(
        &self,
        Parameters(req): Parameters<McpBookAddRequest>,
    ) -> Result<CallToolResult, McpError> {
        let output = self.add_text(req)?;
        Ok(CallToolResult::success(vec![Content::text(output)]))
    }

    #[tool(
        name = "book_get",
        description = "Show one book's current fields (use before `book_update`).",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            open_world_hint = false
        )
    )]
    async fn book_get(
        &self,
        Parameters(req): Parameters<McpBookIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        let output = self.get_text(req)?;
        Ok(CallToolResult::success(vec![Content::text(output)]))
    }

    #[tool(
        name = "book_update",
        description = "Edit a book's title, author, year or finished status. Only specified fields are changed; the id stays the same.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = false
        )
    )]
    async fn book_update(
        &self,
        Parameters(req): Parameters<McpBookUpdateRequest>,
    ) -> Result<CallToolResult, McpError> {
        let output = self.update_text(req)?;
        Ok(CallToolResult::success(vec![Content::text(output)]))
    }

    #[tool(
        name = "book_toggle",
        description = "Move a book between unread and finished.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = false
        )
    )]
    async fn book_toggle(
        &self,
        Parameters(req): Parameters<McpBookIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        let output = self.toggle_text(req)?;
        Ok(CallToolResult::success(vec![Content::text(output)]))
    }

    #[tool(
        name = "book_delete",
        description = "Delete a book. Requires confirm=true; confirm with the user first.",
        annotations(
            read_only_hint = false,
            destructive_hint = true,
            idempotent_hint = true,
            open_world_hint = false
        )
    )]
    async fn book_delete(
        &self,
        Parameters(req): Parameters<McpBookDeleteRequest>,
    ) -> Result<CallToolResult, McpError> {
        let output = self.delete_text(req)?;
        Ok(CallToolResult::success(vec![Content::text(output)]))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::json_store::DEFAULT_STORAGE_KEY;

    fn server_in(dir: &tempfile::TempDir) -> BookshelfMcpServer {
        let repo = JsonShelfRepository::new(dir.path(), DEFAULT_STORAGE_KEY).unwrap();
        BookshelfMcpServer::new(ShelfService::open(repo, SystemClock).unwrap())
    }

    fn add(server: &BookshelfMcpServer, title: &str, year: RawYear) -> BookId {
        server
            .add_text(McpBookAddRequest {
                title: title.into(),
                author: "Andrea Hirata".into(),
                year,
                is_complete: None,
            })
            .unwrap();
        server.service().unwrap().books().last().unwrap().id()
    }

    #[test]
    fn server_info() {
        let dir = tempfile::tempdir().unwrap();
        let info = server_in(&dir).get_info();
        assert_eq!(info.server_info.name, "bookshelf-mcp");
        assert!(!info.server_info.version.is_empty());
    }

    #[test]
    fn add_request_accepts_numeric_and_text_year() {
        let req: McpBookAddRequest =
            serde_json::from_str(r#"{"title": "A", "author": "B", "year": 2005}"#).unwrap();
        assert_eq!(req.year, RawYear::Number(2005));
        assert!(req.is_complete.is_none());

        let req: McpBookAddRequest =
            serde_json::from_str(r#"{"title": "A", "author": "B", "year": "2005"}"#).unwrap();
        assert_eq!(req.year.into_form_value(), "2005");
    }

    #[test]
    fn delete_request_requires_confirm() {
        let result: Result<McpBookDeleteRequest, _> =
            serde_json::from_str(r#"{"book_id": "1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn parse_book_id_rejects_garbage() {
        assert_eq!(parse_book_id("42").unwrap(), BookId::new(42));
        assert!(parse_book_id("abc").is_err());
    }

    #[test]
    fn add_then_list() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_in(&dir);
        add(&server, "Laskar Pelangi", RawYear::Number(2005));

        let md = server
            .shelf_text(McpShelfRequest {
                keyword: None,
                format: None,
            })
            .unwrap();
        assert!(md.contains("## Unread (1)"));
        assert!(md.contains("Laskar Pelangi by Andrea Hirata (2005)"));
    }

    #[test]
    fn empty_shelf_hint() {
        let dir = tempfile::tempdir().unwrap();
        let text = server_in(&dir)
            .shelf_text(McpShelfRequest {
                keyword: None,
                format: None,
            })
            .unwrap();
        assert!(text.contains("Bookshelf is empty"));
    }

    #[test]
    fn add_rejects_invalid_year() {
        let dir = tempfile::tempdir().unwrap();
        let result = server_in(&dir).add_text(McpBookAddRequest {
            title: "T".into(),
            author: "A".into(),
            year: RawYear::Text("soon".into()),
            is_complete: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn update_keeps_omitted_fields() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_in(&dir);
        let id = add(&server, "Sang Pemimpi", RawYear::Text("2006".into()));

        server
            .update_text(McpBookUpdateRequest {
                book_id: id.to_string(),
                title: None,
                author: Some("A. Hirata".into()),
                year: None,
                is_complete: Some(true),
            })
            .unwrap();

        let svc = server.service().unwrap();
        let book = svc.get(id).unwrap();
        assert_eq!(book.title(), "Sang Pemimpi");
        assert_eq!(book.author(), "A. Hirata");
        assert_eq!(book.year(), 2006);
        assert!(book.is_complete());
    }

    #[test]
    fn update_unknown_id_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = server_in(&dir).update_text(McpBookUpdateRequest {
            book_id: "12345".into(),
            title: Some("X".into()),
            author: None,
            year: None,
            is_complete: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn toggle_and_delete_flow() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_in(&dir);
        let id = add(&server, "Edensor", RawYear::Number(2007));

        let text = server
            .toggle_text(McpBookIdRequest {
                book_id: id.to_string(),
            })
            .unwrap();
        assert!(text.starts_with("Moved to finished"));

        let text = server
            .delete_text(McpBookDeleteRequest {
                book_id: id.to_string(),
                confirm: false,
            })
            .unwrap();
        assert!(text.starts_with("Not deleted"));
        assert_eq!(server.service().unwrap().books().len(), 1);

        let text = server
            .delete_text(McpBookDeleteRequest {
                book_id: id.to_string(),
                confirm: true,
            })
            .unwrap();
        assert_eq!(text, format!("Deleted: [{id}] Edensor"));

        let text = server
            .toggle_text(McpBookIdRequest {
                book_id: id.to_string(),
            })
            .unwrap();
        assert!(text.starts_with("No book with id"));
    }

    #[test]
    fn shelf_json_format() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_in(&dir);
        add(&server, "Laskar Pelangi", RawYear::Number(2005));
        add(&server, "Maryamah Karpov", RawYear::Number(2008));

        let json = server
            .shelf_text(McpShelfRequest {
                keyword: Some("pelangi".into()),
                format: Some("json".into()),
            })
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["keyword"], "pelangi");
        assert_eq!(value["incomplete"].as_array().unwrap().len(), 1);
        assert_eq!(value["complete"].as_array().unwrap().len(), 0);

        assert!(server
            .shelf_text(McpShelfRequest {
                keyword: None,
                format: Some("xml".into()),
            })
            .is_err());
    }

    #[test]
    fn changes_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let id = add(&server_in(&dir), "Padang Bulan", RawYear::Number(2010));

        let reopened = server_in(&dir);
        let text = reopened
            .get_text(McpBookIdRequest {
                book_id: id.to_string(),
            })
            .unwrap();
        assert!(text.contains("Padang Bulan"));
        assert!(text.contains("status: unread"));
    }
}
