//! Tool protocol over stdio.
//!
//! Newline-delimited JSON-RPC 2.0, limited to what an assistant host needs
//! to discover and call the tools: `initialize`, `ping`, `tools/list` and
//! `tools/call`. Stdout belongs to the protocol; logs go to stderr.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::tools::{ToolOutput, Toolbox};

/// Protocol revision announced when the client does not name one.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "meetup-forms";

pub const TOOL_FETCH_RESPONSES: &str = "get_meetup_responses";
pub const TOOL_BROADCAST: &str = "send_meetup_email";
pub const TOOL_READ_CLICKS: &str = "get_clicks";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct Response {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl Response {
    fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Default, Deserialize)]
struct FetchResponsesArgs {
    #[serde(default)]
    spreadsheet_id: Option<String>,
    #[serde(default)]
    gid: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct BroadcastArgs {
    #[serde(default)]
    message: String,
}

/// Serves the tools to one client over a line-oriented stream.
pub struct McpServer {
    tools: Toolbox,
}

impl McpServer {
    pub fn new(tools: Toolbox) -> Self {
        Self { tools }
    }

    /// Read requests until EOF, writing one response line per request.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(server = SERVER_NAME, "mcp_session_started");
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line).await {
                let mut encoded = response.to_string();
                encoded.push('\n');
                writer.write_all(encoded.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        info!("mcp_session_closed");
        Ok(())
    }

    /// Handle one JSON-RPC message. Notifications yield no response.
    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        let raw: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "mcp_parse_error");
                return Some(encode(Response::error(Value::Null, PARSE_ERROR, "Parse error")));
            }
        };

        let request: Request = match serde_json::from_value(raw) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "mcp_invalid_request");
                return Some(encode(Response::error(
                    Value::Null,
                    INVALID_REQUEST,
                    "Invalid request",
                )));
            }
        };

        let Some(id) = request.id else {
            debug!(method = %request.method, "mcp_notification");
            return None;
        };

        debug!(method = %request.method, "mcp_request");
        let response = match request.method.as_str() {
            "initialize" => Response::result(id, self.initialize(&request.params)),
            "ping" => Response::result(id, json!({})),
            "tools/list" => Response::result(id, tool_definitions()),
            "tools/call" => match serde_json::from_value::<CallParams>(request.params) {
                Ok(call) => match self.call_tool(call).await {
                    Ok(output) => Response::result(id, render_output(output)),
                    Err(message) => Response::error(id, INVALID_PARAMS, message),
                },
                Err(e) => Response::error(id, INVALID_PARAMS, format!("Invalid params: {}", e)),
            },
            other => Response::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", other)),
        };

        Some(encode(response))
    }

    fn initialize(&self, params: &Value) -> Value {
        let version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(PROTOCOL_VERSION);

        json!({
            "protocolVersion": version,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
        })
    }

    async fn call_tool(&self, call: CallParams) -> Result<ToolOutput, String> {
        info!(tool = %call.name, "mcp_tool_call");
        match call.name.as_str() {
            TOOL_FETCH_RESPONSES => {
                let args: FetchResponsesArgs = arguments(call.arguments)?;
                Ok(self
                    .tools
                    .fetch_responses(args.spreadsheet_id, args.gid)
                    .await)
            }
            TOOL_BROADCAST => {
                let args: BroadcastArgs = arguments(call.arguments)?;
                Ok(self.tools.broadcast_message(&args.message).await)
            }
            TOOL_READ_CLICKS => Ok(self.tools.read_clicks().await),
            other => Err(format!("Unknown tool: {}", other)),
        }
    }
}

/// Absent arguments mean "all defaults".
fn arguments<T: Default + for<'de> Deserialize<'de>>(value: Value) -> Result<T, String> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|e| format!("Invalid arguments: {}", e))
}

fn render_output(output: ToolOutput) -> Value {
    json!({
        "content": [{ "type": "text", "text": output.text }],
        "isError": output.is_error,
    })
}

fn encode(response: Response) -> Value {
    serde_json::to_value(response).unwrap_or_else(|_| Value::Null)
}

fn tool_definitions() -> Value {
    json!({
        "tools": [
            {
                "name": TOOL_FETCH_RESPONSES,
                "description": "Fetch the meetup form responses from the public Google Sheets spreadsheet linked to the form.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "gid": {
                            "type": "number",
                            "description": "Tab id (gid) of the spreadsheet. Use 0 for the first tab."
                        },
                        "spreadsheet_id": {
                            "type": "string",
                            "description": "Spreadsheet id. Defaults to the spreadsheet configured on the server."
                        }
                    }
                }
            },
            {
                "name": TOOL_BROADCAST,
                "description": "Send an email with the given message to every address found in the meetup responses spreadsheet. Requires MAIL_FROM, MAILGUN_API_KEY and MAILGUN_DOMAIN.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "message": {
                            "type": "string",
                            "description": "Text of the email sent to every registrant."
                        }
                    },
                    "required": ["message"]
                }
            },
            {
                "name": TOOL_READ_CLICKS,
                "description": "Return every click recorded from the link in the email.",
                "inputSchema": { "type": "object", "properties": {} }
            }
        ]
    })
}
