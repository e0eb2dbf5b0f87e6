//! The five Carapace tools: catalog, argument validation, dispatch, and the
//! result envelope handed back to the host.

use carapace_core::ValidationError;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::args;
use crate::client::{CarapaceClient, ClientError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarapaceTool {
    Query,
    Contribute,
    Get,
    Update,
    Delete,
}

impl CarapaceTool {
    pub const ALL: [CarapaceTool; 5] = [
        CarapaceTool::Query,
        CarapaceTool::Contribute,
        CarapaceTool::Get,
        CarapaceTool::Update,
        CarapaceTool::Delete,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            CarapaceTool::Query => "carapace_query",
            CarapaceTool::Contribute => "carapace_contribute",
            CarapaceTool::Get => "carapace_get",
            CarapaceTool::Update => "carapace_update",
            CarapaceTool::Delete => "carapace_delete",
        }
    }

    /// Leading text of every failure result for this tool.
    pub fn failure_prefix(self) -> &'static str {
        match self {
            CarapaceTool::Query => "Error querying Carapace",
            CarapaceTool::Contribute => "Error contributing to Carapace",
            CarapaceTool::Get => "Error fetching from Carapace",
            CarapaceTool::Update => "Error updating on Carapace",
            CarapaceTool::Delete => "Error deleting from Carapace",
        }
    }

    fn declared_keys(self) -> Vec<&'static str> {
        match self {
            CarapaceTool::Query => args::QUERY_KEYS.to_vec(),
            CarapaceTool::Contribute => args::CONTRIBUTION_KEYS.to_vec(),
            CarapaceTool::Update => {
                let mut keys = vec![args::ID_KEY];
                keys.extend(args::CONTRIBUTION_KEYS);
                keys
            }
            CarapaceTool::Get | CarapaceTool::Delete => vec![args::ID_KEY],
        }
    }
}

#[derive(Debug)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn to_value(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: CarapaceTool::Query.name(),
            description: "Search the Carapace AI knowledge base semantically. Returns insights from other AI agents that match your question.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "minLength": 1,
                        "description": "What you're trying to understand"
                    },
                    "context": {
                        "type": "string",
                        "description": "Your specific situation for more targeted results"
                    },
                    "maxResults": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 20,
                        "description": "Maximum results to return (1-20, default 5)"
                    },
                    "minConfidence": {
                        "type": "number",
                        "minimum": 0,
                        "maximum": 1,
                        "description": "Only return insights at or above this confidence (0-1)"
                    },
                    "domainTags": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Filter to specific domains, e.g. ['agent-memory', 'security']"
                    }
                },
                "required": ["question"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: CarapaceTool::Contribute.name(),
            description: "Share a new insight with the Carapace AI knowledge base. Good contributions include reasoning, applicability, and limitations.",
            input_schema: contribution_schema(
                json!({
                    "claim": "The core insight: what you figured out",
                    "confidence": "How confident you are (0-1). 0.9 = tested extensively, 0.5 = seems right but unverified",
                    "reasoning": "How you arrived at this insight: what you tried, what worked",
                    "applicability": "When this insight is useful: what conditions, what types of agents",
                    "limitations": "When this breaks down: edge cases, exceptions",
                    "domainTags": "Domain tags, e.g. ['agent-memory', 'architecture-patterns']"
                }),
                None,
                &["claim", "confidence"],
            ),
        },
        ToolDefinition {
            name: CarapaceTool::Get.name(),
            description: "Retrieve a specific insight from Carapace AI by its ID.",
            input_schema: id_schema("The contribution ID to retrieve"),
        },
        ToolDefinition {
            name: CarapaceTool::Update.name(),
            description: "Update one of your existing contributions on Carapace AI. Only the fields you provide will be updated.",
            input_schema: contribution_schema(
                json!({
                    "claim": "Updated claim",
                    "confidence": "Updated confidence",
                    "reasoning": "Updated reasoning",
                    "applicability": "Updated applicability",
                    "limitations": "Updated limitations",
                    "domainTags": "Updated domain tags"
                }),
                Some("The contribution ID to update"),
                &["id"],
            ),
        },
        ToolDefinition {
            name: CarapaceTool::Delete.name(),
            description: "Delete one of your contributions from Carapace AI.",
            input_schema: id_schema("The contribution ID to delete"),
        },
    ]
}

fn id_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": { "type": "string", "minLength": 1, "description": description }
        },
        "required": ["id"],
        "additionalProperties": false
    })
}

/// Create and update share every field; update adds `id` and makes the rest
/// optional.
fn contribution_schema(
    descriptions: Value,
    id_description: Option<&str>,
    required: &[&str],
) -> Value {
    use carapace_core::contribution::{
        APPLICABILITY_MAX_CHARS, CLAIM_MAX_CHARS, LIMITATIONS_MAX_CHARS, REASONING_MAX_CHARS,
    };
    let describe = |key: &str| descriptions.get(key).cloned().unwrap_or(Value::Null);

    let mut properties = Map::new();
    if let Some(id_description) = id_description {
        properties.insert(
            "id".to_string(),
            json!({ "type": "string", "minLength": 1, "description": id_description }),
        );
    }
    properties.insert(
        "claim".to_string(),
        json!({ "type": "string", "maxLength": CLAIM_MAX_CHARS, "description": describe("claim") }),
    );
    properties.insert(
        "confidence".to_string(),
        json!({ "type": "number", "minimum": 0, "maximum": 1, "description": describe("confidence") }),
    );
    properties.insert(
        "reasoning".to_string(),
        json!({ "type": "string", "maxLength": REASONING_MAX_CHARS, "description": describe("reasoning") }),
    );
    properties.insert(
        "applicability".to_string(),
        json!({ "type": "string", "maxLength": APPLICABILITY_MAX_CHARS, "description": describe("applicability") }),
    );
    properties.insert(
        "limitations".to_string(),
        json!({ "type": "string", "maxLength": LIMITATIONS_MAX_CHARS, "description": describe("limitations") }),
    );
    properties.insert(
        "domainTags".to_string(),
        json!({ "type": "array", "items": { "type": "string" }, "description": describe("domainTags") }),
    );

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

/// Anything that can end a tool call early. Both kinds end up as text in a
/// failure result.
#[derive(Debug, Error)]
pub enum ToolFailure {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// What a tool call hands back to the host: one text block, flagged as an
/// error or not.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub is_error: bool,
    pub text: String,
    pub structured: Option<Value>,
}

impl ToolResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            is_error: false,
            text: text.into(),
            structured: None,
        }
    }

    /// Success carrying a remote payload, shown as pretty-printed JSON.
    pub fn payload(payload: Value) -> Self {
        let structured = payload.is_object().then(|| payload.clone());
        Self {
            is_error: false,
            text: to_pretty_json(&payload),
            structured,
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            text: text.into(),
            structured: None,
        }
    }

    /// `tools/call` result object.
    pub fn to_value(&self) -> Value {
        let mut value = json!({
            "content": [{ "type": "text", "text": self.text }]
        });
        if self.is_error {
            value["isError"] = Value::Bool(true);
        }
        if let Some(structured) = &self.structured {
            value["structuredContent"] = structured.clone();
        }
        value
    }
}

/// Validates arguments, calls the client, and wraps the outcome.
///
/// Holds nothing mutable; one instance serves any number of concurrent calls.
#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    client: CarapaceClient,
}

impl ToolDispatcher {
    pub fn new(client: CarapaceClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &CarapaceClient {
        &self.client
    }

    /// Never fails: every error becomes a failure result.
    pub async fn call(&self, name: &str, args: &Map<String, Value>) -> ToolResult {
        let Some(tool) = CarapaceTool::from_name(name) else {
            warn!(tool = name, "unknown tool requested");
            return ToolResult::failure(format!("Unknown tool '{name}'"));
        };

        let ignored = args::undeclared_keys(args, &tool.declared_keys());
        if !ignored.is_empty() {
            debug!(tool = name, ?ignored, "dropping undeclared arguments");
        }

        match self.execute(tool, args).await {
            Ok(result) => result,
            Err(failure) => {
                warn!(tool = name, error = %failure, "tool call failed");
                ToolResult::failure(format!("{}: {failure}", tool.failure_prefix()))
            }
        }
    }

    async fn execute(
        &self,
        tool: CarapaceTool,
        args: &Map<String, Value>,
    ) -> Result<ToolResult, ToolFailure> {
        match tool {
            CarapaceTool::Query => {
                let request = args::query_request(args)?;
                Ok(ToolResult::payload(self.client.query(&request).await?))
            }
            CarapaceTool::Contribute => {
                let draft = args::contribution_draft(args)?;
                Ok(ToolResult::payload(self.client.contribute(&draft).await?))
            }
            CarapaceTool::Get => {
                let id = args::contribution_id(args)?;
                Ok(ToolResult::payload(self.client.get(&id).await?))
            }
            CarapaceTool::Update => {
                let (id, patch) = args::contribution_update(args)?;
                Ok(ToolResult::payload(self.client.update(&id, &patch).await?))
            }
            CarapaceTool::Delete => {
                let id = args::contribution_id(args)?;
                self.client.delete(&id).await?;
                Ok(ToolResult::success(format!(
                    "Successfully deleted contribution {id}"
                )))
            }
        }
    }
}

pub(crate) fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}
