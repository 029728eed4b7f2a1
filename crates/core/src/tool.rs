//! Tool trait: the operations a conversational agent may run against the
//! portfolio.
//!
//! Tools execute synchronously against the [`PortfolioStore`]. The registry
//! validates arguments against each tool's JSON schema and converts every
//! failure into a `{ success: false, error }` result, so callers never see a
//! tool error as a Rust error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};
use crate::error::ToolError;
use crate::message::MessageToolCall;
use crate::provider::ToolDefinition;
use crate::store::PortfolioStore;

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: Value,
}

impl ToolCall {
    /// Decode a tool call embedded in an assistant message.
    ///
    /// An empty argument string is treated as `{}`.
    pub fn from_message(call: &MessageToolCall) -> Result<Self, ToolError> {
        let raw = call.arguments.trim();
        let arguments = if raw.is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str(raw).map_err(|e| {
                ToolError::InvalidArguments(format!("arguments are not valid JSON: {e}"))
            })?
        };
        Ok(Self {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments,
        })
    }
}

/// The structured outcome of a tool call: `success` plus either a message and
/// extra data, or an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Operation-specific payload, flattened next to `success`.
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl ToolResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            data: Map::new(),
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
            data: Map::new(),
        }
    }

    /// Attach a data field.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    /// JSON text fed back to the model as the tool message content.
    pub fn to_content(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"success":false,"error":"unserializable tool result: {e}"}}"#)
        })
    }
}

/// The core Tool trait.
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "add_card").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute with arguments that already passed schema validation.
    ///
    /// Contract violations the tool detects itself (bad indices, unknown
    /// titles) come back as `Ok(ToolResult::fail(..))`.
    fn execute(&self, arguments: &Value, store: &PortfolioStore) -> Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// All tool definitions, sorted by name so requests are stable.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<_> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Validate and execute a call. Never fails: unknown tools, schema
    /// violations, and execution errors all become failed results.
    pub fn dispatch(&self, call: &ToolCall, store: &PortfolioStore) -> ToolResult {
        let Some(tool) = self.tools.get(&call.name) else {
            warn!(tool = %call.name, "Unknown tool requested");
            return ToolResult::fail(format!("Unknown tool: {}", call.name));
        };

        if let Err(reason) = validate_arguments(&tool.parameters_schema(), &call.arguments) {
            debug!(tool = %call.name, %reason, "Tool arguments rejected");
            return ToolResult::fail(format!("Invalid arguments for {}: {reason}", call.name));
        }

        match tool.execute(&call.arguments, store) {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                ToolResult::fail(format!("Tool execution error: {e}"))
            }
        }
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ── Schema validation ───────────────────────────────────────────────────────

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => {
            value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

/// Check `arguments` against the subset of JSON Schema the tools use:
/// `required`, per-property `type`, `enum`, `minimum`, and `maximum`.
/// Properties not named in the schema are ignored.
pub fn validate_arguments(schema: &Value, arguments: &Value) -> Result<(), String> {
    let Some(args) = arguments.as_object() else {
        return Err("arguments must be a JSON object".into());
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if args.get(key).is_none_or(Value::is_null) {
                return Err(format!("missing required field '{key}'"));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (key, value) in args {
        let Some(prop) = properties.get(key) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        if let Some(expected) = prop.get("type").and_then(Value::as_str)
            && !type_matches(expected, value)
        {
            return Err(format!("field '{key}' must be of type {expected}"));
        }
        if let Some(allowed) = prop.get("enum").and_then(Value::as_array)
            && !allowed.contains(value)
        {
            let options: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
            return Err(format!("field '{key}' must be one of {}", options.join(", ")));
        }
        if let Some(n) = value.as_f64() {
            if let Some(min) = prop.get("minimum").and_then(Value::as_f64)
                && n < min
            {
                return Err(format!("field '{key}' must be >= {min}"));
            }
            if let Some(max) = prop.get("maximum").and_then(Value::as_f64)
                && n > max
            {
                return Err(format!("field '{key}' must be <= {max}"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A simple test tool for unit tests.
    struct EchoTool;

    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" },
                    "times": { "type": "integer", "minimum": 1, "maximum": 3 }
                },
                "required": ["text"]
            })
        }
        fn execute(&self, arguments: &Value, _store: &PortfolioStore) -> Result<ToolResult, ToolError> {
            let text = arguments["text"].as_str().unwrap_or_default();
            if text == "boom" {
                return Err(ToolError::ExecutionFailed {
                    tool_name: "echo".into(),
                    reason: "exploded".into(),
                });
            }
            Ok(ToolResult::ok(text).with("length", text.len()))
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        registry
    }

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall { id: "call_1".into(), name: name.into(), arguments }
    }

    #[test]
    fn dispatch_executes_tool() {
        let store = PortfolioStore::default();
        let result = registry().dispatch(&call("echo", json!({"text": "hi"})), &store);
        assert!(result.success);
        assert_eq!(result.message.as_deref(), Some("hi"));
        assert_eq!(result.data["length"], 2);
    }

    #[test]
    fn unknown_tool_becomes_failed_result() {
        let store = PortfolioStore::default();
        let result = registry().dispatch(&call("nope", json!({})), &store);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Unknown tool: nope"));
    }

    #[test]
    fn schema_violations_are_reported() {
        let store = PortfolioStore::default();
        let reg = registry();
        let missing = reg.dispatch(&call("echo", json!({})), &store);
        assert!(missing.error.unwrap().contains("missing required field 'text'"));

        let out_of_range = reg.dispatch(&call("echo", json!({"text": "a", "times": 9})), &store);
        assert!(out_of_range.error.unwrap().contains("<= 3"));

        let wrong_type = reg.dispatch(&call("echo", json!({"text": 5})), &store);
        assert!(wrong_type.error.unwrap().contains("type string"));
    }

    #[test]
    fn execution_error_is_caught() {
        let store = PortfolioStore::default();
        let result = registry().dispatch(&call("echo", json!({"text": "boom"})), &store);
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("Tool execution error:"));
    }

    #[test]
    fn result_serializes_flat() {
        let content = ToolResult::ok("Created").with("sectionIndex", 0).to_content();
        let value: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value, json!({"success": true, "message": "Created", "sectionIndex": 0}));
    }

    #[test]
    fn malformed_argument_json_is_rejected() {
        let raw = MessageToolCall { id: "c".into(), name: "echo".into(), arguments: "{oops".into() };
        assert!(matches!(ToolCall::from_message(&raw), Err(ToolError::InvalidArguments(_))));

        let empty = MessageToolCall { id: "c".into(), name: "echo".into(), arguments: "".into() };
        assert!(ToolCall::from_message(&empty).unwrap().arguments.is_object());
    }

    #[test]
    fn integer_accepts_whole_floats() {
        let schema = json!({"properties": {"n": {"type": "integer"}}});
        assert!(validate_arguments(&schema, &json!({"n": 2.0})).is_ok());
        assert!(validate_arguments(&schema, &json!({"n": 2.5})).is_err());
    }
}
