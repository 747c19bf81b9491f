//! Explicit tool registry.
//!
//! Each [`Tool`] pairs a name and a JSON Schema for its input with a handler.
//! The schema is derived from the handler's parameter type, so the declared
//! contract and the deserialized arguments cannot drift apart.
//!
//! ```rust,ignore
//! use omcp::tool::{Tool, ToolRegistry};
//!
//! #[derive(Deserialize, JsonSchema)]
//! struct AddParams { a: i64, b: i64 }
//!
//! let registry = ToolRegistry::new().with(Tool::new(
//!     "add",
//!     "Add two numbers",
//!     |p: AddParams| async move { Ok::<_, String>(p.a + p.b) },
//! ));
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ProtocolError;
use crate::protocol::{CallToolResult, ToolInfo};

type Handler = dyn Fn(Map<String, Value>) -> BoxFuture<'static, Result<Value, ToolFailure>>
    + Send
    + Sync;

/// Why a tool invocation did not produce a value.
#[derive(Debug)]
pub enum ToolFailure {
    /// The arguments did not deserialize into the tool's parameter type.
    Arguments(String),
    /// The tool ran and reported an error.
    Execution(String),
}

/// A named, schema-described tool.
#[derive(Clone)]
pub struct Tool {
    name: String,
    description: Option<String>,
    input_schema: Value,
    handler: Arc<Handler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Tool {
    /// Create a tool whose input schema is derived from `P`.
    pub fn new<P, R, E, F, Fut>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        P: DeserializeOwned + JsonSchema + Send + 'static,
        R: Serialize + Send + 'static,
        E: std::fmt::Display + Send + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        let f = Arc::new(f);
        let handler = move |arguments: Map<String, Value>| -> BoxFuture<'static, Result<Value, ToolFailure>> {
            let f = f.clone();
            Box::pin(async move {
                let params: P = serde_json::from_value(Value::Object(arguments))
                    .map_err(|e| ToolFailure::Arguments(e.to_string()))?;
                let output = f(params)
                    .await
                    .map_err(|e| ToolFailure::Execution(e.to_string()))?;
                serde_json::to_value(output).map_err(|e| ToolFailure::Execution(e.to_string()))
            })
        };
        Self {
            name: name.into(),
            description: Some(description.into()),
            input_schema: input_schema::<P>(),
            handler: Arc::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    pub fn info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }

    /// Validate `arguments` against the declared schema and run the handler.
    pub async fn call(&self, arguments: Map<String, Value>) -> Result<CallToolResult, ProtocolError> {
        validate_arguments(&self.input_schema, &arguments)?;
        match (self.handler)(arguments).await {
            Ok(value) => Ok(CallToolResult::success(value)),
            Err(ToolFailure::Arguments(msg)) => Err(ProtocolError::InvalidParams(msg)),
            Err(ToolFailure::Execution(msg)) => {
                tracing::warn!(tool = %self.name, error = %msg, "tool reported an error");
                Ok(CallToolResult::failure(msg))
            }
        }
    }
}

/// Name-keyed tool table. Listing preserves registration order.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    order: Vec<String>,
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any earlier tool with the same name.
    pub fn register(&mut self, tool: Tool) {
        let name = tool.name.clone();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    pub fn with(mut self, tool: Tool) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn list(&self) -> Vec<ToolInfo> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(Tool::info)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn input_schema<P: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(P))
        .unwrap_or_else(|_| serde_json::json!({ "type": "object" }));
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        // Unit-like parameter structs produce no properties at all.
        obj.entry("properties").or_insert_with(|| Value::Object(Map::new()));
    }
    schema
}

/// Best-effort check of `arguments` against an object schema: `required`
/// keys must be present and declared primitive types must match.
pub fn validate_arguments(schema: &Value, arguments: &Map<String, Value>) -> Result<(), ProtocolError> {
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !arguments.contains_key(key) {
                return Err(ProtocolError::InvalidParams(format!(
                    "missing required argument: {key}"
                )));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };
    for (key, value) in arguments {
        let Some(declared) = properties.get(key).and_then(|p| p.get("type")) else {
            continue;
        };
        let matches = match declared {
            Value::String(ty) => type_matches(ty, value),
            Value::Array(types) => types
                .iter()
                .filter_map(Value::as_str)
                .any(|ty| type_matches(ty, value)),
            _ => true,
        };
        if !matches {
            return Err(ProtocolError::InvalidParams(format!(
                "argument {key} does not match declared type {declared}"
            )));
        }
    }
    Ok(())
}

fn type_matches(ty: &str, value: &Value) -> bool {
    match ty {
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}
