//! OpenAPI Document Generation
//!
//! Builds an OpenAPI 3.0 description of the context functions from the
//! [`catalog`](super::catalog). Each function becomes one `POST` path under a
//! caller-chosen prefix: the context server documents its `/mcp/` dispatch
//! route, the relay documents `/proxy/`.
//!
//! The document is immutable once built. Services build it once at startup and
//! serve both the JSON form and a pretty-printed text form from the cache.

use serde_json::{json, Map, Value};

use super::catalog::CONTEXT_FUNCTIONS;

const DEFAULT_TITLE: &str = "ctxstack Context API";
const DEFAULT_DESCRIPTION: &str = "API for context management operations";

/// A built OpenAPI document with its pretty-printed rendering.
#[derive(Debug, Clone)]
pub struct OpenApiDocument {
    value: Value,
    pretty: String,
}

impl OpenApiDocument {
    /// Builds the document with every function mounted under `path_prefix`.
    ///
    /// `path_prefix` must start and end with `/` (e.g. `/mcp/`).
    pub fn build(path_prefix: &str) -> Self {
        Self::build_titled(path_prefix, DEFAULT_TITLE, DEFAULT_DESCRIPTION)
    }

    /// Builds the document with a custom `info.title` and `info.description`.
    pub fn build_titled(path_prefix: &str, title: &str, description: &str) -> Self {
        let mut paths = Map::new();
        for function in CONTEXT_FUNCTIONS {
            let mut schema = json!({
                "type": "object",
                "properties": function.properties(),
            });
            let required = function.required();
            if !required.is_empty() {
                schema["required"] = json!(required);
            }

            paths.insert(
                format!("{}{}", path_prefix, function.name),
                json!({
                    "post": {
                        "summary": function.description,
                        "operationId": function.name,
                        "security": [{"none": []}],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": schema,
                                    "example": function.example_params(),
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Successful response",
                                "content": {
                                    "application/json": {"schema": {"type": "object"}}
                                }
                            },
                            "400": {"description": "Invalid argument"},
                            "404": {"description": "Context not found"}
                        }
                    }
                }),
            );
        }

        let value = json!({
            "openapi": "3.0.0",
            "info": {
                "title": title,
                "description": description,
                "version": env!("CARGO_PKG_VERSION"),
            },
            "security": [{"none": []}],
            "components": {
                "securitySchemes": {
                    "none": {
                        "type": "http",
                        "scheme": "bearer",
                        "description": "No authentication required. This API is open."
                    }
                }
            },
            "paths": Value::Object(paths),
        });

        // Serializing a `Value` cannot fail: all map keys are strings.
        let pretty = serde_json::to_string_pretty(&value).unwrap_or_default();

        Self { value, pretty }
    }

    /// The document as JSON.
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// The document pretty-printed with two-space indentation.
    pub fn pretty(&self) -> &str {
        &self.pretty
    }
}
