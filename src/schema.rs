//! Input schemas for the MCP tools.

use rmcp::model::JsonObject;
use rmcp::schemars::{self, JsonSchema, generate::SchemaSettings};
use std::sync::Arc;

/// Draft-07 schema for `T` with every subschema inlined, so clients see
/// plain properties instead of `$ref` indirections.
pub fn inline_schema_for_type<T: JsonSchema>() -> Arc<JsonObject> {
    let mut settings = SchemaSettings::draft07();
    settings.transforms = vec![Box::new(schemars::transform::AddNullable::default())];
    settings.inline_subschemas = true;

    let schema = settings.into_generator().into_root_schema_for::<T>();
    let object = match serde_json::to_value(schema) {
        Ok(serde_json::Value::Object(object)) => object,
        Ok(other) => {
            tracing::error!(schema = %other, "Tool schema is not a JSON object");
            JsonObject::new()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize tool schema");
            JsonObject::new()
        }
    };

    Arc::new(object)
}
