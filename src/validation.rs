//! Stimulus input validation against the function cards' JSON schemas

use crate::error::{Result, ScrubError};
use serde_json::Value;

/// Validate input against a JSON schema
pub fn validate_input(input: &Value, schema: &Value) -> Result<()> {
    if !input.is_object() {
        return Err(ScrubError::InvalidInput("Input must be a JSON object".to_string()));
    }

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for field_name in required {
            let field_str = field_name.as_str().ok_or_else(|| {
                ScrubError::InvalidInput("Invalid schema: required field not a string".to_string())
            })?;

            if input.get(field_str).is_none() {
                return Err(ScrubError::InvalidInput(format!("Missing required field: {}", field_str)));
            }
        }
    }

    if let (Some(properties), Some(input_obj)) = (
        schema.get("properties").and_then(|p| p.as_object()),
        input.as_object(),
    ) {
        for (key, value) in input_obj {
            if let Some(prop_schema) = properties.get(key) {
                validate_value(key, value, prop_schema)?;
            }
        }
    }

    Ok(())
}

fn validate_value(key: &str, value: &Value, schema: &Value) -> Result<()> {
    validate_type(key, value, schema)?;
    validate_range(key, value, schema)?;

    if let (Some(items), Some(array)) = (schema.get("items"), value.as_array()) {
        for item in array {
            validate_type(key, item, items)?;
        }
    }
    Ok(())
}

/// Validate that a value matches the expected type
fn validate_type(key: &str, value: &Value, schema: &Value) -> Result<()> {
    if let Some(expected_type) = schema.get("type").and_then(|t| t.as_str()) {
        let valid = match expected_type {
            "string" => value.is_string(),
            "integer" => value.is_i64() || value.is_u64(),
            "number" => value.is_number(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            "object" => value.is_object(),
            "null" => value.is_null(),
            _ => true,
        };

        if !valid {
            return Err(ScrubError::InvalidInput(format!(
                "Type mismatch for {}: expected {}, got {}",
                key, expected_type, value
            )));
        }
    }
    Ok(())
}

fn validate_range(key: &str, value: &Value, schema: &Value) -> Result<()> {
    let Some(number) = value.as_f64() else {
        return Ok(());
    };
    if let Some(min) = schema.get("minimum").and_then(|m| m.as_f64()) {
        if number < min {
            return Err(ScrubError::InvalidInput(format!("{} must be >= {}, got {}", key, min, number)));
        }
    }
    if let Some(max) = schema.get("maximum").and_then(|m| m.as_f64()) {
        if number > max {
            return Err(ScrubError::InvalidInput(format!("{} must be <= {}, got {}", key, max, number)));
        }
    }
    Ok(())
}
