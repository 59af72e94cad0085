#![allow(clippy::unwrap_used, clippy::expect_used)]

use parley_core::*;

// ---------------------------------------------------------------------------
// 1. Turn serialization roundtrip
// ---------------------------------------------------------------------------

#[test]
fn turn_serialization_roundtrip() {
    let turn = Turn::assistant("Walls selected.");

    let json = serde_json::to_string(&turn).unwrap();
    assert!(json.contains("\"role\":\"assistant\""));

    let deserialized: Turn = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, turn);
}

// ---------------------------------------------------------------------------
// 2. Error Display and From impls
// ---------------------------------------------------------------------------

#[test]
fn error_display_and_from_impls() {
    let err = ParleyError::InvalidArgument("message must be a non-empty string".to_string());
    assert_eq!(
        err.to_string(),
        "Invalid argument: message must be a non-empty string"
    );

    let err = ParleyError::AgentMisconfigured("missing prompt variable 'input'".to_string());
    assert_eq!(
        err.to_string(),
        "Invalid agent configuration: missing prompt variable 'input'"
    );

    let err = ParleyError::ModelInvocationFailed("empty response".to_string());
    assert_eq!(err.to_string(), "Model invocation failed: empty response");

    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err: ParleyError = io_err.into();
    assert!(matches!(err, ParleyError::Io(_)));
    assert_eq!(err.kind(), "io");

    let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let err: ParleyError = json_err.into();
    assert!(matches!(err, ParleyError::Json(_)));
}

// ---------------------------------------------------------------------------
// 3. Error kinds are stable labels
// ---------------------------------------------------------------------------

#[test]
fn error_kinds_are_distinct() {
    let kinds = [
        ParleyError::InvalidArgument(String::new()).kind(),
        ParleyError::InvalidConfiguration(String::new()).kind(),
        ParleyError::provider_unavailable("ollama", "feature disabled").kind(),
        ParleyError::AgentMisconfigured(String::new()).kind(),
        ParleyError::ModelInvocationFailed(String::new()).kind(),
        ParleyError::Http(String::new()).kind(),
    ];
    let unique: std::collections::HashSet<_> = kinds.iter().collect();
    assert_eq!(unique.len(), kinds.len());
}

// ---------------------------------------------------------------------------
// 4. Tool descriptors
// ---------------------------------------------------------------------------

#[test]
fn tool_descriptor_roundtrip() {
    let tool = ToolDescriptor {
        name: "select_elements_by_category".to_string(),
        description: "Return element ids for a category".to_string(),
        parameters_schema: serde_json::json!({
            "type": "object",
            "properties": {"category": {"type": "string"}},
            "required": ["category"]
        }),
    };
    let json = serde_json::to_value(&tool).unwrap();
    assert_eq!(json["parameters_schema"]["required"][0], "category");
    let back: ToolDescriptor = serde_json::from_value(json).unwrap();
    assert_eq!(back, tool);
}
