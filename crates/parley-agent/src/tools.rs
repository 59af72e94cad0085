//! Static tool catalog advertised to models when tool binding is enabled.
//!
//! The catalog only describes the tools. Executing a requested call is the
//! host application's job; parley returns the request as text.

use parley_core::ToolDescriptor;

/// Selects building elements of one category.
pub const SELECT_ELEMENTS_BY_CATEGORY: &str = "select_elements_by_category";
/// Runs a script through the sandbox.
pub const RUN_SCRIPT: &str = "run_script";

/// All tools a model may be bound to.
pub fn builtin_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: SELECT_ELEMENTS_BY_CATEGORY.into(),
            description: "Return the ids of all building-model elements in a category \
                          (for example OST_Walls or OST_Doors)."
                .into(),
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "category": {
                        "type": "string",
                        "description": "Built-in category name, e.g. OST_Walls"
                    }
                },
                "required": ["category"]
            }),
        },
        ToolDescriptor {
            name: RUN_SCRIPT.into(),
            description: "Ask the host to execute a Python script in the sandbox and \
                          return its captured output."
                .into(),
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "code": {"type": "string", "description": "Python source"},
                    "timeout_secs": {"type": "integer", "minimum": 0}
                },
                "required": ["code"]
            }),
        },
    ]
}
