use parley_core::{ParleyError, ParleyResult, Role, Turn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Persona used when no system prompt override is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant for building-model \
automation. Be concise. When generating code, write Python that can run unattended.";

/// One message in a rendered prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Speaker of the message.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl PromptMessage {
    /// Creates a message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A fully rendered prompt, ready to hand to a model.
///
/// `input` carries the raw `input` variable when one was supplied; backends
/// that only echo (the fake provider) read it directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptContext {
    /// Concatenated system instructions.
    pub system: Option<String>,
    /// History followed by the rendered user message.
    pub messages: Vec<PromptMessage>,
    /// Raw `input` variable.
    pub input: Option<String>,
}

/// A value bound to a template variable.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptValue {
    /// Substituted into `{name}` placeholders.
    Text(String),
    /// Expanded by a history part.
    Turns(Vec<Turn>),
}

impl PromptValue {
    fn type_name(&self) -> &'static str {
        match self {
            PromptValue::Text(_) => "text",
            PromptValue::Turns(_) => "turns",
        }
    }
}

/// Named values substituted into a [`PromptTemplate`].
#[derive(Debug, Clone, Default)]
pub struct PromptVariables {
    values: HashMap<String, PromptValue>,
}

impl PromptVariables {
    /// Creates an empty variable set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text variable.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values
            .insert(name.into(), PromptValue::Text(value.into()));
        self
    }

    /// Adds a list-of-turns variable.
    pub fn turns(mut self, name: impl Into<String>, turns: Vec<Turn>) -> Self {
        self.values.insert(name.into(), PromptValue::Turns(turns));
        self
    }

    /// Inserts or replaces a variable.
    pub fn insert(&mut self, name: impl Into<String>, value: PromptValue) {
        self.values.insert(name.into(), value);
    }

    /// Looks up a variable.
    pub fn get(&self, name: &str) -> Option<&PromptValue> {
        self.values.get(name)
    }

    fn require_text(&self, name: &str) -> ParleyResult<&str> {
        match self.values.get(name) {
            Some(PromptValue::Text(t)) => Ok(t),
            Some(other) => Err(wrong_type(name, "text", other)),
            None => Err(missing(name)),
        }
    }

    fn require_turns(&self, name: &str) -> ParleyResult<&[Turn]> {
        match self.values.get(name) {
            Some(PromptValue::Turns(t)) => Ok(t),
            Some(other) => Err(wrong_type(name, "turns", other)),
            None => Err(missing(name)),
        }
    }
}

fn missing(name: &str) -> ParleyError {
    ParleyError::AgentMisconfigured(format!("missing prompt variable '{name}'"))
}

fn wrong_type(name: &str, expected: &str, got: &PromptValue) -> ParleyError {
    ParleyError::AgentMisconfigured(format!(
        "prompt variable '{name}' must be {expected}, got {}",
        got.type_name()
    ))
}

/// One section of a [`PromptTemplate`].
#[derive(Debug, Clone, PartialEq)]
pub enum PromptPart {
    /// Static instruction text, used verbatim.
    System(String),
    /// Expands to the turns bound to the named variable, oldest first.
    History(String),
    /// A user message with `{variable}` placeholders. `{{` and `}}` are literal braces.
    Human(String),
}

/// Ordered prompt layout: system instruction, then history, then the new message.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    parts: Vec<PromptPart>,
}

impl PromptTemplate {
    /// Builds a template from ordered parts.
    pub fn new(parts: Vec<PromptPart>) -> Self {
        Self { parts }
    }

    /// The standard chat layout: `system`, the `history` turns, then `{input}`.
    pub fn chat(system_prompt: impl Into<String>) -> Self {
        Self::new(vec![
            PromptPart::System(system_prompt.into()),
            PromptPart::History("history".into()),
            PromptPart::Human("{input}".into()),
        ])
    }

    /// Ordered template parts.
    pub fn parts(&self) -> &[PromptPart] {
        &self.parts
    }

    /// Names of all variables the template reads, sorted.
    pub fn input_variables(&self) -> ParleyResult<Vec<String>> {
        let mut names = BTreeSet::new();
        for part in &self.parts {
            match part {
                PromptPart::System(_) => {}
                PromptPart::History(var) => {
                    names.insert(var.clone());
                }
                PromptPart::Human(template) => {
                    for segment in parse_template(template)? {
                        if let Segment::Var(name) = segment {
                            names.insert(name.to_string());
                        }
                    }
                }
            }
        }
        Ok(names.into_iter().collect())
    }

    /// Renders the template against `vars`.
    ///
    /// Missing variables, variables of the wrong kind, and malformed
    /// placeholders all fail with [`ParleyError::AgentMisconfigured`].
    pub fn render(&self, vars: &PromptVariables) -> ParleyResult<PromptContext> {
        let mut system: Vec<&str> = Vec::new();
        let mut messages = Vec::new();

        for part in &self.parts {
            match part {
                PromptPart::System(text) => system.push(text),
                PromptPart::History(var) => {
                    messages.extend(
                        vars.require_turns(var)?
                            .iter()
                            .map(|t| PromptMessage::new(t.role, t.content.clone())),
                    );
                }
                PromptPart::Human(template) => {
                    messages.push(PromptMessage::new(Role::User, substitute(template, vars)?));
                }
            }
        }

        let input = match vars.get("input") {
            Some(PromptValue::Text(t)) => Some(t.clone()),
            _ => None,
        };

        Ok(PromptContext {
            system: if system.is_empty() {
                None
            } else {
                Some(system.join("\n\n"))
            },
            messages,
            input,
        })
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::chat(DEFAULT_SYSTEM_PROMPT)
    }
}

enum Segment<'a> {
    Literal(&'a str),
    Brace(char),
    Var(&'a str),
}

fn parse_template(template: &str) -> ParleyResult<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        if pos > 0 {
            segments.push(Segment::Literal(&rest[..pos]));
        }
        let tail = &rest[pos..];
        if tail.starts_with("{{") {
            segments.push(Segment::Brace('{'));
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            segments.push(Segment::Brace('}'));
            rest = &tail[2..];
        } else if tail.starts_with('}') {
            return Err(ParleyError::AgentMisconfigured(format!(
                "unmatched '}}' in prompt template: {template}"
            )));
        } else {
            let end = tail.find('}').ok_or_else(|| {
                ParleyError::AgentMisconfigured(format!(
                    "unterminated placeholder in prompt template: {template}"
                ))
            })?;
            let name = tail[1..end].trim();
            if name.is_empty() || name.contains('{') {
                return Err(ParleyError::AgentMisconfigured(format!(
                    "invalid placeholder in prompt template: {template}"
                )));
            }
            segments.push(Segment::Var(name));
            rest = &tail[end + 1..];
        }
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }
    Ok(segments)
}

fn substitute(template: &str, vars: &PromptVariables) -> ParleyResult<String> {
    let mut out = String::with_capacity(template.len());
    for segment in parse_template(template)? {
        match segment {
            Segment::Literal(s) => out.push_str(s),
            Segment::Brace(c) => out.push(c),
            Segment::Var(name) => out.push_str(vars.require_text(name)?),
        }
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn vars(history: Vec<Turn>, input: &str) -> PromptVariables {
        PromptVariables::new()
            .turns("history", history)
            .text("input", input)
    }

    #[test]
    fn test_default_layout_orders_system_history_input() {
        let ctx = PromptTemplate::default()
            .render(&vars(
                vec![Turn::user("hi"), Turn::assistant("hello")],
                "select walls",
            ))
            .unwrap();

        assert_eq!(ctx.system.as_deref(), Some(DEFAULT_SYSTEM_PROMPT));
        let contents: Vec<_> = ctx.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["hi", "hello", "select walls"]);
        assert_eq!(ctx.messages[1].role, Role::Assistant);
        assert_eq!(ctx.messages[2].role, Role::User);
        assert_eq!(ctx.input.as_deref(), Some("select walls"));
    }

    #[test]
    fn test_missing_variable_is_misconfiguration() {
        let err = PromptTemplate::default()
            .render(&PromptVariables::new().text("input", "x"))
            .unwrap_err();
        assert!(matches!(err, ParleyError::AgentMisconfigured(_)));
        assert!(err.to_string().contains("history"));
    }

    #[test]
    fn test_wrong_variable_type_is_misconfiguration() {
        let bad = PromptVariables::new()
            .text("history", "not turns")
            .text("input", "x");
        let err = PromptTemplate::default().render(&bad).unwrap_err();
        assert!(err.to_string().contains("must be turns"));
    }

    #[test]
    fn test_braces_and_placeholders() {
        let template = PromptTemplate::new(vec![PromptPart::Human(
            "Run {{code}} for {user}: { input }".into(),
        )]);
        let ctx = template
            .render(&PromptVariables::new().text("user", "ana").text("input", "go"))
            .unwrap();
        assert_eq!(ctx.messages[0].content, "Run {code} for ana: go");
        assert!(ctx.system.is_none());
    }

    #[test]
    fn test_malformed_placeholders() {
        for bad in ["{input", "{}", "oops }", "{a{b}"] {
            let template = PromptTemplate::new(vec![PromptPart::Human(bad.into())]);
            let err = template
                .render(&PromptVariables::new().text("input", "x"))
                .unwrap_err();
            assert!(matches!(err, ParleyError::AgentMisconfigured(_)), "{bad}");
        }
    }

    #[test]
    fn test_system_text_is_verbatim() {
        let template = PromptTemplate::new(vec![PromptPart::System("use {braces}".into())]);
        let ctx = template.render(&PromptVariables::new()).unwrap();
        assert_eq!(ctx.system.as_deref(), Some("use {braces}"));
    }

    #[test]
    fn test_input_variables() {
        let template = PromptTemplate::new(vec![
            PromptPart::History("past".into()),
            PromptPart::Human("{topic}: {input}".into()),
        ]);
        assert_eq!(template.input_variables().unwrap(), ["input", "past", "topic"]);
    }
}
