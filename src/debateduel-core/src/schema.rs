//! Typed contracts for the inputs and outputs of each model operation.
//!
//! Inputs are checked before a prompt is rendered; outputs are checked
//! field by field against the model's JSON reply. Nothing is coerced: a
//! number where a string is expected is a mismatch, not a conversion.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::LazyLock;

use crate::error::DebateError;
use crate::stance::Stance;

/// Input to the argument generation operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateArgumentsInput {
    pub topic: String,
    pub stance: Stance,
}

impl GenerateArgumentsInput {
    pub fn new(topic: impl Into<String>, stance: Stance) -> Result<Self, DebateError> {
        let input = Self {
            topic: topic.into(),
            stance,
        };
        input.validate()?;
        Ok(input)
    }

    /// Check a candidate object such as `{"topic": "...", "stance": "pro"}`.
    pub fn from_value(value: &Value) -> Result<Self, DebateError> {
        let object = input_object(value)?;
        let topic = required_text(object, "topic")?;
        let stance = Stance::parse_field("stance", required_str(object, "stance")?)?;
        Ok(Self { topic, stance })
    }

    pub fn validate(&self) -> Result<(), DebateError> {
        non_empty("topic", &self.topic)
    }
}

/// Input to the weakness analysis operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeWeaknessesInput {
    pub topic: String,
    pub argument: String,
    /// Side from which the argument is examined.
    pub side: Stance,
}

impl AnalyzeWeaknessesInput {
    pub fn new(
        topic: impl Into<String>,
        argument: impl Into<String>,
        side: Stance,
    ) -> Result<Self, DebateError> {
        let input = Self {
            topic: topic.into(),
            argument: argument.into(),
            side,
        };
        input.validate()?;
        Ok(input)
    }

    pub fn from_value(value: &Value) -> Result<Self, DebateError> {
        let object = input_object(value)?;
        let topic = required_text(object, "topic")?;
        let argument = required_text(object, "argument")?;
        let side = Stance::parse_field("side", required_str(object, "side")?)?;
        Ok(Self {
            topic,
            argument,
            side,
        })
    }

    pub fn validate(&self) -> Result<(), DebateError> {
        non_empty("topic", &self.topic)?;
        non_empty("argument", &self.argument)
    }
}

/// A structured payload the model is asked to produce.
pub trait OutputSchema: Sized {
    /// Name used in log output.
    const NAME: &'static str;

    /// JSON schema embedded in the prompt.
    fn json_schema() -> Value;

    /// Check a decoded payload against the schema.
    fn from_payload(value: &Value) -> Result<Self, DebateError>;

    /// Extract and check the payload from a raw model reply.
    fn from_reply(reply: &str) -> Result<Self, DebateError> {
        let value = extract_json(reply)?;
        Self::from_payload(&value)
    }
}

/// Output of the argument generation operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArguments {
    pub arguments: Vec<String>,
}

impl OutputSchema for GeneratedArguments {
    const NAME: &'static str = "generated_arguments";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "arguments": {
                    "type": "array",
                    "items": { "type": "string", "minLength": 1 },
                    "description": "Debate arguments for the requested stance."
                }
            },
            "required": ["arguments"]
        })
    }

    fn from_payload(value: &Value) -> Result<Self, DebateError> {
        let object = output_object(value)?;
        let arguments = string_array(object, "arguments")?;
        if let Some(idx) = arguments.iter().position(|a| a.trim().is_empty()) {
            return Err(DebateError::schema(
                format!("arguments[{idx}]"),
                "argument text is empty",
            ));
        }
        Ok(Self { arguments })
    }
}

/// Output of the weakness analysis operation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub weaknesses: Vec<String>,
    pub rebuttals: Vec<String>,
}

impl OutputSchema for AnalysisResult {
    const NAME: &'static str = "analysis_result";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "weaknesses": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "The weaknesses of the argument."
                },
                "rebuttals": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Possible rebuttals to the argument."
                }
            },
            "required": ["weaknesses", "rebuttals"]
        })
    }

    fn from_payload(value: &Value) -> Result<Self, DebateError> {
        let object = output_object(value)?;
        Ok(Self {
            weaknesses: string_array(object, "weaknesses")?,
            rebuttals: string_array(object, "rebuttals")?,
        })
    }
}

fn non_empty(field: &str, value: &str) -> Result<(), DebateError> {
    if value.trim().is_empty() {
        return Err(DebateError::validation(field, "must not be empty"));
    }
    Ok(())
}

fn input_object(value: &Value) -> Result<&Map<String, Value>, DebateError> {
    value
        .as_object()
        .ok_or_else(|| DebateError::validation("$", "expected an object"))
}

fn required_str<'a>(object: &'a Map<String, Value>, field: &str) -> Result<&'a str, DebateError> {
    match object.get(field) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(DebateError::validation(
            field,
            format!("expected a string, got {}", kind(other)),
        )),
        None => Err(DebateError::validation(field, "missing")),
    }
}

fn required_text(object: &Map<String, Value>, field: &str) -> Result<String, DebateError> {
    let value = required_str(object, field)?;
    non_empty(field, value)?;
    Ok(value.to_string())
}

fn output_object(value: &Value) -> Result<&Map<String, Value>, DebateError> {
    value
        .as_object()
        .ok_or_else(|| DebateError::schema("$", format!("expected an object, got {}", kind(value))))
}

fn string_array(object: &Map<String, Value>, field: &str) -> Result<Vec<String>, DebateError> {
    let items = match object.get(field) {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(DebateError::schema(
                field,
                format!("expected an array, got {}", kind(other)),
            ));
        }
        None => return Err(DebateError::schema(field, "missing")),
    };

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::String(s) => Ok(s.clone()),
            other => Err(DebateError::schema(
                format!("{field}[{idx}]"),
                format!("expected a string, got {}", kind(other)),
            )),
        })
        .collect()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Reasoning blocks some models emit ahead of the answer.
const REASONING_TAGS: [&str; 5] = ["think", "thinking", "reasoning", "reflection", "scratchpad"];

static REASONING_BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    REASONING_TAGS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}[^>]*>.*?</{tag}>"))
                .expect("reasoning tag pattern is valid")
        })
        .collect()
});

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("code fence pattern is valid")
});

/// Pull the JSON object out of a model reply.
///
/// Strips reasoning blocks and Markdown code fences, then takes the span
/// from the first `{` to the last `}`.
pub fn extract_json(reply: &str) -> Result<Value, DebateError> {
    let mut text = reply.to_string();

    for re in REASONING_BLOCKS.iter() {
        text = re.replace_all(&text, "").into_owned();
    }

    if let Some(inner) = CODE_FENCE.captures(&text).and_then(|c| c.get(1)) {
        text = inner.as_str().to_string();
    }

    let body = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => {
            return Err(DebateError::schema("$", "reply contains no JSON object"));
        }
    };

    serde_json::from_str(body)
        .map_err(|e| DebateError::schema("$", format!("reply is not valid JSON: {e}")))
}
