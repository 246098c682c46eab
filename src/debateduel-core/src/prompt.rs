//! Prompt rendering for the model operations.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::config::PromptsConfig;
use crate::schema::{AnalyzeWeaknessesInput, GenerateArgumentsInput, OutputSchema};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern is valid"));

/// Substitute `{name}` placeholders in a single pass.
///
/// Substituted values are never rescanned, so a user argument containing
/// `{topic}` stays literal. Unknown placeholders are left untouched.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn schema_text<T: OutputSchema>() -> String {
    serde_json::to_string_pretty(&T::json_schema()).unwrap_or_default()
}

/// Prompt asking for arguments for one stance.
pub fn generate_arguments_prompt<T: OutputSchema>(
    prompts: &PromptsConfig,
    input: &GenerateArgumentsInput,
) -> String {
    let schema = schema_text::<T>();
    render(
        &prompts.generate_arguments,
        &[
            ("topic", input.topic.trim()),
            ("stance", input.stance.as_str()),
            ("schema", &schema),
        ],
    )
}

/// Prompt asking for weaknesses and rebuttals of a single argument.
pub fn analyze_weaknesses_prompt<T: OutputSchema>(
    prompts: &PromptsConfig,
    input: &AnalyzeWeaknessesInput,
) -> String {
    let schema = schema_text::<T>();
    render(
        &prompts.analyze_weaknesses,
        &[
            ("topic", input.topic.trim()),
            ("side", input.side.as_str()),
            ("argument", input.argument.trim()),
            ("schema", &schema),
        ],
    )
}
