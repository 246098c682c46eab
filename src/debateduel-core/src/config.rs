//! Configuration module for loading TOML config files.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::DebateError;
use crate::stance::Stance;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub prompts: PromptsConfig,
    pub senders: SendersConfig,
}

/// Model provider settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// The LLM model to use (e.g., "gpt-4o-mini", "llama3:8b").
    pub name: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Whole-request timeout.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            timeout_secs: 120,
            connect_timeout_secs: 30,
        }
    }
}

/// Prompt templates for the two operations.
///
/// Placeholders: `{topic}`, `{stance}`, `{side}`, `{argument}`, `{schema}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub generate_arguments: String,
    pub analyze_weaknesses: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            generate_arguments: DEFAULT_GENERATE_ARGUMENTS_PROMPT.to_string(),
            analyze_weaknesses: DEFAULT_ANALYZE_WEAKNESSES_PROMPT.to_string(),
        }
    }
}

/// Sender names shown in the chat transcript.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SendersConfig {
    pub pro: String,
    pub con: String,
    pub analyst: String,
}

impl Default for SendersConfig {
    fn default() -> Self {
        Self {
            pro: "Pro AI".to_string(),
            con: "Con AI".to_string(),
            analyst: "AI Analyst".to_string(),
        }
    }
}

impl SendersConfig {
    /// Transcript sender for arguments of `stance`.
    pub fn for_stance(&self, stance: Stance) -> &str {
        match stance {
            Stance::Pro => &self.pro,
            Stance::Con => &self.con,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DebateError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| DebateError::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_str(&content)
    }

    /// Load configuration from string content.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, DebateError> {
        let config: Config = toml::from_str(content)
            .map_err(|e| DebateError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every template carries the placeholders it is rendered with.
    pub fn validate(&self) -> Result<(), DebateError> {
        require_placeholders(
            "prompts.generate_arguments",
            &self.prompts.generate_arguments,
            &["{topic}", "{stance}"],
        )?;
        require_placeholders(
            "prompts.analyze_weaknesses",
            &self.prompts.analyze_weaknesses,
            &["{topic}", "{side}", "{argument}"],
        )?;

        if self.model.name.trim().is_empty() {
            return Err(DebateError::ConfigError("model.name must not be empty".into()));
        }
        if self.model.timeout_secs == 0 {
            return Err(DebateError::ConfigError(
                "model.timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn require_placeholders(name: &str, template: &str, needed: &[&str]) -> Result<(), DebateError> {
    let missing: Vec<&str> = needed
        .iter()
        .copied()
        .filter(|p| !template.contains(p))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DebateError::ConfigError(format!(
            "{} is missing placeholder(s): {}",
            name,
            missing.join(", ")
        )))
    }
}

/// Default configuration embedded in the binary.
pub fn default_config() -> Config {
    Config::default()
}

const DEFAULT_GENERATE_ARGUMENTS_PROMPT: &str = r#"You are an expert debate coach preparing a student for a formal debate.

Topic: {topic}
Stance: {stance}

Write the strongest distinct arguments for the {stance} side of the topic.
Each argument is one or two complete sentences that stand on their own.
Do not number the arguments and do not repeat the topic back.

Respond with a single JSON object and nothing else, matching this JSON schema:
{schema}
"#;

const DEFAULT_ANALYZE_WEAKNESSES_PROMPT: &str = r#"You are an expert debate analyst. Your job is to analyze the provided argument for weaknesses and suggest possible rebuttals.

Topic: {topic}
Side: {side}
Argument: {argument}

Identify the weaknesses in the argument and provide possible rebuttals.

Respond with a single JSON object and nothing else, matching this JSON schema:
{schema}
"#;
