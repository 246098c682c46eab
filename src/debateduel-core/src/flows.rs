//! The two model operations: argument generation and weakness analysis.
//!
//! Each call is single-shot. Identical inputs issue a fresh request, and
//! the replies may differ.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::PromptsConfig;
use crate::error::DebateError;
use crate::prompt;
use crate::provider::ModelProvider;
use crate::schema::{
    AnalysisResult, AnalyzeWeaknessesInput, GenerateArgumentsInput, GeneratedArguments,
    OutputSchema,
};

/// Prompt templates bound to a model provider.
#[derive(Clone)]
pub struct DebateFlows {
    provider: Arc<dyn ModelProvider>,
    prompts: PromptsConfig,
}

impl DebateFlows {
    pub fn new(provider: Arc<dyn ModelProvider>, prompts: PromptsConfig) -> Self {
        Self { provider, prompts }
    }

    /// Ask the model for arguments supporting `input.stance` on `input.topic`.
    pub async fn generate_arguments(
        &self,
        input: &GenerateArgumentsInput,
    ) -> Result<GeneratedArguments, DebateError> {
        input.validate()?;
        let prompt = prompt::generate_arguments_prompt::<GeneratedArguments>(&self.prompts, input);

        info!(stance = %input.stance, "generating arguments");
        let output: GeneratedArguments = self.submit(&prompt).await?;
        info!(stance = %input.stance, count = output.arguments.len(), "arguments generated");
        Ok(output)
    }

    /// Ask the model for weaknesses and rebuttals of a single argument.
    pub async fn analyze_weaknesses(
        &self,
        input: &AnalyzeWeaknessesInput,
    ) -> Result<AnalysisResult, DebateError> {
        input.validate()?;
        let prompt = prompt::analyze_weaknesses_prompt::<AnalysisResult>(&self.prompts, input);

        info!(side = %input.side, "analyzing argument");
        let output: AnalysisResult = self.submit(&prompt).await?;
        info!(
            weaknesses = output.weaknesses.len(),
            rebuttals = output.rebuttals.len(),
            "analysis complete"
        );
        Ok(output)
    }

    async fn submit<T: OutputSchema>(&self, prompt: &str) -> Result<T, DebateError> {
        debug!(schema = T::NAME, prompt_len = prompt.len(), "submitting prompt");
        let reply = self.provider.complete(prompt).await?;
        T::from_reply(&reply).inspect_err(|e| {
            warn!(schema = T::NAME, error = %e, "model reply rejected");
        })
    }
}
