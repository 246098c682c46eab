//! DebateDuel Core Library
//!
//! Prompt construction, schema validation and session state for a debate
//! practice tool backed by an OpenAI-compatible language model.

pub mod config;
pub mod error;
pub mod flows;
pub mod prompt;
pub mod provider;
pub mod schema;
pub mod session;
pub mod stance;

pub use config::{Config, ModelConfig, PromptsConfig, SendersConfig};
pub use error::DebateError;
pub use flows::DebateFlows;
pub use provider::{ModelProvider, OpenAIProvider, ProviderSettings};
pub use schema::{AnalysisResult, AnalyzeWeaknessesInput, GenerateArgumentsInput, GeneratedArguments};
pub use session::{ChatMessage, DebateSession, Notice, Outcome, SessionEvent, SessionState};
pub use stance::Stance;
