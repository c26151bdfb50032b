// Henhouse Core Library
// Budget-bounded, tool-augmented LLM research runs

pub mod config;
pub mod dedup;
pub mod embedding;
pub mod engine;
pub mod extract;
pub mod llm;
pub mod records;
pub mod runner;
pub mod similarity;
pub mod store;
pub mod telemetry;
pub mod tools;
pub mod validate;
pub mod workflow;

// Export core types
pub use config::{AgentConfig, AgentStatus};
pub use dedup::{DuplicateCheck, DuplicateDetector, EmbeddingProvider, SimilarityMatch};
pub use engine::{ConversationEngine, RunSummary, ToolCallBudget};
pub use extract::extract_payload;
pub use llm::{ChatModel, LlmClient, LlmClientConfig, ModelReply, ToolInvocation};
pub use records::{Breed, BreedResearchRecord, FactRecord, RunOutcome};
pub use runner::{BreedResearchRunner, FactResearchRunner};
pub use similarity::cosine_similarity;
pub use store::{BreedCatalog, FactLog, ResearchLog};
pub use tools::{ToolKind, Toolbox};
pub use validate::{AnswerShape, AnswerValidator, Verdict};
pub use workflow::Workflow;

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Client unavailable: {0}")]
    ClientUnavailable(String),

    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, Error>;
