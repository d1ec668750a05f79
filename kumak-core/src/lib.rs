//! # Kumak Core
//!
//! Core library for Kumak, an AI consultant for small businesses.
//! Provides the LLM interface (brain), schema-constrained generation, web
//! search backends, the deep research pipeline, the business advisor,
//! configuration, and fundamental types.

pub mod advisor;
pub mod brain;
pub mod config;
pub mod error;
pub mod providers;
pub mod research;
pub mod search;
pub mod structured;
pub mod types;

// Re-export commonly used types at the crate root.
pub use advisor::{Advisor, AdvisorSession, BusinessInfo, StrategicPlan};
pub use brain::{LlmProvider, MockLlmProvider};
pub use config::{KumakConfig, load_config};
pub use error::{KumakError, Result};
pub use providers::create_provider;
pub use research::{FinalReport, ResearchOrchestrator, ResearchPhase};
pub use search::{SearchHit, SearchProvider, create_search_provider};
pub use structured::{ContentSynthesizer, LlmSynthesizer, PromptContext, StructuredOutput};
pub use types::{CompletionRequest, CompletionResponse, Content, Message, Role, TokenUsage};
