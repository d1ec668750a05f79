//! Business advisor — the tool-calling conversation layer.
//!
//! The advisor keeps a per-thread [`AdvisorSession`], lets the model call
//! analysis, market research, deep research, and planning tools, and answers
//! the owner once the model stops calling tools.

pub mod agent;
pub mod analysis;
pub mod planning;
pub mod profile;
pub mod session;
pub mod tools;

pub use agent::Advisor;
pub use analysis::AnalysisResult;
pub use planning::{ActionStep, SavingsTactic, StrategicPlan};
pub use profile::BusinessInfo;
pub use session::AdvisorSession;
pub use tools::{AdvisorTool, ToolExecutor, ToolOutput, tool_definitions};
