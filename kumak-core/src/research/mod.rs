//! Deep research pipeline.
//!
//! Given a topic, the orchestrator runs:
//! 1. **Plan** — decompose the topic into 3-5 complementary search queries
//! 2. **Research** — one researcher task per query, run in parallel, results accumulated
//! 3. **Quality check** — grade the accumulated research; on fail, propose follow-ups
//! 4. **Iterate** — dispatch follow-up researchers, at most `max_iterations` gate runs in total
//! 5. **Synthesize** — reduce everything into a structured executive report

pub mod controller;
pub mod engine;
pub mod planner;
pub mod quality;
pub mod researcher;
pub mod state;
pub mod synthesizer;
pub mod types;

pub use controller::{IterationController, RouteDecision, SynthesisReason};
pub use engine::{ResearchOrchestrator, ResearchOutcome};
pub use planner::ResearchPlanner;
pub use quality::QualityGate;
pub use researcher::Researcher;
pub use state::{NoOpResearchCallback, ResearchCallback, ResearchPhase, ResearchState};
pub use synthesizer::ReportSynthesizer;
pub use types::{
    ExtractedInsights, FinalReport, QualityFeedback, QualityGrade, RESEARCH_FAILURE_INSIGHT,
    ResearchPlan, ResearchQuery, ResearchResult,
};
