//! Iteration controller — decides what follows a quality gate run.

use super::state::ResearchState;
use super::types::{QualityGrade, ResearchQuery};
use crate::config::MAX_RESEARCH_ITERATIONS;
use tracing::warn;

/// Why the pipeline stopped researching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisReason {
    /// The quality gate passed the research.
    Passed,
    /// The gate failed the research but proposed nothing to search for.
    NoFollowUps,
    /// The maximum number of gate runs was reached.
    IterationLimit,
    /// No quality verdict exists yet.
    MissingFeedback,
}

impl std::fmt::Display for SynthesisReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SynthesisReason::Passed => "passed",
            SynthesisReason::NoFollowUps => "no follow-up queries",
            SynthesisReason::IterationLimit => "iteration limit reached",
            SynthesisReason::MissingFeedback => "missing quality feedback",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteDecision {
    /// Dispatch this whole batch of follow-up researchers.
    FollowUp(Vec<ResearchQuery>),
    Synthesize(SynthesisReason),
}

#[derive(Debug, Clone, Copy)]
pub struct IterationController {
    max_iterations: u32,
}

impl IterationController {
    /// The maximum is clamped to `1..=MAX_RESEARCH_ITERATIONS`.
    pub fn new(max_iterations: u32) -> Self {
        let clamped = max_iterations.clamp(1, MAX_RESEARCH_ITERATIONS);
        if clamped != max_iterations {
            warn!(
                requested = max_iterations,
                using = clamped,
                "Research iteration limit out of range"
            );
        }
        Self {
            max_iterations: clamped,
        }
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Follow up iff the grade is fail, the counter is below the maximum, and
    /// the gate proposed at least one query.
    pub fn route(&self, state: &ResearchState) -> RouteDecision {
        let Some(feedback) = state.quality_check() else {
            return RouteDecision::Synthesize(SynthesisReason::MissingFeedback);
        };
        if feedback.grade == QualityGrade::Pass {
            return RouteDecision::Synthesize(SynthesisReason::Passed);
        }
        if state.iteration_count() >= self.max_iterations {
            return RouteDecision::Synthesize(SynthesisReason::IterationLimit);
        }
        if feedback.follow_up_queries.is_empty() {
            return RouteDecision::Synthesize(SynthesisReason::NoFollowUps);
        }
        RouteDecision::FollowUp(feedback.follow_up_queries.clone())
    }
}
