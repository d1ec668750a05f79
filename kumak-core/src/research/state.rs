//! Research state — the aggregate owned by one orchestrator run.

use super::types::{FinalReport, QualityFeedback, ResearchPlan, ResearchResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Phase of a research run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchPhase {
    Planning,
    Researching,
    QualityCheck,
    Synthesizing,
    Complete,
}

impl ResearchPhase {
    /// Whether `next` is a legal successor of this phase.
    pub fn can_transition_to(self, next: ResearchPhase) -> bool {
        use ResearchPhase::*;
        matches!(
            (self, next),
            (Planning, Researching)
                | (Researching, QualityCheck)
                | (QualityCheck, Researching)
                | (QualityCheck, Synthesizing)
                | (Synthesizing, Complete)
        )
    }
}

impl std::fmt::Display for ResearchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResearchPhase::Planning => "planning",
            ResearchPhase::Researching => "researching",
            ResearchPhase::QualityCheck => "quality_check",
            ResearchPhase::Synthesizing => "synthesizing",
            ResearchPhase::Complete => "complete",
        };
        write!(f, "{}", name)
    }
}

/// Observer for research progress (CLI spinners, logs).
pub trait ResearchCallback: Send + Sync {
    /// Called when the run enters a new phase.
    fn on_phase_change(&self, _phase: ResearchPhase) {}
    /// Called after each fan-in with the batch size and the new accumulated total.
    fn on_batch_complete(&self, _batch_size: usize, _accumulated: usize) {}
    /// Called after each quality gate run.
    fn on_quality_verdict(&self, _iteration: u32, _feedback: &QualityFeedback) {}
}

/// Callback that ignores every event.
pub struct NoOpResearchCallback;

impl ResearchCallback for NoOpResearchCallback {}

/// Everything known about one research run.
///
/// Results are append-only and the iteration counter only moves through
/// [`ResearchState::record_quality_check`].
#[derive(Debug, Clone, Serialize)]
pub struct ResearchState {
    topic: String,
    plan: Option<ResearchPlan>,
    results: Vec<ResearchResult>,
    quality_check: Option<QualityFeedback>,
    iteration_count: u32,
    researchers_dispatched: usize,
    report: Option<FinalReport>,
    phase: ResearchPhase,
}

impl ResearchState {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            plan: None,
            results: Vec::new(),
            quality_check: None,
            iteration_count: 0,
            researchers_dispatched: 0,
            report: None,
            phase: ResearchPhase::Planning,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn plan(&self) -> Option<&ResearchPlan> {
        self.plan.as_ref()
    }

    pub fn results(&self) -> &[ResearchResult] {
        &self.results
    }

    pub fn quality_check(&self) -> Option<&QualityFeedback> {
        self.quality_check.as_ref()
    }

    pub fn iteration_count(&self) -> u32 {
        self.iteration_count
    }

    pub fn researchers_dispatched(&self) -> usize {
        self.researchers_dispatched
    }

    pub fn report(&self) -> Option<&FinalReport> {
        self.report.as_ref()
    }

    pub fn phase(&self) -> ResearchPhase {
        self.phase
    }

    pub fn set_plan(&mut self, plan: ResearchPlan) {
        self.plan = Some(plan);
    }

    /// Note that `count` researchers have been launched for the next batch.
    pub fn record_dispatch(&mut self, count: usize) {
        self.researchers_dispatched += count;
    }

    /// Fan-in: append a completed batch. Never replaces existing results.
    pub fn extend_results(&mut self, batch: Vec<ResearchResult>) {
        self.results.extend(batch);
    }

    /// Store the newest quality verdict and bump the iteration counter.
    /// Returns the new iteration count.
    pub fn record_quality_check(&mut self, feedback: QualityFeedback) -> u32 {
        self.quality_check = Some(feedback);
        self.iteration_count += 1;
        self.iteration_count
    }

    pub fn set_report(&mut self, report: FinalReport) {
        self.report = Some(report);
    }

    /// Move to `next`. Illegal transitions are logged and applied anyway.
    pub fn transition(&mut self, next: ResearchPhase) {
        if !self.phase.can_transition_to(next) {
            tracing::warn!(from = %self.phase, to = %next, "Unexpected research phase transition");
        }
        debug!(from = %self.phase, to = %next, "Research phase transition");
        self.phase = next;
    }
}
