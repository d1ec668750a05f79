//! Research orchestrator — plan, fan out, grade, iterate, synthesize.

use super::controller::{IterationController, RouteDecision};
use super::planner::ResearchPlanner;
use super::quality::QualityGate;
use super::researcher::Researcher;
use super::state::{NoOpResearchCallback, ResearchCallback, ResearchPhase, ResearchState};
use super::synthesizer::ReportSynthesizer;
use super::types::{FinalReport, ResearchQuery};
use crate::brain::LlmProvider;
use crate::config::{KumakConfig, ResearchConfig};
use crate::error::ResearchError;
use crate::search::SearchProvider;
use crate::structured::{ContentSynthesizer, LlmSynthesizer};
use std::sync::Arc;
use tracing::info;

/// A finished run: the report plus the state that produced it.
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    pub report: FinalReport,
    pub state: ResearchState,
}

/// Runs the deep research pipeline for one topic at a time.
pub struct ResearchOrchestrator {
    planner: ResearchPlanner,
    researcher: Arc<Researcher>,
    quality_gate: QualityGate,
    controller: IterationController,
    synthesizer: ReportSynthesizer,
    callback: Arc<dyn ResearchCallback>,
}

impl ResearchOrchestrator {
    /// Build the pipeline from its two adapters.
    ///
    /// `max_iterations` outside `1..=MAX_RESEARCH_ITERATIONS` is clamped.
    pub fn new(
        config: &ResearchConfig,
        content: Arc<dyn ContentSynthesizer>,
        search: Arc<dyn SearchProvider>,
    ) -> Self {
        let controller = IterationController::new(config.max_iterations);
        Self {
            planner: ResearchPlanner::new(content.clone(), config.planner_temperature),
            researcher: Arc::new(Researcher::new(search, content.clone(), config)),
            quality_gate: QualityGate::new(
                content.clone(),
                config.quality_temperature,
                config.summary_insights,
                controller.max_iterations(),
            ),
            controller,
            synthesizer: ReportSynthesizer::new(content, config.synthesizer_temperature),
            callback: Arc::new(NoOpResearchCallback),
        }
    }

    /// Build the pipeline over an LLM provider, using the retry policy from config.
    pub fn from_config(
        config: &KumakConfig,
        llm: Arc<dyn LlmProvider>,
        search: Arc<dyn SearchProvider>,
    ) -> Self {
        let content: Arc<dyn ContentSynthesizer> =
            Arc::new(LlmSynthesizer::new(llm, config.retry.clone()));
        Self::new(&config.research, content, search)
    }

    pub fn with_callback(mut self, callback: Arc<dyn ResearchCallback>) -> Self {
        self.callback = callback;
        self
    }

    /// Research `topic` and return the final report, or the failure that stopped the run.
    pub async fn run_research(&self, topic: &str) -> Result<FinalReport, ResearchError> {
        self.run(topic).await.map(|outcome| outcome.report)
    }

    /// Like [`run_research`](Self::run_research), but also returns the final state.
    pub async fn run(&self, topic: &str) -> Result<ResearchOutcome, ResearchError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ResearchError::EmptyTopic);
        }
        let mut state = ResearchState::new(topic);
        self.callback.on_phase_change(ResearchPhase::Planning);

        let plan = self.planner.plan(topic).await?;
        let initial = plan.queries.clone();
        state.set_plan(plan);

        let mut batch = initial;
        loop {
            self.enter(&mut state, ResearchPhase::Researching);
            self.research_batch(&mut state, &batch).await;

            self.enter(&mut state, ResearchPhase::QualityCheck);
            let feedback = self.quality_gate.evaluate(&mut state).await;
            self.callback
                .on_quality_verdict(state.iteration_count(), &feedback);

            match self.controller.route(&state) {
                RouteDecision::FollowUp(queries) => {
                    info!(
                        iteration = state.iteration_count(),
                        follow_ups = queries.len(),
                        "Dispatching follow-up research"
                    );
                    batch = queries;
                }
                RouteDecision::Synthesize(reason) => {
                    info!(iteration = state.iteration_count(), %reason, "Research loop finished");
                    break;
                }
            }
        }

        self.enter(&mut state, ResearchPhase::Synthesizing);
        let report = self.synthesizer.synthesize(&state).await?;
        state.set_report(report.clone());
        self.enter(&mut state, ResearchPhase::Complete);

        Ok(ResearchOutcome { report, state })
    }

    async fn research_batch(&self, state: &mut ResearchState, batch: &[ResearchQuery]) {
        state.record_dispatch(batch.len());
        let results = self.researcher.fan_out(state.topic(), batch).await;
        state.extend_results(results);
        info!(
            batch = batch.len(),
            accumulated = state.results().len(),
            "Research batch complete"
        );
        self.callback
            .on_batch_complete(batch.len(), state.results().len());
    }

    fn enter(&self, state: &mut ResearchState, phase: ResearchPhase) {
        state.transition(phase);
        self.callback.on_phase_change(phase);
    }
}
