//! Research planner — turns a topic into a batch of search queries.

use super::types::ResearchPlan;
use crate::error::ResearchError;
use crate::structured::{ContentSynthesizer, PromptContext, generate};
use std::sync::Arc;
use tracing::{info, warn};

fn planner_prompt(topic: &str, today: &str) -> String {
    format!(
        "You are an expert research planner who designs deep, structured research strategies.

<research_objective>
{topic}
</research_objective>

<task>
Produce a strategic research plan with:

1. Strategic search queries: 3-5 specific, complementary queries that
   - cover the topic from different angles,
   - are specific enough to surface high-quality sources,
   - avoid redundancy (not both \"benefits of X\" and \"advantages of X\"),
   - avoid details that may be outdated unless they are specifically relevant.

2. Research focus: which aspects of the topic will be investigated and why.

Good queries: \"independent pizzeria delivery margins 2025 third-party apps\",
\"small restaurant expansion financing options SBA loans\".
Avoid vague queries like \"pizza\".
</task>

Today's date: {today}"
    )
}

pub struct ResearchPlanner {
    synthesizer: Arc<dyn ContentSynthesizer>,
    temperature: f32,
}

impl ResearchPlanner {
    pub fn new(synthesizer: Arc<dyn ContentSynthesizer>, temperature: f32) -> Self {
        Self {
            synthesizer,
            temperature,
        }
    }

    /// Produce the research plan. Any failure here ends the run.
    pub async fn plan(&self, topic: &str) -> Result<ResearchPlan, ResearchError> {
        info!(topic, "Planning research");
        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let prompt = planner_prompt(topic, &today);
        let context = PromptContext::new(prompt, self.temperature);

        let plan: ResearchPlan = generate(self.synthesizer.as_ref(), &context)
            .await
            .map_err(ResearchError::Planning)?;

        if plan.queries.is_empty() {
            return Err(ResearchError::EmptyPlan {
                topic: topic.to_string(),
            });
        }
        if !(3..=5).contains(&plan.queries.len()) {
            warn!(
                count = plan.queries.len(),
                "Research plan is outside the 3-5 query range; using it as is"
            );
        }
        info!(queries = plan.queries.len(), focus = %plan.research_focus, "Research plan ready");
        Ok(plan)
    }
}
