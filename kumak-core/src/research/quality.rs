//! Quality gate — grades the accumulated research.

use super::state::ResearchState;
use super::types::{QualityFeedback, ResearchResult};
use crate::structured::{ContentSynthesizer, PromptContext, generate};
use std::sync::Arc;
use tracing::{info, warn};

fn quality_prompt(topic: &str, summary: &str, iteration: u32, max: u32) -> String {
    format!(
        "You are a research quality reviewer. Decide whether the research so far is enough to write a complete, high-quality report.

<topic>
{topic}
</topic>

<current_research>
{summary}
</current_research>

<criteria>
The research PASSES only if it meets all of these:
1. Completeness: covers every important aspect of the topic.
2. Depth: enough detail for sound conclusions.
3. Source diversity: varied perspectives and reliable sources.
4. Recency: information is current and relevant.
5. Actionability: supports practical recommendations.
</criteria>

<task>
- If every criterion passes, grade \"pass\".
- If any criterion fails, grade \"fail\" and list the missing aspects and follow-up queries that address them.
</task>

Current iteration: {iteration} of at most {max}."
    )
}

pub struct QualityGate {
    synthesizer: Arc<dyn ContentSynthesizer>,
    temperature: f32,
    summary_insights: usize,
    max_iterations: u32,
}

impl QualityGate {
    pub fn new(
        synthesizer: Arc<dyn ContentSynthesizer>,
        temperature: f32,
        summary_insights: usize,
        max_iterations: u32,
    ) -> Self {
        Self {
            synthesizer,
            temperature,
            summary_insights,
            max_iterations,
        }
    }

    /// Grade the research, store the verdict, and bump the iteration counter.
    ///
    /// A failed call counts as a pass with no follow-ups.
    pub async fn evaluate(&self, state: &mut ResearchState) -> QualityFeedback {
        let iteration = state.iteration_count() + 1;
        info!(iteration, results = state.results().len(), "Evaluating research quality");

        let summary = research_summary(state.results(), self.summary_insights);
        let prompt = quality_prompt(state.topic(), &summary, iteration, self.max_iterations);
        let context = PromptContext::new(prompt, self.temperature);

        let feedback = match generate::<QualityFeedback>(self.synthesizer.as_ref(), &context).await
        {
            Ok(feedback) => feedback,
            Err(e) => {
                warn!(error = %e, "Quality gate failed; treating research as sufficient");
                QualityFeedback::pass()
            }
        };
        info!(
            iteration,
            grade = %feedback.grade,
            follow_ups = feedback.follow_up_queries.len(),
            "Quality verdict"
        );
        state.record_quality_check(feedback.clone());
        feedback
    }
}

/// Summary view for the gate: each result's insights cut to the first `max_insights`.
pub fn research_summary(results: &[ResearchResult], max_insights: usize) -> String {
    results
        .iter()
        .map(|r| {
            let insights: Vec<&str> = r
                .key_insights
                .iter()
                .take(max_insights)
                .map(String::as_str)
                .collect();
            format!(
                "**Query**: {}\n**Purpose**: {}\n**Insights**: {}",
                r.query,
                r.purpose,
                insights.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use crate::config::RetryConfig;
    use crate::error::LlmError;
    use crate::research::types::QualityGrade;
    use crate::structured::LlmSynthesizer;
    use serde_json::json;

    fn gate(mock: Arc<MockLlmProvider>) -> QualityGate {
        let retry = RetryConfig {
            max_retries: 0,
            ..RetryConfig::default()
        };
        QualityGate::new(Arc::new(LlmSynthesizer::new(mock, retry)), 0.0, 3, 3)
    }

    fn result_with_insights(n: usize) -> ResearchResult {
        ResearchResult {
            query: "q".into(),
            purpose: "p".into(),
            content: "full content".into(),
            key_insights: (1..=n).map(|i| format!("insight {i}")).collect(),
            degraded: false,
        }
    }

    #[test]
    fn test_summary_truncates_insights_only_in_view() {
        let results = vec![result_with_insights(5)];
        let summary = research_summary(&results, 3);
        assert!(summary.contains("insight 1, insight 2, insight 3"));
        assert!(!summary.contains("insight 4"));
        assert!(!summary.contains("full content"));
        assert_eq!(results[0].key_insights.len(), 5);
    }

    #[tokio::test]
    async fn test_evaluate_records_fail_verdict() {
        let mock = Arc::new(MockLlmProvider::new());
        mock.queue_response(MockLlmProvider::json_response(json!({
            "grade": "fail",
            "missing_aspects": ["competitor pricing"],
            "follow_up_queries": [{"search_query": "pizza prices downtown", "purpose": "pricing"}]
        })));
        let mut state = ResearchState::new("Pizzeria");
        state.extend_results(vec![result_with_insights(4)]);

        let feedback = gate(mock.clone()).evaluate(&mut state).await;
        assert_eq!(feedback.grade, QualityGrade::Fail);
        assert_eq!(state.iteration_count(), 1);
        assert_eq!(state.quality_check(), Some(&feedback));

        let prompt = mock.requests()[0].messages[0].content.as_text().unwrap().to_string();
        assert!(prompt.contains("Current iteration: 1 of at most 3."));
    }

    #[tokio::test]
    async fn test_topic_with_placeholder_text_is_not_expanded() {
        let mock = Arc::new(MockLlmProvider::new());
        mock.queue_response(MockLlmProvider::json_response(json!({"grade": "pass"})));
        let mut state = ResearchState::new("pizza {summary} {max}");
        state.extend_results(vec![result_with_insights(2)]);

        gate(mock.clone()).evaluate(&mut state).await;

        let prompt = mock.requests()[0].messages[0].content.as_text().unwrap().to_string();
        assert!(prompt.contains("<topic>\npizza {summary} {max}\n</topic>"));
        assert_eq!(prompt.matches("insight 1").count(), 1);
    }

    #[tokio::test]
    async fn test_evaluate_failure_degrades_to_pass() {
        let mock = Arc::new(MockLlmProvider::new());
        mock.queue_error(LlmError::AuthFailed {
            provider: "test".into(),
        });
        let mut state = ResearchState::new("t");
        let feedback = gate(mock).evaluate(&mut state).await;
        assert_eq!(feedback, QualityFeedback::pass());
        assert_eq!(state.iteration_count(), 1);
    }
}
