//! Report synthesizer — reduces all research into the final report.

use super::state::ResearchState;
use super::types::{FinalReport, ResearchResult};
use crate::error::ResearchError;
use crate::structured::{ContentSynthesizer, PromptContext, generate};
use std::sync::Arc;
use tracing::{info, warn};

fn synthesizer_prompt(topic: &str, methodology: &str, data: &str, today: &str) -> String {
    format!(
        "You are a senior analyst who writes high-quality executive reports. Synthesize all of the collected research into one structured, insightful, actionable report.

<topic>
{topic}
</topic>

<methodology>
{methodology}
</methodology>

<research_data>
{data}
</research_data>

<report_specification>
1. Title: clear, specific, professional.
2. Executive summary: 100-150 words with the most critical findings.
3. Detailed analysis: 400-600 words that synthesize rather than list, identify patterns, and cite specific evidence.
4. Key insights: 5-7 unique, actionable points.
5. Recommendations: 3-5 specific, practical actions.
6. Methodology: short description of the research process.
7. Sources summary: quality and relevance of the sources.
</report_specification>

Completion date: {today}"
    )
}

pub struct ReportSynthesizer {
    synthesizer: Arc<dyn ContentSynthesizer>,
    temperature: f32,
}

impl ReportSynthesizer {
    pub fn new(synthesizer: Arc<dyn ContentSynthesizer>, temperature: f32) -> Self {
        Self {
            synthesizer,
            temperature,
        }
    }

    /// Write the final report from every accumulated result. No fallback on failure.
    pub async fn synthesize(&self, state: &ResearchState) -> Result<FinalReport, ResearchError> {
        info!(
            results = state.results().len(),
            iterations = state.iteration_count(),
            "Synthesizing final report"
        );
        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let prompt = synthesizer_prompt(
            state.topic(),
            &methodology(state),
            &research_data(state.results()),
            &today,
        );
        let context = PromptContext::new(prompt, self.temperature);

        let report: FinalReport = generate(self.synthesizer.as_ref(), &context)
            .await
            .map_err(ResearchError::Synthesis)?;

        for warning in report.shape_warnings() {
            warn!(%warning, "Report outside target shape");
        }
        info!(title = %report.title, "Final report ready");
        Ok(report)
    }
}

/// Describe how the research was carried out.
pub fn methodology(state: &ResearchState) -> String {
    let (planned, focus) = state
        .plan()
        .map(|p| (p.queries.len(), p.research_focus.as_str()))
        .unwrap_or((0, ""));
    format!(
        "Research methodology:\n\
         1. Strategic planning with {planned} specialized queries\n\
         2. Advanced web search across {searches} researcher runs\n\
         3. Automated content analysis for insight extraction\n\
         4. {iterations} iteration(s) of research\n\
         5. Quality evaluation and final synthesis\n\
         6. Focus: {focus}",
        searches = state.results().len(),
        iterations = state.iteration_count(),
    )
}

/// The full, untruncated research data handed to the synthesizer.
pub fn research_data(results: &[ResearchResult]) -> String {
    results
        .iter()
        .map(|r| {
            format!(
                "### Research: {}\n**Purpose**: {}\n**Content**: {}\n**Key insights**: {}",
                r.query,
                r.purpose,
                r.content,
                r.key_insights.join("; ")
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
    use crate::error::GenerationError;
    use crate::research::types::{QualityFeedback, ResearchPlan, ResearchQuery};
    use crate::structured::LlmSynthesizer;
    use serde_json::json;

    fn state_with_two_iterations() -> ResearchState {
        let mut state = ResearchState::new("Pizzeria");
        state.set_plan(ResearchPlan {
            queries: vec![
                ResearchQuery::new("a", "p"),
                ResearchQuery::new("b", "p"),
                ResearchQuery::new("c", "p"),
            ],
            research_focus: "Expansion".into(),
        });
        state.extend_results(vec![ResearchResult {
            query: "a".into(),
            purpose: "p".into(),
            content: "- fact".into(),
            key_insights: vec!["i1".into(), "i2".into(), "i3".into(), "i4".into()],
            degraded: false,
        }]);
        state.record_quality_check(QualityFeedback::fail(vec![], vec![]));
        state.record_quality_check(QualityFeedback::pass());
        state
    }

    fn synth(mock: Arc<MockLlmProvider>) -> ReportSynthesizer {
        let retry = RetryConfig {
            max_retries: 0,
            ..RetryConfig::default()
        };
        ReportSynthesizer::new(Arc::new(LlmSynthesizer::new(mock, retry)), 0.1)
    }

    #[test]
    fn test_methodology_mentions_counts() {
        let text = methodology(&state_with_two_iterations());
        assert!(text.contains("3 specialized queries"));
        assert!(text.contains("2 iteration(s)"));
        assert!(text.contains("Focus: Expansion"));
    }

    #[test]
    fn test_research_data_is_untruncated() {
        let data = research_data(state_with_two_iterations().results());
        assert!(data.contains("i1; i2; i3; i4"));
        assert!(data.contains("**Content**: - fact"));
    }

    #[tokio::test]
    async fn test_synthesize_report() {
        let mock = Arc::new(MockLlmProvider::new());
        mock.queue_response(MockLlmProvider::json_response(json!({
            "title": "Pizzeria Expansion Report",
            "executive_summary": "s",
            "detailed_analysis": "a",
            "key_insights": ["k"],
            "recommendations": ["r"],
            "methodology": "m",
            "sources_summary": "src"
        })));
        let report = synth(mock.clone())
            .synthesize(&state_with_two_iterations())
            .await
            .unwrap();
        assert_eq!(report.title, "Pizzeria Expansion Report");

        let prompt = mock.requests()[0].messages[0].content.as_text().unwrap().to_string();
        assert!(prompt.contains("2 iteration(s)"));
        assert!(prompt.contains("i1; i2; i3; i4"));
    }

    #[tokio::test]
    async fn test_placeholder_text_in_research_is_kept_verbatim() {
        let mut state = ResearchState::new("pizza {methodology} {data}");
        state.extend_results(vec![ResearchResult {
            query: "menu trends".into(),
            purpose: "p".into(),
            content: "- {today} template".into(),
            key_insights: vec!["{topic} is a placeholder".into()],
            degraded: false,
        }]);
        state.record_quality_check(QualityFeedback::pass());
        let mock = Arc::new(MockLlmProvider::new());
        mock.queue_response(MockLlmProvider::json_response(json!({
            "title": "t",
            "executive_summary": "s",
            "detailed_analysis": "a",
            "key_insights": ["k"],
            "recommendations": ["r"],
            "methodology": "m",
            "sources_summary": "src"
        })));
        synth(mock.clone()).synthesize(&state).await.unwrap();

        let prompt = mock.requests()[0].messages[0].content.as_text().unwrap().to_string();
        assert!(prompt.contains("<topic>\npizza {methodology} {data}\n</topic>"));
        assert!(prompt.contains("**Content**: - {today} template"));
        assert!(prompt.contains("{topic} is a placeholder"));
        assert_eq!(prompt.matches("Research methodology:").count(), 1);
    }

    #[tokio::test]
    async fn test_synthesis_failure_is_fatal() {
        let mock = Arc::new(MockLlmProvider::new());
        mock.queue_response(MockLlmProvider::json_response(json!({"title": "only a title"})));
        let err = synth(mock)
            .synthesize(&state_with_two_iterations())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResearchError::Synthesis(GenerationError::Malformed { .. })
        ));
    }
}
