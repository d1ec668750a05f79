//! Advisor conversations driven by a scripted model.

use async_trait::async_trait;
use kumak_core::advisor::{Advisor, AdvisorSession};
use kumak_core::brain::MockLlmProvider;
use kumak_core::config::KumakConfig;
use kumak_core::error::{AdvisorError, GenerationError, LlmError, SearchError};
use kumak_core::research::ResearchOrchestrator;
use kumak_core::search::{SearchHit, SearchProvider};
use kumak_core::structured::{ContentSynthesizer, PromptContext};
use kumak_core::types::{Content, ResponseFormat, Role};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

/// Tool-side generation, routed by schema name.
#[derive(Default)]
struct ToolSynthesizer {
    prompts: Mutex<Vec<(String, PromptContext)>>,
}

#[async_trait]
impl ContentSynthesizer for ToolSynthesizer {
    async fn generate_value(
        &self,
        context: &PromptContext,
        format: &ResponseFormat,
    ) -> Result<Value, GenerationError> {
        self.prompts
            .lock()
            .unwrap()
            .push((format.name.clone(), context.clone()));
        match format.name.as_str() {
            "analysis_result" => Ok(json!({
                "business_info_update": {
                    "business_name": "Luigi's",
                    "industry": "Restaurant",
                    "employee_count": 6
                },
                "key_insights_for_memory": ["Sauce recipe is the main differentiator"],
                "next_topic_to_discuss": "Clarify the monthly ingredient spend"
            })),
            "strategic_plan" => Ok(json!({
                "initiative_name": "Local ingredients line",
                "action_plan": [
                    {"step_number": 1, "title": "Find farms", "description": "Visit three farms",
                     "estimated_cost_usd": 0.0, "estimated_timeline_days": 14},
                    {"step_number": 2, "title": "Menu test", "description": "Two-week trial",
                     "estimated_cost_usd": 600.0, "estimated_timeline_days": 14}
                ],
                "savings_plan": [
                    {"tactic": "Cut dough waste", "estimated_monthly_savings_usd": 300.0,
                     "implementation_notes": "Prep to forecast"}
                ],
                "summary": "Two months of savings fund the trial."
            })),
            "research_plan" => Ok(json!({
                "queries": [
                    {"search_query": "farm to table demand", "purpose": "demand"},
                    {"search_query": "local cheese prices", "purpose": "costs"},
                    {"search_query": "competitor menus", "purpose": "competition"}
                ],
                "research_focus": "local sourcing"
            })),
            "extracted_insights" => Ok(json!({"key_insights": ["Customers pay more for local"]})),
            "quality_feedback" => Ok(json!({"grade": "pass"})),
            "final_report" => Ok(json!({
                "title": "Local Sourcing for Pizzerias",
                "executive_summary": "Local sourcing is viable.",
                "detailed_analysis": "Analysis.",
                "key_insights": ["Customers pay more for local"],
                "recommendations": ["Start with cheese"],
                "methodology": "Three queries, one iteration.",
                "sources_summary": "Web results."
            })),
            other => Err(GenerationError::Malformed {
                schema: other.to_string(),
                message: "unscripted".into(),
            }),
        }
    }
}

struct FixedSearch {
    fail: bool,
}

#[async_trait]
impl SearchProvider for FixedSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        if self.fail {
            return Err(SearchError::Network {
                message: "offline".into(),
            });
        }
        Ok((1..=max_results.min(2))
            .map(|i| SearchHit::new(format!("{query} finding {i}")))
            .collect())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

fn advisor(mock: Arc<MockLlmProvider>, search_fails: bool) -> (Advisor, Arc<ToolSynthesizer>) {
    let mut config = KumakConfig::default();
    config.retry.max_retries = 0;
    config.advisor.max_tool_rounds = 3;
    let content = Arc::new(ToolSynthesizer::default());
    let search = Arc::new(FixedSearch { fail: search_fails });
    let research = Arc::new(ResearchOrchestrator::new(
        &config.research,
        content.clone(),
        search.clone(),
    ));
    let advisor = Advisor::new(&config, mock, content.clone(), search, research);
    (advisor, content)
}

fn tool_results(session: &AdvisorSession) -> Vec<(String, bool)> {
    session
        .messages
        .iter()
        .filter_map(|m| match &m.content {
            Content::ToolResult { output, is_error, .. } => Some((output.clone(), *is_error)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn plain_reply_without_tools() {
    let mock = Arc::new(MockLlmProvider::new());
    mock.queue_response(MockLlmProvider::text_response("Tell me about your business."));
    let (advisor, _) = advisor(mock.clone(), false);
    let mut session = AdvisorSession::new();

    let reply = advisor.handle_message(&mut session, "Hi").await.unwrap();

    assert_eq!(reply, "Tell me about your business.");
    assert_eq!(session.messages.len(), 2);
    let request = &mock.requests()[0];
    assert_eq!(request.messages[0].role, Role::System);
    assert_eq!(request.tools.as_ref().map(Vec::len), Some(4));
}

#[tokio::test]
async fn analysis_updates_profile_and_memory() {
    let mock = Arc::new(MockLlmProvider::new());
    mock.queue_response(MockLlmProvider::tool_call_response(
        "analyze_and_synthesize",
        json!({}),
    ));
    mock.queue_response(MockLlmProvider::text_response("What do you spend on ingredients?"));
    let (advisor, content) = advisor(mock.clone(), false);
    let mut session = AdvisorSession::new();

    let reply = advisor
        .handle_message(&mut session, "I run Luigi's, a pizzeria with 6 staff")
        .await
        .unwrap();

    assert_eq!(reply, "What do you spend on ingredients?");
    assert_eq!(session.business_info.business_name.as_deref(), Some("Luigi's"));
    assert_eq!(session.business_info.employee_count, Some(6));
    assert_eq!(
        session.long_term_memory,
        vec!["Sauce recipe is the main differentiator"]
    );
    let results = tool_results(&session);
    assert_eq!(
        results,
        vec![(
            "Analysis complete. Suggested next topic: Clarify the monthly ingredient spend.".to_string(),
            false
        )]
    );

    // The analysis saw the user's message; the second model call saw the new profile.
    let prompts = content.prompts.lock().unwrap();
    assert!(prompts[0].1.user.as_deref().unwrap().contains("user: I run Luigi's"));
    let second = &mock.requests()[1];
    let system = second.messages[0].content.as_text().unwrap();
    assert!(system.contains("\"business_name\":\"Luigi's\""));
    assert!(system.contains("- Sauce recipe is the main differentiator"));
}

#[tokio::test]
async fn plan_tool_stores_current_plan() {
    let mock = Arc::new(MockLlmProvider::new());
    mock.queue_response(MockLlmProvider::tool_call_response(
        "create_action_and_savings_plan",
        json!({"initiative_summary": "Switch to local ingredients"}),
    ));
    mock.queue_response(MockLlmProvider::text_response("Here is your plan."));
    let (advisor, _) = advisor(mock, false);
    let mut session = AdvisorSession::new();

    advisor
        .handle_message(&mut session, "Yes, let's plan it")
        .await
        .unwrap();

    let plan = session.current_plan.as_ref().unwrap();
    assert_eq!(plan.initiative_name, "Local ingredients line");
    assert_eq!(plan.months_to_fund(), Some(2.0));
    let (output, is_error) = &tool_results(&session)[0];
    assert!(!is_error);
    assert!(output.starts_with("Action and savings plan created:"));
}

#[tokio::test]
async fn market_research_returns_bullets() {
    let mock = Arc::new(MockLlmProvider::new());
    mock.queue_response(MockLlmProvider::tool_call_response(
        "perform_market_research",
        json!({"query": "pizza trends 2026"}),
    ));
    mock.queue_response(MockLlmProvider::text_response("Trends look good."));
    let (advisor, _) = advisor(mock, false);
    let mut session = AdvisorSession::new();

    advisor.handle_message(&mut session, "Trends?").await.unwrap();

    let (output, is_error) = &tool_results(&session)[0];
    assert!(!is_error);
    assert_eq!(
        output,
        "Market research results for 'pizza trends 2026':\n- pizza trends 2026 finding 1\n- pizza trends 2026 finding 2"
    );
}

#[tokio::test]
async fn tool_failures_are_reported_to_the_model() {
    let mock = Arc::new(MockLlmProvider::new());
    mock.queue_response(MockLlmProvider::tool_call_response(
        "perform_market_research",
        json!({"query": "pizza trends"}),
    ));
    mock.queue_response(MockLlmProvider::tool_call_response("order_pizza", json!({})));
    mock.queue_response(MockLlmProvider::text_response("Sorry, research is down."));
    let (advisor, _) = advisor(mock, true);
    let mut session = AdvisorSession::new();

    let reply = advisor.handle_message(&mut session, "Trends?").await.unwrap();

    assert_eq!(reply, "Sorry, research is down.");
    assert_eq!(
        tool_results(&session),
        vec![
            ("Error performing market research.".to_string(), true),
            ("Unknown tool: order_pizza".to_string(), true),
        ]
    );
}

#[tokio::test]
async fn deep_research_returns_report_markdown() {
    let mock = Arc::new(MockLlmProvider::new());
    mock.queue_response(MockLlmProvider::tool_call_response(
        "deep_research",
        json!({"topic": "Local sourcing for pizzerias"}),
    ));
    mock.queue_response(MockLlmProvider::text_response("The report is ready."));
    let (advisor, _) = advisor(mock, false);
    let mut session = AdvisorSession::new();

    advisor
        .handle_message(&mut session, "Research local sourcing")
        .await
        .unwrap();

    let (output, is_error) = &tool_results(&session)[0];
    assert!(!is_error);
    assert!(output.starts_with("# Local Sourcing for Pizzerias"));
    assert!(output.contains("1. Start with cheese"));
}

#[tokio::test]
async fn tool_round_limit_is_enforced() {
    let mock = Arc::new(MockLlmProvider::new());
    for _ in 0..3 {
        mock.queue_response(MockLlmProvider::tool_call_response(
            "perform_market_research",
            json!({"query": "again"}),
        ));
    }
    let (advisor, _) = advisor(mock.clone(), false);
    let mut session = AdvisorSession::new();

    let err = advisor
        .handle_message(&mut session, "Loop forever")
        .await
        .unwrap_err();

    assert!(matches!(err, AdvisorError::MaxToolRounds { max: 3 }));
    assert_eq!(mock.requests().len(), 3);
    assert_eq!(tool_results(&session).len(), 3);
}

#[tokio::test]
async fn provider_errors_propagate() {
    let mock = Arc::new(MockLlmProvider::new());
    mock.queue_error(LlmError::AuthFailed {
        provider: "openai".into(),
    });
    let (advisor, _) = advisor(mock, false);
    let mut session = AdvisorSession::new();

    let err = advisor.handle_message(&mut session, "Hello").await.unwrap_err();
    assert!(matches!(err, AdvisorError::Provider(LlmError::AuthFailed { .. })));
    assert!(session.messages.is_empty());
}

#[tokio::test]
async fn failed_turn_leaves_earlier_history_intact() {
    let mock = Arc::new(MockLlmProvider::new());
    mock.queue_response(MockLlmProvider::text_response("Tell me about your business."));
    mock.queue_error(LlmError::AuthFailed {
        provider: "openai".into(),
    });
    let (advisor, _) = advisor(mock.clone(), false);
    let mut session = AdvisorSession::new();

    advisor.handle_message(&mut session, "Hello").await.unwrap();
    assert!(advisor.handle_message(&mut session, "I run a pizzeria").await.is_err());

    assert_eq!(session.messages.len(), 2);
    assert_eq!(session.messages[0].role, Role::User);
    assert_eq!(session.messages[1].role, Role::Assistant);
    assert_eq!(
        session.messages[1].content.joined_text(),
        "Tell me about your business."
    );
}

#[tokio::test]
async fn empty_message_is_rejected() {
    let mock = Arc::new(MockLlmProvider::new());
    let (advisor, _) = advisor(mock.clone(), false);
    let mut session = AdvisorSession::new();

    let err = advisor.handle_message(&mut session, "  ").await.unwrap_err();
    assert!(matches!(err, AdvisorError::EmptyMessage));
    assert!(session.messages.is_empty());
    assert!(mock.requests().is_empty());
}
