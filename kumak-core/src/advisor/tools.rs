//! Tools the advisor model can call.
//!
//! Tool failures never abort a turn: they come back to the model as error
//! tool results so it can apologise or try something else.

use super::analysis::AnalysisResult;
use super::planning::StrategicPlan;
use super::session::AdvisorSession;
use crate::config::AdvisorConfig;
use crate::research::ResearchOrchestrator;
use crate::search::{SearchProvider, hits_to_bullets};
use crate::structured::{ContentSynthesizer, PromptContext, generate};
use crate::types::ToolDefinition;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvisorTool {
    AnalyzeAndSynthesize,
    PerformMarketResearch,
    DeepResearch,
    CreateActionAndSavingsPlan,
}

impl AdvisorTool {
    pub const ALL: [AdvisorTool; 4] = [
        AdvisorTool::AnalyzeAndSynthesize,
        AdvisorTool::PerformMarketResearch,
        AdvisorTool::DeepResearch,
        AdvisorTool::CreateActionAndSavingsPlan,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AdvisorTool::AnalyzeAndSynthesize => "analyze_and_synthesize",
            AdvisorTool::PerformMarketResearch => "perform_market_research",
            AdvisorTool::DeepResearch => "deep_research",
            AdvisorTool::CreateActionAndSavingsPlan => "create_action_and_savings_plan",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            AdvisorTool::AnalyzeAndSynthesize => {
                "Analyze the conversation: extract business facts, record key insights, \
                 and suggest the next topic to discuss."
            }
            AdvisorTool::PerformMarketResearch => {
                "Quick web search for market data: industry trends, competitors, \
                 opportunities, or any external fact relevant to the business."
            }
            AdvisorTool::DeepResearch => {
                "Run a multi-step deep research process on a topic and return an \
                 executive report. Slow; use when the owner needs a thorough analysis."
            }
            AdvisorTool::CreateActionAndSavingsPlan => {
                "Turn a validated initiative into a step-by-step action plan with a \
                 savings plan that funds it. Use once the owner agrees on an idea."
            }
        }
    }

    pub fn parameters_schema(self) -> Value {
        let string_param = |name: &str, description: &str| {
            let mut properties = serde_json::Map::new();
            properties.insert(
                name.to_string(),
                json!({ "type": "string", "description": description }),
            );
            json!({
                "type": "object",
                "properties": properties,
                "required": [name],
            })
        };
        match self {
            AdvisorTool::AnalyzeAndSynthesize => json!({ "type": "object", "properties": {} }),
            AdvisorTool::PerformMarketResearch => string_param("query", "The web search query"),
            AdvisorTool::DeepResearch => string_param("topic", "The topic to research in depth"),
            AdvisorTool::CreateActionAndSavingsPlan => {
                string_param("initiative_summary", "Summary of the initiative to plan")
            }
        }
    }

    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Definitions for every advisor tool, in a stable order.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    AdvisorTool::ALL.into_iter().map(AdvisorTool::definition).collect()
}

/// Result of one tool execution, fed back to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

#[derive(Deserialize)]
struct MarketResearchArgs {
    query: String,
}

#[derive(Deserialize)]
struct DeepResearchArgs {
    topic: String,
}

#[derive(Deserialize)]
struct PlanArgs {
    initiative_summary: String,
}

/// Executes advisor tools against a session.
pub struct ToolExecutor {
    content: Arc<dyn ContentSynthesizer>,
    search: Arc<dyn SearchProvider>,
    research: Arc<ResearchOrchestrator>,
    market_research_results: usize,
    planning_temperature: f32,
}

impl ToolExecutor {
    pub fn new(
        content: Arc<dyn ContentSynthesizer>,
        search: Arc<dyn SearchProvider>,
        research: Arc<ResearchOrchestrator>,
        config: &AdvisorConfig,
    ) -> Self {
        Self {
            content,
            search,
            research,
            market_research_results: config.market_research_results,
            planning_temperature: config.planning_temperature,
        }
    }

    /// Run the named tool. Unknown names and bad arguments become error outputs.
    pub async fn execute(
        &self,
        session: &mut AdvisorSession,
        name: &str,
        arguments: &Value,
    ) -> ToolOutput {
        let Some(tool) = AdvisorTool::from_name(name) else {
            warn!(tool = name, "Model requested an unknown tool");
            return ToolOutput::error(format!("Unknown tool: {}", name));
        };
        info!(tool = name, thread_id = %session.thread_id, "Executing tool");

        match tool {
            AdvisorTool::AnalyzeAndSynthesize => self.analyze(session).await,
            AdvisorTool::PerformMarketResearch => {
                match parse_args::<MarketResearchArgs>(name, arguments) {
                    Ok(args) => self.market_research(&args.query).await,
                    Err(output) => output,
                }
            }
            AdvisorTool::DeepResearch => match parse_args::<DeepResearchArgs>(name, arguments) {
                Ok(args) => self.deep_research(&args.topic).await,
                Err(output) => output,
            },
            AdvisorTool::CreateActionAndSavingsPlan => {
                match parse_args::<PlanArgs>(name, arguments) {
                    Ok(args) => self.create_plan(session, &args.initiative_summary).await,
                    Err(output) => output,
                }
            }
        }
    }

    async fn analyze(&self, session: &mut AdvisorSession) -> ToolOutput {
        let context = PromptContext::new(
            "You are an expert conversation analyst. Process the conversation into a structured synthesis:\n\
             1. business_info_update: new or corrected business facts from the latest user message (null if none).\n\
             2. key_insights_for_memory: fundamental truths about the business worth remembering (null if none).\n\
             3. next_topic_to_discuss: the NEXT strategic topic to explore. A topic, not a question, \
             e.g. \"Clarify what makes the sauce unique\". Null if nothing more is needed.",
            0.0,
        )
        .with_user(format!(
            "Current business info: {}\n\nConversation history:\n{}",
            session.business_info.to_prompt_json(),
            session.transcript()
        ));

        match generate::<AnalysisResult>(self.content.as_ref(), &context).await {
            Ok(analysis) => {
                if let Some(update) = analysis.business_info_update {
                    session.business_info.merge(update);
                }
                if let Some(insights) = analysis.key_insights_for_memory {
                    session.remember(insights);
                }
                let next = analysis
                    .next_topic_to_discuss
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| "None".to_string());
                ToolOutput::text(format!("Analysis complete. Suggested next topic: {}.", next))
            }
            Err(e) => {
                warn!(error = %e, "Conversation analysis failed");
                ToolOutput::error("Error during analysis.")
            }
        }
    }

    async fn market_research(&self, query: &str) -> ToolOutput {
        match self.search.search(query, self.market_research_results).await {
            Ok(hits) => ToolOutput::text(format!(
                "Market research results for '{}':\n{}",
                query,
                hits_to_bullets(&hits)
            )),
            Err(e) => {
                warn!(query, error = %e, "Market research search failed");
                ToolOutput::error("Error performing market research.")
            }
        }
    }

    async fn deep_research(&self, topic: &str) -> ToolOutput {
        match self.research.run_research(topic).await {
            Ok(report) => ToolOutput::text(report.to_markdown()),
            Err(e) => {
                warn!(topic, error = %e, "Deep research failed");
                ToolOutput::error(format!("Deep research failed: {}", e))
            }
        }
    }

    async fn create_plan(&self, session: &mut AdvisorSession, initiative: &str) -> ToolOutput {
        info!(initiative, "Creating action and savings plan");
        let context = PromptContext::new(
            "You are a senior small-business consultant. Turn the initiative into an actionable, \
             realistic, self-funded strategic plan:\n\
             1. action_plan: logical sequential steps with realistic costs and durations for a small business.\n\
             2. savings_plan: specific, practical ways the current business can save money, sized to \
             cover the action plan (e.g. cut waste, optimize purchasing, renegotiate suppliers).\n\
             3. summary: explain how the savings fund the steps and reach the goal. Keep it motivating.",
            self.planning_temperature,
        )
        .with_user(format!(
            "Business info: {}\n\nInitiative to plan: {}",
            session.business_info.to_prompt_json(),
            initiative
        ));

        let plan = match generate::<StrategicPlan>(self.content.as_ref(), &context).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "Plan generation failed");
                return ToolOutput::error("Error generating the action plan.");
            }
        };
        let output = match serde_json::to_string_pretty(&plan) {
            Ok(json) => ToolOutput::text(format!("Action and savings plan created:\n{}", json)),
            Err(e) => return ToolOutput::error(format!("Failed to render plan: {}", e)),
        };
        session.current_plan = Some(plan);
        output
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(
    name: &str,
    arguments: &Value,
) -> Result<T, ToolOutput> {
    serde_json::from_value(arguments.clone())
        .map_err(|e| ToolOutput::error(format!("Invalid arguments for {}: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_roundtrip() {
        for tool in AdvisorTool::ALL {
            assert_eq!(AdvisorTool::from_name(tool.name()), Some(tool));
        }
        assert_eq!(AdvisorTool::from_name("delete_everything"), None);
    }

    #[test]
    fn test_definitions() {
        let defs = tool_definitions();
        assert_eq!(defs.len(), 4);
        assert_eq!(defs[1].name, "perform_market_research");
        assert_eq!(defs[1].parameters["required"], json!(["query"]));
        assert_eq!(defs[3].parameters["required"], json!(["initiative_summary"]));
    }

    #[test]
    fn test_parse_args_error_is_tool_output() {
        let err = parse_args::<MarketResearchArgs>("perform_market_research", &json!({}))
            .err()
            .unwrap();
        assert!(err.is_error);
        assert!(err.content.contains("Invalid arguments"));
    }
}
