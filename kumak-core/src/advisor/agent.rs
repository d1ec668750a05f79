//! The advisor turn loop.

use super::session::AdvisorSession;
use super::tools::{ToolExecutor, tool_definitions};
use crate::brain::LlmProvider;
use crate::config::{KumakConfig, RetryConfig};
use crate::error::AdvisorError;
use crate::providers::with_retry;
use crate::research::ResearchOrchestrator;
use crate::search::SearchProvider;
use crate::structured::{ContentSynthesizer, LlmSynthesizer};
use crate::types::{CompletionRequest, Message, ToolDefinition, TokenUsage};
use std::sync::Arc;
use tracing::{debug, info, warn};

const SYSTEM_PROMPT: &str = "You are KUMAK, an AI consultant for small businesses. Your mission is to be a strategic partner, guiding owners from an idea to a concrete, self-funded action plan that grows their business.

<instructions>
1. Start every turn by calling `analyze_and_synthesize` to understand the context.
2. Use `perform_market_research` for quick facts when the owner asks to explore an idea, and `deep_research` when they need a thorough report.
3. The analysis suggests a next topic. Use it to dig into the business's challenges and opportunities.
4. Once an initiative is validated (e.g. \"use local ingredients\", \"launch a loyalty program\"), do not keep brainstorming. Proactively offer to turn it into a concrete action plan funded by savings, without loans.
5. If the owner agrees, call `create_action_and_savings_plan` with a summary of the initiative.
6. Present the plan clearly: the action steps, the savings plan, and how they connect. Invite the owner to adjust it.
7. When nothing is left to plan, summarize what was achieved and encourage the owner to start.
</instructions>";

/// The conversational business advisor.
pub struct Advisor {
    provider: Arc<dyn LlmProvider>,
    tools: ToolExecutor,
    definitions: Vec<ToolDefinition>,
    retry: RetryConfig,
    temperature: f32,
    max_tool_rounds: usize,
}

impl Advisor {
    pub fn new(
        config: &KumakConfig,
        provider: Arc<dyn LlmProvider>,
        content: Arc<dyn ContentSynthesizer>,
        search: Arc<dyn SearchProvider>,
        research: Arc<ResearchOrchestrator>,
    ) -> Self {
        Self {
            provider,
            tools: ToolExecutor::new(content, search, research, &config.advisor),
            definitions: tool_definitions(),
            retry: config.retry.clone(),
            temperature: config.llm.temperature,
            max_tool_rounds: config.advisor.max_tool_rounds,
        }
    }

    /// Wire every collaborator from a single LLM provider and search backend.
    pub fn from_config(
        config: &KumakConfig,
        provider: Arc<dyn LlmProvider>,
        search: Arc<dyn SearchProvider>,
    ) -> Self {
        let content: Arc<dyn ContentSynthesizer> =
            Arc::new(LlmSynthesizer::new(provider.clone(), config.retry.clone()));
        let research = Arc::new(ResearchOrchestrator::new(
            &config.research,
            content.clone(),
            search.clone(),
        ));
        Self::new(config, provider, content, search, research)
    }

    /// The system prompt for this session's next model call.
    pub fn system_prompt(session: &AdvisorSession) -> String {
        let memory = if session.long_term_memory.is_empty() {
            "(none)".to_string()
        } else {
            session
                .long_term_memory
                .iter()
                .map(|m| format!("- {}", m))
                .collect::<Vec<_>>()
                .join("\n")
        };
        format!(
            "{}\n\n<context>\nCurrent business info: {}\nLong-term memory:\n{}\n</context>",
            SYSTEM_PROMPT,
            session.business_info.to_prompt_json(),
            memory
        )
    }

    /// Process one user message and return the advisor's reply.
    ///
    /// Tool calls are executed in order and their results fed back until the
    /// model answers in plain text, or `max_tool_rounds` model calls are used up.
    /// If a model call fails, the messages added during this turn are removed so
    /// the session never ends on an unanswered user message. Profile and plan
    /// updates made by tools earlier in the turn are kept.
    pub async fn handle_message(
        &self,
        session: &mut AdvisorSession,
        text: &str,
    ) -> Result<String, AdvisorError> {
        if text.trim().is_empty() {
            return Err(AdvisorError::EmptyMessage);
        }
        let turn_start = session.messages.len();
        session.messages.push(Message::user(text));
        let mut usage = TokenUsage::default();

        for round in 1..=self.max_tool_rounds {
            let mut messages = Vec::with_capacity(session.messages.len() + 1);
            messages.push(Message::system(Self::system_prompt(session)));
            messages.extend(session.messages.iter().cloned());
            let request = CompletionRequest {
                messages,
                tools: Some(self.definitions.clone()),
                temperature: self.temperature,
                ..Default::default()
            };

            let result = with_retry(&self.retry, || self.provider.complete(request.clone())).await;
            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    warn!(round, error = %e, "Model call failed; discarding this turn");
                    session.messages.truncate(turn_start);
                    return Err(e.into());
                }
            };
            usage.accumulate(&response.usage);

            let calls: Vec<(String, String, serde_json::Value)> = response
                .message
                .content
                .tool_calls()
                .into_iter()
                .map(|c| (c.id.to_string(), c.name.to_string(), c.arguments.clone()))
                .collect();
            let reply = response.message.content.joined_text();
            session.messages.push(response.message);

            if calls.is_empty() {
                info!(
                    thread_id = %session.thread_id,
                    rounds = round,
                    tokens = usage.total(),
                    "Advisor turn complete"
                );
                return Ok(reply);
            }

            debug!(round, tool_calls = calls.len(), "Model requested tools");
            for (call_id, name, arguments) in calls {
                let output = self.tools.execute(session, &name, &arguments).await;
                session
                    .messages
                    .push(Message::tool_result(call_id, output.content, output.is_error));
            }
        }

        Err(AdvisorError::MaxToolRounds {
            max: self.max_tool_rounds,
        })
    }
}
