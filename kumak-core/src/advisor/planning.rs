//! Strategic action and savings plans.

use crate::structured::{StructuredOutput, schema};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// One concrete step of an action plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionStep {
    pub step_number: u32,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub estimated_cost_usd: f64,
    pub estimated_timeline_days: u32,
}

/// A way for the business to save money each month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsTactic {
    pub tactic: String,
    pub estimated_monthly_savings_usd: f64,
    pub implementation_notes: String,
}

/// An initiative broken into steps, funded by a savings plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategicPlan {
    pub initiative_name: String,
    pub action_plan: Vec<ActionStep>,
    pub savings_plan: Vec<SavingsTactic>,
    pub summary: String,
}

impl StrategicPlan {
    pub fn total_action_cost_usd(&self) -> f64 {
        self.action_plan.iter().map(|s| s.estimated_cost_usd).sum()
    }

    pub fn total_monthly_savings_usd(&self) -> f64 {
        self.savings_plan
            .iter()
            .map(|t| t.estimated_monthly_savings_usd)
            .sum()
    }

    /// Sum of step durations, assuming steps run one after another.
    pub fn total_timeline_days(&self) -> u32 {
        self.action_plan
            .iter()
            .map(|s| s.estimated_timeline_days)
            .sum()
    }

    /// Months of savings needed to cover the action cost. `None` without savings.
    pub fn months_to_fund(&self) -> Option<f64> {
        let savings = self.total_monthly_savings_usd();
        (savings > 0.0).then(|| self.total_action_cost_usd() / savings)
    }
}

impl StructuredOutput for StrategicPlan {
    const SCHEMA_NAME: &'static str = "strategic_plan";

    fn json_schema() -> Value {
        let step = schema::object(json!({
            "step_number": schema::integer("Sequential step number, starting at 1"),
            "title": schema::string("Short, clear step title, e.g. 'Research local suppliers'"),
            "description": schema::string("What to do in this step"),
            "estimated_cost_usd": schema::number("Estimated cost in USD; 0.0 when there is no direct cost"),
            "estimated_timeline_days": schema::integer("Estimated duration in days"),
        }));
        let tactic = schema::object(json!({
            "tactic": schema::string("The savings tactic, e.g. 'Cut ingredient waste by 10%'"),
            "estimated_monthly_savings_usd": schema::number("Estimated monthly savings in USD"),
            "implementation_notes": schema::string("How to implement the tactic"),
        }));
        schema::object(json!({
            "initiative_name": schema::string("Clear, concise name of the initiative"),
            "action_plan": schema::array(step, "Sequential steps to implement the initiative"),
            "savings_plan": schema::array(tactic, "Tactics that generate the savings funding the plan"),
            "summary": schema::string("How the savings plan funds the action plan and reaches the goal"),
        }))
    }

    fn validate(&self) -> Result<(), String> {
        if self.action_plan.is_empty() {
            return Err("action plan has no steps".to_string());
        }
        if self.action_plan.iter().any(|s| s.estimated_cost_usd < 0.0)
            || self
                .savings_plan
                .iter()
                .any(|t| t.estimated_monthly_savings_usd < 0.0)
        {
            return Err("costs and savings must be non-negative".to_string());
        }
        Ok(())
    }
}
