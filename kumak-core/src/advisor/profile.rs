//! Business profile accumulated over a conversation.

use crate::structured::schema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Facts about the business. Every field is optional and filled in as the
/// owner mentions it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_products_services: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_operating: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_constraints: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth_obstacles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial_goals: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_objectives: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_expansion: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_timeline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_challenges: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needed_resources: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identified_risks: Option<Vec<String>>,
}

macro_rules! merge_fields {
    ($target:expr, $update:expr, $($field:ident),+ $(,)?) => {
        $(
            if $update.$field.is_some() {
                $target.$field = $update.$field;
            }
        )+
    };
}

impl BusinessInfo {
    /// Overwrite every field present in `update`; keep the rest.
    pub fn merge(&mut self, update: BusinessInfo) {
        merge_fields!(
            self,
            update,
            business_name,
            industry,
            main_products_services,
            location,
            description,
            years_operating,
            employee_count,
            resource_constraints,
            growth_obstacles,
            financial_goals,
            primary_objectives,
            desired_expansion,
            target_timeline,
            current_challenges,
            needed_resources,
            identified_risks,
        );
    }

    pub fn is_empty(&self) -> bool {
        *self == BusinessInfo::default()
    }

    /// Compact JSON for prompts; `{}` when nothing is known yet.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Strict schema: every field present, each nullable.
    pub(crate) fn json_schema() -> Value {
        let text = |d: &str| schema::nullable_string(d);
        let list = |d: &str| {
            json!({ "type": ["array", "null"], "items": { "type": "string" }, "description": d })
        };
        let count = |d: &str| json!({ "type": ["integer", "null"], "description": d });
        schema::object(json!({
            "business_name": text("Name of the business"),
            "industry": text("Industry or sector"),
            "main_products_services": list("Main products or services"),
            "location": text("Where the business operates, e.g. \"Lima, Peru\" or \"Online\""),
            "description": text("Short description of the business"),
            "years_operating": count("Years in operation"),
            "employee_count": count("Number of employees"),
            "resource_constraints": list("Resource limitations"),
            "growth_obstacles": list("Obstacles to growth"),
            "financial_goals": list("Financial goals"),
            "primary_objectives": list("Primary business objectives"),
            "desired_expansion": list("Desired expansion directions"),
            "target_timeline": text("Target timeline for the objectives"),
            "current_challenges": list("Current challenges"),
            "needed_resources": list("Resources the business needs"),
            "identified_risks": list("Identified risks"),
        }))
    }
}
