//! Conversation analysis output.

use super::profile::BusinessInfo;
use crate::structured::{StructuredOutput, schema};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// What the analysis tool learned from the latest turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub business_info_update: Option<BusinessInfo>,
    #[serde(default)]
    pub key_insights_for_memory: Option<Vec<String>>,
    /// A strategic topic, not a question, e.g. "Clarify what makes the sauce unique".
    #[serde(default)]
    pub next_topic_to_discuss: Option<String>,
}

impl StructuredOutput for AnalysisResult {
    const SCHEMA_NAME: &'static str = "analysis_result";

    fn json_schema() -> Value {
        let mut info = BusinessInfo::json_schema();
        info["type"] = json!(["object", "null"]);
        info["description"] = json!("New or updated business facts from the latest user message");
        schema::object(json!({
            "business_info_update": info,
            "key_insights_for_memory": {
                "type": ["array", "null"],
                "items": { "type": "string" },
                "description": "Fundamental truths about the business worth remembering long-term",
            },
            "next_topic_to_discuss": schema::nullable_string(
                "The next strategic topic to explore with the owner; null if nothing is missing",
            ),
        }))
    }
}
