//! Research pipeline data types.

use crate::structured::{StructuredOutput, schema};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt::Write as _;

/// The single insight recorded for a researcher that could not complete.
pub const RESEARCH_FAILURE_INSIGHT: &str = "Search failed - information unavailable";

/// One search query and why it is being asked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchQuery {
    pub search_query: String,
    pub purpose: String,
}

impl ResearchQuery {
    pub fn new(search_query: impl Into<String>, purpose: impl Into<String>) -> Self {
        Self {
            search_query: search_query.into(),
            purpose: purpose.into(),
        }
    }

    fn schema() -> Value {
        schema::object(json!({
            "search_query": schema::string("A specific, well-focused web search query"),
            "purpose": schema::string("What this query contributes to the overall research"),
        }))
    }
}

/// The planner's decomposition of a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchPlan {
    pub queries: Vec<ResearchQuery>,
    pub research_focus: String,
}

impl StructuredOutput for ResearchPlan {
    const SCHEMA_NAME: &'static str = "research_plan";

    fn json_schema() -> Value {
        schema::object(json!({
            "queries": schema::array(
                ResearchQuery::schema(),
                "3 to 5 strategic, specific and complementary search queries",
            ),
            "research_focus": schema::string("Which aspects of the topic will be covered and why"),
        }))
    }

    fn validate(&self) -> Result<(), String> {
        if self.queries.iter().any(|q| q.search_query.trim().is_empty()) {
            return Err("every query needs a non-empty search_query".to_string());
        }
        Ok(())
    }
}

/// What one researcher produced for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub query: String,
    pub purpose: String,
    pub content: String,
    pub key_insights: Vec<String>,
    /// Set when the researcher failed and this result only records the error.
    #[serde(default)]
    pub degraded: bool,
}

impl ResearchResult {
    /// A degraded result standing in for a researcher that failed.
    pub fn failed(query: &ResearchQuery, error: impl std::fmt::Display) -> Self {
        Self {
            query: query.search_query.clone(),
            purpose: query.purpose.clone(),
            content: format!("Failed to retrieve information: {}", error),
            key_insights: vec![RESEARCH_FAILURE_INSIGHT.to_string()],
            degraded: true,
        }
    }
}

/// Insights the researcher extracts from raw search content.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractedInsights {
    pub key_insights: Vec<String>,
}

impl StructuredOutput for ExtractedInsights {
    const SCHEMA_NAME: &'static str = "extracted_insights";

    fn json_schema() -> Value {
        schema::object(json!({
            "key_insights": schema::string_array(
                "3 to 5 specific, valuable insights relevant to the research purpose",
            ),
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityGrade {
    Pass,
    Fail,
}

impl std::fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityGrade::Pass => write!(f, "pass"),
            QualityGrade::Fail => write!(f, "fail"),
        }
    }
}

/// The quality gate's verdict on the accumulated research.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityFeedback {
    pub grade: QualityGrade,
    #[serde(default)]
    pub missing_aspects: Vec<String>,
    #[serde(default)]
    pub follow_up_queries: Vec<ResearchQuery>,
}

impl QualityFeedback {
    pub fn pass() -> Self {
        Self {
            grade: QualityGrade::Pass,
            missing_aspects: Vec::new(),
            follow_up_queries: Vec::new(),
        }
    }

    pub fn fail(missing_aspects: Vec<String>, follow_up_queries: Vec<ResearchQuery>) -> Self {
        Self {
            grade: QualityGrade::Fail,
            missing_aspects,
            follow_up_queries,
        }
    }
}

impl StructuredOutput for QualityFeedback {
    const SCHEMA_NAME: &'static str = "quality_feedback";

    fn json_schema() -> Value {
        schema::object(json!({
            "grade": {
                "type": "string",
                "enum": ["pass", "fail"],
                "description": "pass if the research is sufficient, fail if it needs more work",
            },
            "missing_aspects": schema::string_array("Specific aspects that still need research"),
            "follow_up_queries": schema::array(
                ResearchQuery::schema(),
                "Queries addressing the identified gaps",
            ),
        }))
    }
}

/// The executive report produced at the end of a research run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    pub title: String,
    pub executive_summary: String,
    pub detailed_analysis: String,
    pub key_insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub methodology: String,
    pub sources_summary: String,
}

impl FinalReport {
    /// Render the report as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let _ = writeln!(md, "# {}\n", self.title);
        let _ = writeln!(md, "## Executive Summary\n\n{}\n", self.executive_summary);
        let _ = writeln!(md, "## Detailed Analysis\n\n{}\n", self.detailed_analysis);
        let _ = writeln!(md, "## Key Insights\n");
        for insight in &self.key_insights {
            let _ = writeln!(md, "- {}", insight);
        }
        let _ = writeln!(md, "\n## Recommendations\n");
        for (i, rec) in self.recommendations.iter().enumerate() {
            let _ = writeln!(md, "{}. {}", i + 1, rec);
        }
        let _ = writeln!(md, "\n## Methodology\n\n{}\n", self.methodology);
        let _ = write!(md, "## Sources\n\n{}\n", self.sources_summary);
        md
    }

    /// Deviations from the target report shape. Informational only.
    pub fn shape_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let summary_words = self.executive_summary.split_whitespace().count();
        if !(100..=150).contains(&summary_words) {
            warnings.push(format!("executive summary has {summary_words} words (target 100-150)"));
        }
        let analysis_words = self.detailed_analysis.split_whitespace().count();
        if !(400..=600).contains(&analysis_words) {
            warnings.push(format!("detailed analysis has {analysis_words} words (target 400-600)"));
        }
        if !(5..=7).contains(&self.key_insights.len()) {
            warnings.push(format!("{} key insights (target 5-7)", self.key_insights.len()));
        }
        if !(3..=5).contains(&self.recommendations.len()) {
            warnings.push(format!(
                "{} recommendations (target 3-5)",
                self.recommendations.len()
            ));
        }
        warnings
    }
}

impl StructuredOutput for FinalReport {
    const SCHEMA_NAME: &'static str = "final_report";

    fn json_schema() -> Value {
        schema::object(json!({
            "title": schema::string("Clear, specific report title"),
            "executive_summary": schema::string("100-150 word summary of the most important findings"),
            "detailed_analysis": schema::string("400-600 word analysis synthesizing all the research"),
            "key_insights": schema::string_array("5-7 key insights drawn from the research"),
            "recommendations": schema::string_array("3-5 actionable recommendations"),
            "methodology": schema::string("Brief description of the research methodology"),
            "sources_summary": schema::string("Summary of the sources consulted and their relevance"),
        }))
    }

    fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("report title is empty".to_string());
        }
        Ok(())
    }
}
