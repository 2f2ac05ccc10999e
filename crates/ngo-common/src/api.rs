use std::borrow::Cow;
use std::collections::BTreeMap;

use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};

use crate::ngo::NgoRecord;

pub const MESSAGE_SUCCESS: &str = "success";
pub const MESSAGE_ERROR: &str = "error";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConversationTurn {
    /// Who said it, e.g. "user" or "assistant". Not used for scoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecommendNgosParams {
    /// Conversation so far, oldest turn first. May be empty.
    pub conversation_history: Vec<ConversationTurn>,
    /// Latest message not yet part of the history.
    #[serde(default)]
    pub last_message: Option<String>,
}

/// Unvalidated `recommend_ngos` arguments, taken as-is so that tool calls go through
/// the same request validation as the HTTP body. Publishes the schema of
/// [`RecommendNgosParams`].
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct RawRecommendNgosParams(pub serde_json::Value);

impl JsonSchema for RawRecommendNgosParams {
    fn schema_name() -> Cow<'static, str> {
        RecommendNgosParams::schema_name()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        RecommendNgosParams::json_schema(generator)
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetRecommendationDetailsParams {
    /// Directory ID of the NGO.
    pub ngo_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Normal,
    High,
}

impl UrgencyLevel {
    pub fn is_high(self) -> bool {
        self == UrgencyLevel::High
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub detected_categories: Vec<String>,
    pub keywords: Vec<String>,
    pub urgency_level: UrgencyLevel,
    pub category_scores: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(flatten)]
    pub ngo: NgoRecord,
    pub relevance_score: u32,
    pub match_reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecommendNgosResponse {
    pub message: String,
    pub analysis: AnalysisSummary,
    pub recommendations: Vec<Recommendation>,
    pub total_matches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingInfo {
    pub available: bool,
    pub contact: String,
    pub email: String,
    pub response_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationDetails {
    #[serde(flatten)]
    pub ngo: NgoRecord,
    pub booking_info: BookingInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecommendationDetailsResponse {
    pub message: String,
    pub ngo: RecommendationDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInfo {
    pub name: String,
    pub weight: u32,
    pub high_priority_terms: usize,
    pub medium_priority_terms: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CategoryListResponse {
    pub categories: Vec<CategoryInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorResponse {
    pub message: String,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            message: MESSAGE_ERROR.to_string(),
            error: error.into(),
        }
    }
}
