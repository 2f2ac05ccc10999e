/// MCP server exposing the recommendation engine.
///
/// Tools:
/// - `recommend_ngos`: analyze a conversation and return the top NGO matches
/// - `get_recommendation_details`: NGO record plus booking information
/// - `list_categories`: configured legal-aid categories in tie-break order
use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};

use ngo_common::api::{
    CategoryListResponse, GetRecommendationDetailsParams, RawRecommendNgosParams,
    RecommendNgosResponse, RecommendationDetailsResponse,
};

use crate::engine::{parse_request, RecommendationEngine};

#[derive(Clone)]
pub struct NgoMatcherServer {
    engine: Arc<RecommendationEngine>,
    tool_router: ToolRouter<NgoMatcherServer>,
}

impl NgoMatcherServer {
    pub fn new(engine: Arc<RecommendationEngine>) -> Self {
        Self {
            engine,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl NgoMatcherServer {
    #[tool(description = "Classify a legal-aid conversation into categories, detect urgency, and recommend up to 3 active NGOs ranked by relevance. conversationHistory may be empty.")]
    async fn recommend_ngos(
        &self,
        Parameters(RawRecommendNgosParams(args)): Parameters<RawRecommendNgosParams>,
    ) -> Result<Json<RecommendNgosResponse>, String> {
        let params = parse_request(args).map_err(|e| e.to_string())?;
        let response = self
            .engine
            .recommend(&params.conversation_history, params.last_message.as_deref())
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(response))
    }

    #[tool(description = "Get an NGO by directory ID together with booking information (contact, email, expected response time).")]
    async fn get_recommendation_details(
        &self,
        Parameters(params): Parameters<GetRecommendationDetailsParams>,
    ) -> Result<Json<RecommendationDetailsResponse>, String> {
        let details = self
            .engine
            .details(&params.ngo_id)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(details))
    }

    #[tool(description = "List the legal-aid categories the matcher classifies into, in tie-break order, with their weights.")]
    async fn list_categories(&self) -> Result<Json<CategoryListResponse>, String> {
        Ok(Json(CategoryListResponse {
            categories: self.engine.patterns().category_infos(),
        }))
    }
}

#[tool_handler]
impl ServerHandler for NgoMatcherServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "ngo-matcher".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Legal-aid NGO matcher. Pass the conversation to recommend_ngos to get detected \
                 categories, urgency and up to 3 ranked NGOs. Use get_recommendation_details with \
                 an NGO id for booking information, and list_categories to see the categories \
                 in use."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use rmcp::handler::server::wrapper::Parameters;
    use serde_json::json;

    use super::NgoMatcherServer;
    use crate::engine::tests::{engine_with, sample_records, RecordingDirectory};
    use crate::engine::HISTORY_REQUIRED;
    use ngo_common::api::RawRecommendNgosParams;

    fn server_with(directory: Arc<RecordingDirectory>) -> NgoMatcherServer {
        NgoMatcherServer::new(Arc::new(engine_with(directory)))
    }

    #[test]
    fn tools_publish_output_schemas() {
        let tools = NgoMatcherServer::tool_router().list_all();
        for name in ["recommend_ngos", "get_recommendation_details", "list_categories"] {
            let tool = tools
                .iter()
                .find(|t| t.name == name)
                .unwrap_or_else(|| panic!("missing tool: {name}"));
            assert!(
                tool.output_schema.is_some(),
                "tool {name} should publish output_schema"
            );
        }
    }

    #[test]
    fn server_builds_around_shared_engine() {
        let engine = Arc::new(engine_with(Arc::new(RecordingDirectory::new(sample_records()))));
        let server = NgoMatcherServer::new(Arc::clone(&engine));
        let clone = server.clone();
        assert!(Arc::ptr_eq(&server.engine, &clone.engine));
    }

    #[test]
    fn recommend_tool_schema_describes_the_request() {
        let tools = NgoMatcherServer::tool_router().list_all();
        let tool = tools
            .iter()
            .find(|t| t.name == "recommend_ngos")
            .expect("recommend_ngos tool");
        let properties = tool
            .input_schema
            .get("properties")
            .and_then(|p| p.as_object())
            .expect("input schema properties");
        assert!(properties.contains_key("conversationHistory"));
        assert!(properties.contains_key("lastMessage"));
    }

    #[tokio::test]
    async fn missing_history_is_rejected_like_the_http_api() {
        let directory = Arc::new(RecordingDirectory::new(sample_records()));
        let server = server_with(directory.clone());
        for args in [json!({}), json!({"conversationHistory": "not a list"})] {
            let err = server
                .recommend_ngos(Parameters(RawRecommendNgosParams(args)))
                .await
                .err();
            assert_eq!(err.as_deref(), Some(HISTORY_REQUIRED));
        }
        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn recommend_tool_runs_the_pipeline() {
        let directory = Arc::new(RecordingDirectory::new(sample_records()));
        let server = server_with(directory.clone());
        let args = json!({
            "conversationHistory": [{"speaker": "user", "text": "My employer refuses to pay my wages"}]
        });
        let response = server
            .recommend_ngos(Parameters(RawRecommendNgosParams(args)))
            .await
            .expect("recommendations");
        assert_eq!(response.0.analysis.detected_categories[0], "Labor & Employment Rights");
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
    }
}
