/// Recommendation pipeline: analyze the conversation, retrieve candidates from the
/// directory, rank them and assemble the response.
///
/// The engine holds only immutable configuration and a directory handle, so one
/// instance serves any number of concurrent requests.
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use ngo_common::api::{
    BookingInfo, ConversationTurn, RecommendNgosParams, RecommendNgosResponse, Recommendation,
    RecommendationDetails, RecommendationDetailsResponse, MESSAGE_SUCCESS,
};
use ngo_common::directory::{ActiveNgoQuery, NgoDirectory};
use ngo_common::ngo::NgoRecord;

use crate::analysis::{analyze, AnalysisResult};
use crate::error::AppError;
use crate::patterns::PatternSet;
use crate::ranking::rank_candidates;

pub const MAX_RECOMMENDATIONS: usize = 3;
pub const HISTORY_REQUIRED: &str = "Conversation history is required";
const BOOKING_RESPONSE_TIME: &str = "24-48 hours";

/// Validate a raw request body before any scoring work happens.
pub fn parse_request(body: serde_json::Value) -> Result<RecommendNgosParams, AppError> {
    let has_history = body
        .get("conversationHistory")
        .is_some_and(|history| history.is_array());
    if !has_history {
        return Err(AppError::Validation(HISTORY_REQUIRED.to_string()));
    }
    serde_json::from_value(body)
        .map_err(|e| AppError::Validation(format!("invalid request body: {e}")))
}

pub struct RecommendationEngine {
    patterns: Arc<PatternSet>,
    directory: Arc<dyn NgoDirectory>,
    retrieval_timeout: Duration,
    retrieval_limit: usize,
}

impl RecommendationEngine {
    pub fn new(
        patterns: Arc<PatternSet>,
        directory: Arc<dyn NgoDirectory>,
        retrieval_timeout: Duration,
        retrieval_limit: usize,
    ) -> Self {
        Self {
            patterns,
            directory,
            retrieval_timeout,
            retrieval_limit,
        }
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    pub async fn recommend(
        &self,
        history: &[ConversationTurn],
        last_message: Option<&str>,
    ) -> Result<RecommendNgosResponse, AppError> {
        let analysis = analyze(history, last_message, &self.patterns);
        debug!(
            categories = ?analysis.categories,
            keywords = ?analysis.keywords,
            "conversation analyzed"
        );

        let candidates = self.retrieve_candidates(&analysis).await?;
        let total_matches = candidates.len();
        let ranked = rank_candidates(candidates, &analysis);

        info!(
            turns = history.len(),
            categories = analysis.categories.len(),
            urgency = ?analysis.urgency,
            candidates = total_matches,
            "recommendations computed"
        );
        Ok(assemble(&analysis, ranked, total_matches))
    }

    /// Fetch active NGOs for the analysis categories, or all active NGOs when the
    /// analysis fell back to general legal aid.
    pub async fn retrieve_candidates(
        &self,
        analysis: &AnalysisResult,
    ) -> Result<Vec<NgoRecord>, AppError> {
        let query = if analysis.is_fallback() {
            ActiveNgoQuery::all(self.retrieval_limit)
        } else {
            ActiveNgoQuery::in_categories(analysis.categories.clone(), self.retrieval_limit)
        };

        let candidates = tokio::time::timeout(self.retrieval_timeout, self.directory.find_active(&query))
            .await
            .map_err(|_| AppError::RetrievalTimeout(self.retrieval_timeout))??;
        Ok(candidates)
    }

    pub async fn details(&self, ngo_id: &str) -> Result<RecommendationDetailsResponse, AppError> {
        let ngo_id = ngo_id.trim();
        if ngo_id.is_empty() {
            return Err(AppError::Validation("NGO id is required".to_string()));
        }

        let ngo = tokio::time::timeout(self.retrieval_timeout, self.directory.find_by_id(ngo_id))
            .await
            .map_err(|_| AppError::RetrievalTimeout(self.retrieval_timeout))??
            .ok_or_else(|| AppError::NotFound(ngo_id.to_string()))?;

        let booking_info = BookingInfo {
            available: true,
            contact: ngo.contact.clone(),
            email: ngo.email.clone(),
            response_time: BOOKING_RESPONSE_TIME.to_string(),
        };
        Ok(RecommendationDetailsResponse {
            message: MESSAGE_SUCCESS.to_string(),
            ngo: RecommendationDetails { ngo, booking_info },
        })
    }
}

/// Project the analysis and ranked list into the response payload.
pub fn assemble(
    analysis: &AnalysisResult,
    mut ranked: Vec<Recommendation>,
    total_matches: usize,
) -> RecommendNgosResponse {
    ranked.truncate(MAX_RECOMMENDATIONS);
    RecommendNgosResponse {
        message: MESSAGE_SUCCESS.to_string(),
        analysis: analysis.summary(),
        recommendations: ranked,
        total_matches,
    }
}
