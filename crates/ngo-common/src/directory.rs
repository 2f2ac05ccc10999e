/// Contract for the external NGO directory.
///
/// The matcher only reads from the directory. Implementations own sorting and
/// limiting so the ranking stage always sees a bounded, deterministically ordered
/// candidate list.
use futures::future::BoxFuture;
use tracing::warn;

use crate::error::CommonError;
use crate::ngo::{NgoRecord, RawNgoRecord};

pub const DEFAULT_RETRIEVAL_LIMIT: usize = 20;

/// Query for active NGOs, sorted by rating desc then recency desc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveNgoQuery {
    /// `None` searches every active NGO.
    pub category_in: Option<Vec<String>>,
    pub limit: usize,
}

impl ActiveNgoQuery {
    pub fn all(limit: usize) -> Self {
        Self {
            category_in: None,
            limit,
        }
    }

    pub fn in_categories(categories: Vec<String>, limit: usize) -> Self {
        Self {
            category_in: Some(categories),
            limit,
        }
    }

    pub fn matches_category(&self, category: &str) -> bool {
        match &self.category_in {
            Some(categories) => categories.iter().any(|c| c == category),
            None => true,
        }
    }
}

pub trait NgoDirectory: Send + Sync {
    fn find_by_id<'a>(&'a self, id: &'a str)
        -> BoxFuture<'a, Result<Option<NgoRecord>, CommonError>>;

    fn find_active<'a>(
        &'a self,
        query: &'a ActiveNgoQuery,
    ) -> BoxFuture<'a, Result<Vec<NgoRecord>, CommonError>>;
}

/// Validate a batch of raw directory records, dropping (and logging) malformed ones.
pub fn validate_records(values: Vec<serde_json::Value>) -> Vec<NgoRecord> {
    values
        .into_iter()
        .filter_map(|value| {
            let raw: RawNgoRecord = serde_json::from_value(value)
                .inspect_err(|e| warn!(error = %e, "skipping undecodable NGO record"))
                .ok()?;
            NgoRecord::try_from(raw)
                .inspect_err(|e| warn!(error = %e, "skipping malformed NGO record"))
                .ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfiltered_query_matches_everything() {
        let query = ActiveNgoQuery::all(DEFAULT_RETRIEVAL_LIMIT);
        assert!(query.matches_category("Child Protection"));
        assert!(query.matches_category("anything"));
    }

    #[test]
    fn filtered_query_matches_exact_category() {
        let query = ActiveNgoQuery::in_categories(vec!["LGBTQ+ Rights".to_string()], 5);
        assert!(query.matches_category("LGBTQ+ Rights"));
        assert!(!query.matches_category("lgbtq+ rights"));
    }

    #[test]
    fn validate_records_skips_bad_entries() {
        let values = vec![
            serde_json::json!({
                "id": "ok", "name": "Fine", "category": "Child Protection",
                "rating": 4.0, "status": "active"
            }),
            serde_json::json!({
                "id": "bad-status", "name": "Odd", "category": "Child Protection",
                "rating": 4.0, "status": "pending"
            }),
            serde_json::json!({ "id": "no-name", "category": "x", "rating": 1.0, "status": "active" }),
        ];
        let records = validate_records(values);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "ok");
    }
}
