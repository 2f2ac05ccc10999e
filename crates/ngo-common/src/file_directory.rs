/// In-memory NGO directory backed by a JSON snapshot file.
///
/// Serves the same contract as the HTTP directory; handy for local runs and tests.
use std::cmp::Ordering;
use std::path::Path;

use futures::future::{self, BoxFuture, FutureExt};
use tracing::info;

use crate::directory::{validate_records, ActiveNgoQuery, NgoDirectory};
use crate::error::CommonError;
use crate::ngo::NgoRecord;

#[derive(Debug, Clone, Default)]
pub struct FileDirectory {
    records: Vec<NgoRecord>,
}

impl FileDirectory {
    /// Load a JSON array of NGO records. Malformed entries are skipped with a warning.
    pub fn load(path: &Path) -> Result<Self, CommonError> {
        let content = std::fs::read_to_string(path)?;
        let values: Vec<serde_json::Value> = serde_json::from_str(&content)?;
        let total = values.len();
        let records = validate_records(values);
        info!(
            path = %path.display(),
            loaded = records.len(),
            skipped = total - records.len(),
            "NGO snapshot loaded"
        );
        Ok(Self { records })
    }

    pub fn from_records(records: Vec<NgoRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn query_active(&self, query: &ActiveNgoQuery) -> Vec<NgoRecord> {
        let mut matches: Vec<&NgoRecord> = self
            .records
            .iter()
            .filter(|r| r.is_active() && query.matches_category(&r.category))
            .collect();
        matches.sort_by(|a, b| directory_order(a, b));
        matches.into_iter().take(query.limit).cloned().collect()
    }
}

/// Rating desc, then newest first; records without a timestamp sort last.
fn directory_order(a: &NgoRecord, b: &NgoRecord) -> Ordering {
    b.rating
        .total_cmp(&a.rating)
        .then_with(|| b.created_at.cmp(&a.created_at))
}

impl NgoDirectory for FileDirectory {
    fn find_by_id<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<NgoRecord>, CommonError>> {
        let found = self.records.iter().find(|r| r.id == id).cloned();
        future::ready(Ok(found)).boxed()
    }

    fn find_active<'a>(
        &'a self,
        query: &'a ActiveNgoQuery,
    ) -> BoxFuture<'a, Result<Vec<NgoRecord>, CommonError>> {
        future::ready(Ok(self.query_active(query))).boxed()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::ngo::NgoStatus;

    fn record(id: &str, category: &str, rating: f64, status: NgoStatus, year: Option<i32>) -> NgoRecord {
        NgoRecord {
            id: id.to_string(),
            name: format!("NGO {id}"),
            category: category.to_string(),
            description: String::new(),
            rating,
            status,
            contact: String::new(),
            email: String::new(),
            logo: None,
            images: vec![],
            created_at: year.map(|y| Utc.with_ymd_and_hms(y, 1, 1, 0, 0, 0).unwrap()),
        }
    }

    fn directory() -> FileDirectory {
        FileDirectory::from_records(vec![
            record("a", "Child Protection", 4.0, NgoStatus::Active, Some(2020)),
            record("b", "Child Protection", 4.0, NgoStatus::Active, Some(2023)),
            record("c", "LGBTQ+ Rights", 4.8, NgoStatus::Active, None),
            record("d", "LGBTQ+ Rights", 5.0, NgoStatus::Inactive, Some(2024)),
            record("e", "Child Protection", 3.1, NgoStatus::Active, None),
        ])
    }

    #[tokio::test]
    async fn active_query_sorts_by_rating_then_recency() {
        let dir = directory();
        let query = ActiveNgoQuery::all(10);
        let ids: Vec<String> = dir
            .find_active(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, ["c", "b", "a", "e"]);
    }

    #[tokio::test]
    async fn active_query_applies_category_filter_and_limit() {
        let dir = directory();
        let query = ActiveNgoQuery::in_categories(vec!["Child Protection".to_string()], 2);
        let ids: Vec<String> = dir
            .find_active(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[tokio::test]
    async fn find_by_id_returns_inactive_records_too() {
        let dir = directory();
        let found = dir.find_by_id("d").await.unwrap();
        assert_eq!(found.map(|r| r.status), Some(NgoStatus::Inactive));
        assert!(dir.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sample_snapshot_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/ngos.sample.json");
        let dir = FileDirectory::load(&path).unwrap();
        assert_eq!(dir.len(), 8);
        let active = dir.find_active(&ActiveNgoQuery::all(3)).await.unwrap();
        let ids: Vec<&str> = active.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["ngo-002", "ngo-001", "ngo-004"]);
    }

    #[test]
    fn load_skips_malformed_entries() {
        let path = std::env::temp_dir().join(format!("ngo-snapshot-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[
                {"id": "x", "name": "X", "category": "Child Protection", "rating": 4.1, "status": "active"},
                {"id": "y", "name": "Y", "category": "Child Protection", "rating": -1, "status": "active"}
            ]"#,
        )
        .unwrap();
        let dir = FileDirectory::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(dir.len(), 1);
    }
}
