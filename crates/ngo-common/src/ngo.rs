use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::CommonError;

pub const MAX_RATING: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NgoStatus {
    Active,
    Inactive,
}

/// An NGO as served by the directory, after boundary validation.
///
/// Every field downstream code reads is guaranteed present; `rating` is finite and
/// within `[0, MAX_RATING]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NgoRecord {
    pub id: String,
    pub name: String,
    /// Legal-aid category the NGO serves, e.g. "Child Protection"
    pub category: String,
    pub description: String,
    pub rating: f64,
    pub status: NgoStatus,
    pub contact: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    /// Used by directories as the recency tie-break after rating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

impl NgoRecord {
    pub fn is_active(&self) -> bool {
        self.status == NgoStatus::Active
    }
}

/// Wire shape of a directory record before validation. Everything is optional so a
/// single bad record can be reported instead of failing the whole response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNgoRecord {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub status: Option<NgoStatus>,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub logo: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<RawNgoRecord> for NgoRecord {
    type Error = CommonError;

    fn try_from(raw: RawNgoRecord) -> Result<Self, Self::Error> {
        let id = required_text(raw.id, "id", "<unknown>")?;
        let name = required_text(raw.name, "name", &id)?;
        let category = required_text(raw.category, "category", &id)?;
        let status = raw
            .status
            .ok_or_else(|| CommonError::InvalidRecord(format!("{id}: missing status")))?;
        let rating = raw
            .rating
            .ok_or_else(|| CommonError::InvalidRecord(format!("{id}: missing rating")))?;
        if !rating.is_finite() || !(0.0..=MAX_RATING).contains(&rating) {
            return Err(CommonError::InvalidRecord(format!(
                "{id}: rating {rating} outside [0, {MAX_RATING}]"
            )));
        }

        Ok(Self {
            id,
            name,
            category,
            description: raw.description.unwrap_or_default(),
            rating,
            status,
            contact: raw.contact.unwrap_or_default(),
            email: raw.email.unwrap_or_default(),
            logo: raw.logo.filter(|l| !l.trim().is_empty()),
            images: raw.images.unwrap_or_default(),
            created_at: raw.created_at,
        })
    }
}

fn required_text(value: Option<String>, field: &str, id: &str) -> Result<String, CommonError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(CommonError::InvalidRecord(format!("{id}: missing {field}"))),
    }
}
