//! Stored AI insights.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use looks_lab_core::{InsightCategory, InsightId, UserId};

#[derive(Debug, Clone, Serialize)]
pub struct Insight {
    pub id: InsightId,
    pub user_id: UserId,
    pub category: InsightCategory,
    pub content: Value,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsightCreate {
    pub category: InsightCategory,
    pub content: Value,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InsightUpdate {
    pub category: Option<InsightCategory>,
    pub content: Option<Value>,
    pub source: Option<String>,
}
