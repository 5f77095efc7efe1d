//! Labour code registry model for tracker-service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Mapping of a billable item code to its category.
///
/// Operators maintain these rows; the classification pipeline only reads
/// them. Category values seen in practice: `labour`, `service`,
/// `tyre service`, `tyre service / makill`, plus free-text labels.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LabourCode {
    pub labour_code_id: Uuid,
    pub code: String,
    pub description: String,
    pub category: String,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating a labour code.
#[derive(Debug, Clone)]
pub struct CreateLabourCode {
    pub code: String,
    pub description: String,
    pub category: String,
}

/// Input for updating a labour code.
#[derive(Debug, Clone, Default)]
pub struct UpdateLabourCode {
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
}
