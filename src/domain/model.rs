use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// A numeric work item field value.
///
/// Azure DevOps stores `Integer` and `Double` fields; both arrive as JSON
/// numbers, so the variant is decided by how the number was encoded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Integer(i64),
    Decimal(f64),
}

impl Amount {
    /// Reads a JSON value as an amount. Anything that is not a number is `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        let number = value.as_number()?;
        if let Some(i) = number.as_i64() {
            Some(Amount::Integer(i))
        } else {
            number.as_f64().map(Amount::Decimal)
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Amount::Integer(i) => i as f64,
            Amount::Decimal(f) => f,
        }
    }

    pub fn is_finite(&self) -> bool {
        match *self {
            Amount::Integer(_) => true,
            Amount::Decimal(f) => f.is_finite(),
        }
    }

    /// The amount as a JSON number; `None` for NaN and infinities.
    pub fn to_json(&self) -> Option<Value> {
        match *self {
            Amount::Integer(i) => Some(Value::from(i)),
            Amount::Decimal(f) => serde_json::Number::from_f64(f).map(Value::Number),
        }
    }

    pub fn checked_mul(self, rhs: Amount) -> Amount {
        match (self, rhs) {
            (Amount::Integer(a), Amount::Integer(b)) => match a.checked_mul(b) {
                Some(product) => Amount::Integer(product),
                None => Amount::Decimal(a as f64 * b as f64),
            },
            (a, b) => Amount::Decimal(a.as_f64() * b.as_f64()),
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Integer(i) => write!(f, "{}", i),
            Amount::Decimal(d) => write!(f, "{}", d),
        }
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount::Integer(value)
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Amount::Decimal(value)
    }
}

/// Reference names of the fields the estimate is read from and written to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMapping {
    pub quantity: String,
    pub months: String,
    pub unit_value: String,
    pub total: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            quantity: "Custom.Cantidad".to_string(),
            months: "Custom.Meses".to_string(),
            unit_value: "Custom.Valorunitario".to_string(),
            total: "Custom.ValorTotal".to_string(),
        }
    }
}

impl FieldMapping {
    pub fn total_path(&self) -> String {
        format!("/fields/{}", self.total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WorkItemEstimate {
    pub quantity: Option<Amount>,
    pub months: Option<Amount>,
    pub unit_value: Option<Amount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Replace,
    Remove,
    Test,
}

/// One JSON Patch operation (RFC 6902) as accepted by the work item update endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            path: path.into(),
            value: Some(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: u32,
    #[serde(default)]
    pub rev: Option<u32>,
    #[serde(default)]
    pub fields: HashMap<String, Value>,
}

// ---- webhook payload ----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventMessage {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub markdown: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildDefinition {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "type")]
    pub definition_type: Option<String>,
}

/// The `resource` of a service hook notification. Build events fill most of
/// these; work item events only carry `id` and `url` of this set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResource {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub build_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub queue_time: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub finish_time: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub definition: Option<BuildDefinition>,
    #[serde(default)]
    pub source_branch: Option<String>,
    #[serde(default)]
    pub source_version: Option<String>,
    #[serde(default)]
    pub logs: Option<HashMap<String, Value>>,
}

impl EventResource {
    pub fn build_succeeded(&self) -> bool {
        self.status.as_deref() == Some("completed") && self.result.as_deref() == Some("succeeded")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHookEvent {
    pub subscription_id: String,
    pub notification_id: i64,
    pub id: String,
    pub event_type: String,
    pub publisher_id: String,
    #[serde(default)]
    pub message: Option<EventMessage>,
    #[serde(default)]
    pub resource: EventResource,
    pub created_date: String,
}

impl ServiceHookEvent {
    /// `createdDate` parsed as RFC 3339, when it is one.
    pub fn created_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::parse_from_rfc3339(&self.created_date)
            .ok()
            .map(|date| date.with_timezone(&chrono::Utc))
    }
}

// ---- recalculation results ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatedWorkItem {
    pub id: u32,
    pub total: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedUpdate {
    pub id: u32,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectReport {
    pub project: String,
    pub work_items_found: usize,
    pub updated: Vec<UpdatedWorkItem>,
    pub skipped: Vec<u32>,
    pub failed: Vec<FailedUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecalculationReport {
    pub projects: Vec<ProjectReport>,
}

impl RecalculationReport {
    pub fn updated_count(&self) -> usize {
        self.projects.iter().map(|p| p.updated.len()).sum()
    }

    pub fn skipped_count(&self) -> usize {
        self.projects.iter().map(|p| p.skipped.len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.projects.iter().map(|p| p.failed.len()).sum()
    }
}
