use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Status assigned to customers created without one.
pub const DEFAULT_CUSTOMER_STATUS: &str = "active";
/// Type assigned to customers created without one.
pub const DEFAULT_CUSTOMER_TYPE: &str = "business";

// ============ Database Models ============

/// A CRM customer record.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    /// Unique identifier for the customer.
    pub id: Uuid,
    /// Display name (person or organisation).
    pub name: String,
    /// Email address; unique across customers when present.
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    /// Lifecycle status (e.g. "active", "inactive", "prospect").
    pub status: String,
    /// Customer classification (e.g. "business", "individual").
    pub customer_type: String,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
    /// Timestamp of last update.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Customer row as returned by the listing, with its number of contacts.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct CustomerSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub customer: Customer,
    /// Number of contacts attached to the customer.
    pub contact_count: i64,
}

/// A person reachable at a customer.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Contact {
    pub id: Uuid,
    /// Owning customer.
    pub customer_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Job title.
    pub title: Option<String>,
    /// Whether this is the customer's primary contact.
    pub is_primary: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A submitted lead as stored in `lead_assessment_reports`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct LeadReport {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: String,
    pub phone: Option<String>,
    /// Raw calculator output submitted with the lead.
    #[schema(value_type = Object)]
    pub calculator_results: Value,
    pub created_at: DateTime<Utc>,
}

/// A logged touchpoint against a lead.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Interaction {
    pub id: Uuid,
    pub lead_id: Uuid,
    /// Kind of touchpoint (e.g. "call", "email", "meeting").
    pub interaction_type: String,
    pub description: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============ Validated Insert Models ============

/// A customer that passed validation and carries its defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub status: String,
    pub customer_type: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewContact {
    pub customer_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub title: Option<String>,
    pub is_primary: bool,
    pub notes: Option<String>,
}

/// A lead that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Lead {
    pub name: String,
    pub email: String,
    pub company: String,
    pub phone: Option<String>,
    pub calculator_results: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewInteraction {
    pub lead_id: Uuid,
    pub interaction_type: String,
    pub description: String,
    pub notes: Option<String>,
    /// Assigned by the service, never by the caller.
    pub created_at: DateTime<Utc>,
}

// ============ API Request/Response Models ============

/// Request payload for the lead form.
///
/// Every field is optional on the wire so that missing fields surface as a
/// validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
    /// Opaque key/value output of the savings calculator.
    #[schema(value_type = Object)]
    pub calculator_results: Option<Map<String, Value>>,
}

/// Response for a successful lead submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeadSubmitResponse {
    pub success: bool,
    /// Identifier of the stored lead report, when recording succeeded.
    pub lead_id: Option<Uuid>,
}

/// Request payload for creating a customer (single or imported row).
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CustomerPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub status: Option<String>,
    #[serde(alias = "type")]
    pub customer_type: Option<String>,
    pub notes: Option<String>,
}

/// Bulk import body: either `{ "customers": [...] }` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CustomerImportRequest {
    Wrapped { customers: Vec<CustomerPayload> },
    Rows(Vec<CustomerPayload>),
}

impl CustomerImportRequest {
    pub fn into_rows(self) -> Vec<CustomerPayload> {
        match self {
            CustomerImportRequest::Wrapped { customers } => customers,
            CustomerImportRequest::Rows(rows) => rows,
        }
    }
}

/// Why a single import row was not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImportFailure {
    /// The row's email already belongs to a customer.
    Duplicate,
    /// The row is missing its name.
    Invalid,
    /// Any other datastore failure.
    Failed,
}

/// One rejected row of a bulk import.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImportRowError {
    /// Zero-based position of the row in the submitted array.
    pub row: usize,
    pub name: Option<String>,
    pub email: Option<String>,
    pub reason: ImportFailure,
    pub error: String,
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImportReport {
    pub imported: usize,
    pub total: usize,
    pub errors: Vec<ImportRowError>,
}

/// Request payload for adding a contact to a customer.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ContactPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub title: Option<String>,
    pub is_primary: Option<bool>,
    pub notes: Option<String>,
}

/// Request payload for logging an interaction.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct InteractionPayload {
    pub lead_id: Option<String>,
    pub interaction_type: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

// ============ Response Envelopes ============

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerListResponse {
    pub customers: Vec<CustomerSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerResponse {
    pub customer: Customer,
}

/// A customer together with its ordered contacts.
#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerDetail {
    pub customer: Customer,
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContactResponse {
    pub contact: Contact,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LeadListResponse {
    pub leads: Vec<LeadReport>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InteractionResponse {
    pub interaction: Interaction,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InteractionListResponse {
    pub interactions: Vec<Interaction>,
}

/// Body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// Trims a free-text field, treating blank input as absent.
pub fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
