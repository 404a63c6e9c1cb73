use crate::config::Config;
use crate::customers::{CustomerService, CUSTOMER_NOT_FOUND_MESSAGE};
use crate::errors::AppError;
use crate::interactions::{InteractionService, LEAD_NOT_FOUND_MESSAGE};
use crate::lead_intake::LeadIntakeService;
use crate::mailer::Notifier;
use crate::models::*;
use crate::store::CrmStore;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// CRM datastore.
    pub store: Arc<dyn CrmStore>,
    /// Mail sender for lead notifications (`None` when mail is not configured).
    pub notifier: Option<Notifier>,
}

/// Identifiers that fail to parse cannot exist, so they resolve to not-found.
fn parse_id(raw: &str, not_found: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(not_found.to_string()))
}

/// Health check endpoint.
///
/// Returns the service status and version.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy")),
    tag = "system"
)]
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/v1/leads
///
/// Validates a lead form submission, records it and emails sales plus the
/// submitter.
#[utoipa::path(
    post,
    path = "/api/v1/leads",
    request_body = LeadSubmission,
    responses(
        (status = 200, description = "Lead accepted and both emails sent", body = LeadSubmitResponse),
        (status = 400, description = "Missing fields or invalid email", body = ErrorBody),
        (status = 500, description = "Email delivery failed", body = ErrorBody)
    ),
    tag = "leads"
)]
pub async fn submit_lead(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LeadSubmission>,
) -> Result<Json<LeadSubmitResponse>, AppError> {
    tracing::info!("POST /leads");

    let service = LeadIntakeService::new(state.store.clone(), state.notifier.clone());
    let response = service.submit(payload).await?;

    Ok(Json(response))
}

/// GET /api/v1/leads
#[utoipa::path(
    get,
    path = "/api/v1/leads",
    responses(
        (status = 200, description = "Recorded leads, newest first", body = LeadListResponse),
        (status = 500, description = "Datastore failure", body = ErrorBody)
    ),
    tag = "leads"
)]
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LeadListResponse>, AppError> {
    let service = LeadIntakeService::new(state.store.clone(), None);
    let leads = service.list().await?;

    Ok(Json(LeadListResponse { leads }))
}

/// GET /api/v1/leads/:id/interactions
#[utoipa::path(
    get,
    path = "/api/v1/leads/{id}/interactions",
    params(("id" = String, Path, description = "Lead id")),
    responses(
        (status = 200, description = "Interactions, newest first", body = InteractionListResponse),
        (status = 404, description = "Lead not found", body = ErrorBody),
        (status = 500, description = "Datastore failure", body = ErrorBody)
    ),
    tag = "interactions"
)]
pub async fn list_lead_interactions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<InteractionListResponse>, AppError> {
    let lead_id = parse_id(&id, LEAD_NOT_FOUND_MESSAGE)?;

    let service = InteractionService::new(state.store.clone());
    let interactions = service.list_for_lead(lead_id).await?;

    Ok(Json(InteractionListResponse { interactions }))
}

/// POST /api/v1/interactions
#[utoipa::path(
    post,
    path = "/api/v1/interactions",
    request_body = InteractionPayload,
    responses(
        (status = 201, description = "Interaction logged", body = InteractionResponse),
        (status = 400, description = "Missing fields or malformed lead_id", body = ErrorBody),
        (status = 404, description = "Lead not found", body = ErrorBody),
        (status = 500, description = "Datastore failure", body = ErrorBody)
    ),
    tag = "interactions"
)]
pub async fn create_interaction(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<InteractionPayload>,
) -> Result<(StatusCode, Json<InteractionResponse>), AppError> {
    let service = InteractionService::new(state.store.clone());
    let interaction = service.create(payload).await?;

    Ok((StatusCode::CREATED, Json(InteractionResponse { interaction })))
}

/// GET /api/v1/customers
#[utoipa::path(
    get,
    path = "/api/v1/customers",
    responses(
        (status = 200, description = "Customers with contact counts, newest first", body = CustomerListResponse),
        (status = 500, description = "Datastore failure", body = ErrorBody)
    ),
    tag = "customers"
)]
pub async fn list_customers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CustomerListResponse>, AppError> {
    let service = CustomerService::new(state.store.clone());
    let customers = service.list().await?;

    Ok(Json(CustomerListResponse { customers }))
}

/// POST /api/v1/customers
#[utoipa::path(
    post,
    path = "/api/v1/customers",
    request_body = CustomerPayload,
    responses(
        (status = 201, description = "Customer created", body = CustomerResponse),
        (status = 400, description = "Missing name or duplicate email", body = ErrorBody),
        (status = 500, description = "Datastore failure", body = ErrorBody)
    ),
    tag = "customers"
)]
pub async fn create_customer(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CustomerPayload>,
) -> Result<(StatusCode, Json<CustomerResponse>), AppError> {
    tracing::info!("POST /customers - name: {:?}", payload.name);

    let service = CustomerService::new(state.store.clone());
    let customer = service.create(payload).await?;

    Ok((StatusCode::CREATED, Json(CustomerResponse { customer })))
}

/// POST /api/v1/customers/import
///
/// Accepts `{ "customers": [...] }` or a bare array. Rows are inserted one by
/// one; failures are reported per row.
#[utoipa::path(
    post,
    path = "/api/v1/customers/import",
    request_body = Vec<CustomerPayload>,
    responses(
        (status = 200, description = "Import finished (possibly with row errors)", body = ImportReport),
        (status = 400, description = "Empty import", body = ErrorBody)
    ),
    tag = "customers"
)]
pub async fn import_customers(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CustomerImportRequest>,
) -> Result<Json<ImportReport>, AppError> {
    let rows = payload.into_rows();
    tracing::info!("POST /customers/import - {} row(s)", rows.len());

    let service = CustomerService::new(state.store.clone());
    let report = service.import(rows).await?;

    Ok(Json(report))
}

/// GET /api/v1/customers/:id
#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}",
    params(("id" = String, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer with ordered contacts", body = CustomerDetail),
        (status = 404, description = "Customer not found", body = ErrorBody),
        (status = 500, description = "Datastore failure", body = ErrorBody)
    ),
    tag = "customers"
)]
pub async fn get_customer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CustomerDetail>, AppError> {
    tracing::info!("GET /customers/{}", id);
    let id = parse_id(&id, CUSTOMER_NOT_FOUND_MESSAGE)?;

    let service = CustomerService::new(state.store.clone());
    let detail = service.detail(id).await?;

    Ok(Json(detail))
}

/// POST /api/v1/customers/:id/contacts
#[utoipa::path(
    post,
    path = "/api/v1/customers/{id}/contacts",
    params(("id" = String, Path, description = "Customer id")),
    request_body = ContactPayload,
    responses(
        (status = 201, description = "Contact created", body = ContactResponse),
        (status = 400, description = "Missing name", body = ErrorBody),
        (status = 404, description = "Customer not found", body = ErrorBody),
        (status = 500, description = "Datastore failure", body = ErrorBody)
    ),
    tag = "customers"
)]
pub async fn create_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<ContactPayload>,
) -> Result<(StatusCode, Json<ContactResponse>), AppError> {
    let customer_id = parse_id(&id, CUSTOMER_NOT_FOUND_MESSAGE)?;

    let service = CustomerService::new(state.store.clone());
    let contact = service.add_contact(customer_id, payload).await?;

    Ok((StatusCode::CREATED, Json(ContactResponse { contact })))
}
