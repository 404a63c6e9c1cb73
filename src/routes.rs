use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{self, AppState};
use crate::models::*;

/// Largest accepted request body (bulk imports included).
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::submit_lead,
        handlers::list_leads,
        handlers::list_lead_interactions,
        handlers::create_interaction,
        handlers::list_customers,
        handlers::create_customer,
        handlers::import_customers,
        handlers::get_customer,
        handlers::create_contact,
    ),
    components(schemas(
        Customer,
        CustomerSummary,
        Contact,
        LeadReport,
        Interaction,
        LeadSubmission,
        LeadSubmitResponse,
        CustomerPayload,
        ContactPayload,
        InteractionPayload,
        ImportFailure,
        ImportRowError,
        ImportReport,
        CustomerListResponse,
        CustomerResponse,
        CustomerDetail,
        ContactResponse,
        LeadListResponse,
        InteractionResponse,
        InteractionListResponse,
        ErrorBody,
    )),
    tags(
        (name = "leads", description = "Lead intake and lead history"),
        (name = "customers", description = "Customers and their contacts"),
        (name = "interactions", description = "Touchpoints logged against leads"),
        (name = "system", description = "Liveness"),
    )
)]
pub struct ApiDoc;

/// JSON API routes, without state or middleware.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/v1/leads",
            post(handlers::submit_lead).get(handlers::list_leads),
        )
        .route(
            "/api/v1/leads/:id/interactions",
            get(handlers::list_lead_interactions),
        )
        .route("/api/v1/interactions", post(handlers::create_interaction))
        .route(
            "/api/v1/customers",
            get(handlers::list_customers).post(handlers::create_customer),
        )
        .route("/api/v1/customers/import", post(handlers::import_customers))
        .route("/api/v1/customers/:id", get(handlers::get_customer))
        .route(
            "/api/v1/customers/:id/contacts",
            post(handlers::create_contact),
        )
}

/// Builds the full application: API routes behind the body limit and the
/// optional per-IP rate limiter, plus health and docs routes that bypass
/// rate limiting.
pub fn app(state: Arc<AppState>) -> anyhow::Result<Router> {
    let mut api = api_routes();

    if let Some(rate_limit) = &state.config.rate_limit {
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(rate_limit.per_second)
                .burst_size(rate_limit.burst_size)
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .ok_or_else(|| anyhow::anyhow!("rate limit values must be greater than zero"))?,
        );
        api = api.layer(GovernorLayer {
            config: governor_conf,
        });
        tracing::info!(
            "Rate limiting enabled: {} req/s per IP, burst {}",
            rate_limit.per_second,
            rate_limit.burst_size
        );
    }

    // Json's own 2 MB cap would otherwise reject bodies below MAX_BODY_BYTES
    let api = api
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

    Ok(Router::new()
        .route("/health", get(handlers::health))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()))
}
