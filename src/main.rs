use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Router,
};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

use kyc_lead_api::config::Config;
use kyc_lead_api::db::Database;
use kyc_lead_api::handlers::{self, AppState};
use kyc_lead_api::models;

/// OpenAPI document covering the public request/response models.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "KYC Lead API",
        description = "Lead intake, verification assignment and field-level reconciliation for loan KYC",
        version = "0.1.0"
    ),
    components(schemas(
        models::Address,
        models::AddressKind,
        models::AddressOwner,
        models::AdditionalDetails,
        models::CoApplicant,
        models::Lead,
        models::LeadStatus,
        models::VisitType,
        models::Agent,
        models::VerificationField,
        models::FieldPatch,
        models::VerificationSummary,
        models::AddressAssignment,
        models::AssignmentStatus,
        models::LeadPatch,
        models::AddressPatch,
        models::DetailsPatch,
        models::CreateLeadResponse,
        models::AssignAgentRequest,
        models::AssignTvtRequest,
        models::AssignmentResponse,
        models::SetFieldRequest,
    ))
)]
struct ApiDoc;

/// Serves the generated OpenAPI document as JSON.
async fn serve_openapi_spec() -> impl IntoResponse {
    match ApiDoc::openapi().to_json() {
        Ok(content) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            content,
        )
            .into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to render OpenAPI document",
        )
            .into_response(),
    }
}

/// Serves the Swagger UI HTML page, configured to load the OpenAPI document
/// served by `serve_openapi_spec`.
async fn serve_swagger_ui() -> impl IntoResponse {
    let html = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>KYC Lead API - Swagger UI</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/api-docs/openapi.json",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout"
            });
        };
    </script>
</body>
</html>
"#;
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kyc_lead_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize database connection pool
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    // Hydrated-lead cache: entries are invalidated on every write, the TTL
    // only bounds staleness if an invalidation is missed.
    let lead_cache = Cache::builder()
        .time_to_live(Duration::from_secs(config.lead_cache_ttl_secs))
        .max_capacity(10_000)
        .build();
    tracing::info!(
        "Lead cache initialized ({}s TTL, 10k capacity)",
        config.lead_cache_ttl_secs
    );

    // Build application state
    let app_state = Arc::new(AppState {
        db: db.pool.clone(),
        config: config.clone(),
        lead_cache,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        // API Documentation
        .route("/docs", get(serve_swagger_ui))
        .route("/api-docs/openapi.json", get(serve_openapi_spec))
        // Lead lifecycle
        .route("/api/v1/leads", post(handlers::create_lead))
        .route("/api/v1/leads", get(handlers::list_leads))
        .route("/api/v1/leads/:id", get(handlers::get_lead))
        .route("/api/v1/leads/:id", patch(handlers::update_lead))
        .route("/api/v1/leads/:id", delete(handlers::delete_lead))
        // Agent roster and address assignment
        .route("/api/v1/agents", get(handlers::list_agents))
        .route("/api/v1/leads/:id/assignment", get(handlers::get_assignment))
        .route(
            "/api/v1/leads/:id/assignment/agent",
            post(handlers::assign_agent),
        )
        .route(
            "/api/v1/leads/:id/assignment/tvt",
            post(handlers::assign_tvt),
        )
        // Field-level verification
        .route(
            "/api/v1/leads/:id/verification",
            get(handlers::expand_verification),
        )
        .route(
            "/api/v1/verification/set-field",
            post(handlers::set_verification_field),
        )
        .route(
            "/api/v1/leads/:id/verification/commit",
            post(handlers::commit_verification),
        )
        .layer(
            ServiceBuilder::new()
                // Request size limit: 5MB max payload (prevents memory exhaustion)
                .layer(RequestBodyLimitLayer::new(5 * 1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Health check bypasses rate limiting so platform probes never get 429s
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
