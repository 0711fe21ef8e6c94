use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod documents;
pub mod health;
pub mod intake_emails;
pub mod tagging_rules;
pub mod tags;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(headers))
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let documents_routes = Router::new()
        .route(
            "/",
            get(documents::list_documents).post(documents::upload_document),
        )
        .route("/deleted", get(documents::list_deleted_documents))
        .route("/search", get(documents::search_documents))
        .route(
            "/:document_id",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route("/:document_id/file", get(documents::download_document))
        .route("/:document_id/restore", post(documents::restore_document))
        .route("/:document_id/tags", post(documents::assign_tag))
        .route(
            "/:document_id/tags/:tag_id",
            delete(documents::remove_tag),
        );

    let tags_routes = Router::new().route("/", get(tags::list_tags).post(tags::create_tag));

    let tagging_rules_routes = Router::new()
        .route(
            "/",
            get(tagging_rules::list_rules).post(tagging_rules::create_rule),
        )
        .route("/:rule_id", delete(tagging_rules::delete_rule));

    let intake_emails_routes = Router::new()
        .route(
            "/",
            get(intake_emails::list_intake_emails).post(intake_emails::create_intake_email),
        )
        .route(
            "/:intake_email_id",
            delete(intake_emails::delete_intake_email),
        );

    let organization_routes = Router::new()
        .nest("/documents", documents_routes)
        .nest("/tags", tags_routes)
        .nest("/tagging-rules", tagging_rules_routes)
        .nest("/intake-emails", intake_emails_routes);

    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .nest("/api/organizations/:organization_id", organization_routes)
        .route("/api/intake-emails/ingest", post(intake_emails::ingest_email))
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
