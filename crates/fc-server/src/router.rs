//! Axum router construction.
//!
//! Builds the full application router with all route groups, middleware
//! layers, and optional static file serving.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::context::AppContext;
use crate::middleware::auth::auth_middleware;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

/// Slack on top of the upload limit for multipart framing and text fields.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health_check,
        routes::upload::upload_file,
        routes::files::list_files,
        routes::files::search_files,
        routes::files::get_file_meta,
        routes::files::stream_file,
        routes::files::delete_file,
        routes::events::events_handler,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::upload::UploadForm,
        routes::files::FileResponse,
        routes::files::ListResponse,
        routes::files::SearchResponse,
    ))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = ctx
        .config
        .upload
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    // Every route here sees an `Extension<Identity>`; with auth disabled the
    // middleware injects the anonymous identity.
    let protected_routes = Router::new()
        .route(
            "/upload",
            post(routes::upload::upload_file).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/files", get(routes::files::list_files))
        .route("/files/search", get(routes::files::search_files))
        .route(
            "/files/{id}",
            get(routes::files::stream_file).delete(routes::files::delete_file),
        )
        .route("/files/{id}/meta", get(routes::files::get_file_meta))
        .route("/events", get(routes::events::events_handler))
        .layer(middleware::from_fn_with_state(ctx.clone(), auth_middleware));

    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .merge(protected_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {:?}", dir);
            let index_path = dir.join("index.html");
            app = app.fallback_service(
                tower_http::services::ServeDir::new(&dir)
                    .append_index_html_on_directories(true)
                    .not_found_service(tower_http::services::ServeFile::new(index_path)),
            );
        }
    }

    app
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use fc_core::config::Config;
    use fc_db::Catalog;
    use tower::ServiceExt;

    use crate::store::ArtifactStore;

    fn app(config: Config) -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppContext::new(
            Catalog::in_memory().unwrap(),
            ArtifactStore::new(dir.path()),
            config,
        );
        (dir, build_router(ctx, None))
    }

    #[tokio::test]
    async fn health_is_public() {
        let mut config = Config::default();
        config.auth.enabled = true;
        let (_dir, app) = app(config);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn files_require_identity_when_auth_enabled() {
        let mut config = Config::default();
        config.auth.enabled = true;
        let (_dir, app) = app(config);

        let response = app
            .oneshot(Request::get("/files").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn openapi_document_lists_routes() {
        let (_dir, app) = app(Config::default());
        let response = app
            .oneshot(
                Request::get("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(doc["paths"]["/files/{id}"].is_object());
        assert!(doc["paths"]["/upload"].is_object());
    }

    #[tokio::test]
    async fn bad_id_is_validation_error() {
        let (_dir, app) = app(Config::default());
        let response = app
            .oneshot(Request::get("/files/abc").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
