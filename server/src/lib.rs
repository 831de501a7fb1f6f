use axum::{http::Method, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};

use app_state::SharedState;

pub mod app_state;
pub mod http_error;
pub mod routes;

/// All API routes plus the media files under the configured media URL.
pub fn app(shared_state: SharedState) -> Router {
    let config = shared_state.config.clone();
    let cors = CorsLayer::new()
        // allow `GET` and `POST` when accessing the resource
        .allow_methods([Method::GET, Method::POST])
        // allow requests from any origin
        .allow_origin(Any);
    let router = Router::new()
        .nest(
            "/api/asset",
            routes::asset::router(config.upload.max_file_size),
        )
        .nest("/api/rendition", routes::rendition::router())
        .nest("/api/branding", routes::branding::router());
    let media = ServeDir::new(&config.media.root);
    let media_url = config.media.url.trim_end_matches('/');
    let router = if media_url.is_empty() {
        router.fallback_service(media)
    } else if media_url.starts_with('/') {
        router.nest_service(media_url, media)
    } else {
        // served from elsewhere
        router
    };
    router
        .layer(
            ServiceBuilder::new()
                .set_x_request_id(MakeRequestUuid)
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().include_headers(true))
                        .on_response(DefaultOnResponse::new().include_headers(true)),
                )
                .propagate_x_request_id(),
        )
        .layer(cors)
        .with_state(shared_state)
}
