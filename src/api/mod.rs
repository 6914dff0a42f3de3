//! HTTP surface: WebSocket endpoint, system routes, and OpenAPI docs.
//!
//! | Path           | Purpose                         |
//! |----------------|---------------------------------|
//! | `GET /ws`      | WebSocket upgrade, joins relay  |
//! | `GET /health`  | Health check                    |
//! | `/swagger-ui`  | API docs (`swagger-ui` feature) |

pub mod handlers;

use axum::Router;
use axum::routing::get;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// Path of the WebSocket upgrade endpoint.
pub const WS_PATH: &str = "/ws";

/// OpenAPI document for the HTTP endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "peer-relay", description = "WebSocket message relay"),
    paths(handlers::system::health_handler),
    components(schemas(handlers::system::HealthResponse)),
    tags((name = "System", description = "Service status"))
)]
pub struct ApiDoc;

/// Builds the complete router: WebSocket endpoint plus system routes.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .route(WS_PATH, get(ws_handler))
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_documents_health() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
