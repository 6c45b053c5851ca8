use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Swagger UI at `/docs`, reading the document from `/api-docs/openapi.json`.
pub fn router(state: SharedState) -> Router<SharedState> {
    let ui: Router<SharedState> = SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into();

    ui.with_state(state)
}
