use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stockroom API",
        description = "Warehouse stock, request and linked-order management",
        version = env!("CARGO_PKG_VERSION"),
    ),
    paths(
        handlers::health::health,
        handlers::items::list_items,
        handlers::items::create_item,
        handlers::items::get_item,
        handlers::items::update_item,
        handlers::items::delete_item,
        handlers::requests::list_requests,
        handlers::requests::create_request,
        handlers::requests::get_request,
        handlers::requests::update_request_status,
        handlers::request_rows::list_request_rows,
        handlers::request_rows::get_group,
        handlers::request_rows::update_group_status,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        handlers::health::HealthResponse,
        handlers::items::ItemResponse,
        handlers::requests::RequestResponse,
        handlers::requests::CreateRequestPayload,
        handlers::requests::CreateRequestResult,
        handlers::requests::UpdateStatusPayload,
        handlers::request_rows::RequestRowResponse,
        handlers::request_rows::GroupResponse,
        crate::services::items::NewItem,
        crate::services::items::UpdateItem,
        crate::services::requests::GroupTarget,
    ))
)]
pub struct ApiDoc;

/// Swagger UI mounted at `/docs`, serving the generated document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
