use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::item;
use crate::errors::ServiceError;
use crate::services::items::{NewItem, UpdateItem};
use crate::{ApiResponse, AppState, PaginatedResponse};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ItemResponse {
    pub item_id: i64,
    pub item_name: String,
    pub item_group: String,
    pub unit_of_measurement: String,
    pub quantity: i32,
    pub price_without_vat: Decimal,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_person: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn map_item(model: item::Model) -> ItemResponse {
    ItemResponse {
        item_id: model.item_id,
        item_name: model.item_name,
        item_group: model.item_group,
        unit_of_measurement: model.unit_of_measurement,
        quantity: model.quantity,
        price_without_vat: model.price_without_vat,
        status: model.status,
        storage_location: model.storage_location,
        contact_person: model.contact_person,
        photo_path: model.photo_path,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ItemListQuery {
    #[serde(default = "crate::default_page")]
    pub page: u64,
    #[serde(default = "crate::default_limit")]
    pub limit: u64,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    /// Exact item name to look up instead of listing.
    pub name: Option<String>,
}

/// List items, or look one up by exact name
#[utoipa::path(
    get,
    path = "/api/v1/items",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
        ("sort_by" = Option<String>, Query, description = "Column to sort by"),
        ("sort_order" = Option<String>, Query, description = "asc or desc"),
        ("name" = Option<String>, Query, description = "Exact item name lookup"),
    ),
    responses(
        (status = 200, description = "Items retrieved", body = ApiResponse<PaginatedResponse<ItemResponse>>),
        (status = 404, description = "Named item not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ItemListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<ItemResponse>>>, ServiceError> {
    let svc = state.services.items.clone();

    if let Some(name) = query.name.as_deref() {
        let found = svc.find_by_name(name).await?;
        return Ok(Json(ApiResponse::success(PaginatedResponse {
            items: vec![map_item(found)],
            total: 1,
            page: 1,
            limit: query.limit,
            total_pages: 1,
        })));
    }

    let (items, total) = svc
        .list_items(
            query.page,
            query.limit,
            query.sort_by.as_deref(),
            query.sort_order.as_deref(),
        )
        .await?;

    let total_pages = (total + query.limit - 1) / query.limit;
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: items.into_iter().map(map_item).collect(),
        total,
        page: query.page,
        limit: query.limit,
        total_pages,
    })))
}

/// Create a new item
#[utoipa::path(
    post,
    path = "/api/v1/items",
    request_body = NewItem,
    responses(
        (status = 201, description = "Item created", body = ApiResponse<ItemResponse>),
        (status = 400, description = "Invalid item data", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate item name", body = crate::errors::ErrorResponse),
    )
)]
pub async fn create_item(
    State(state): State<AppState>,
    Json(payload): Json<NewItem>,
) -> Result<(StatusCode, Json<ApiResponse<ItemResponse>>), ServiceError> {
    let created = state.services.items.create_item(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(map_item(created))),
    ))
}

/// Fetch one item
#[utoipa::path(
    get,
    path = "/api/v1/items/{id}",
    params(("id" = i64, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item retrieved", body = ApiResponse<ItemResponse>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ItemResponse>>, ServiceError> {
    let found = state.services.items.get_item(id).await?;
    Ok(Json(ApiResponse::success(map_item(found))))
}

/// Update an item
#[utoipa::path(
    put,
    path = "/api/v1/items/{id}",
    params(("id" = i64, Path, description = "Item id")),
    request_body = UpdateItem,
    responses(
        (status = 200, description = "Item updated", body = ApiResponse<ItemResponse>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateItem>,
) -> Result<Json<ApiResponse<ItemResponse>>, ServiceError> {
    let updated = state.services.items.update_item(id, payload).await?;
    Ok(Json(ApiResponse::success(map_item(updated))))
}

/// Delete an item
#[utoipa::path(
    delete,
    path = "/api/v1/items/{id}",
    params(("id" = i64, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item deleted", body = ApiResponse<i64>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<i64>>, ServiceError> {
    state.services.items.delete_item(id).await?;
    Ok(Json(ApiResponse::success(id)))
}
