use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use super::requests::UpdateStatusPayload;
use super::{map_status_str, status_wire_name};
use crate::entities::request_row;
use crate::errors::ServiceError;
use crate::{ApiResponse, AppState, ListQuery, PaginatedResponse};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RequestRowResponse {
    pub request_row_id: i64,
    pub group_id: i32,
    pub position: i32,
    pub item_id: i64,
    pub unit_of_measurement: String,
    pub quantity: i32,
    pub price_without_vat: Decimal,
    pub comment: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupResponse {
    pub group_id: i32,
    pub members: Vec<RequestRowResponse>,
}

pub(crate) fn map_member(model: request_row::Model) -> RequestRowResponse {
    RequestRowResponse {
        request_row_id: model.request_row_id,
        group_id: model.group_id,
        position: model.position,
        item_id: model.item_id,
        unit_of_measurement: model.unit_of_measurement,
        quantity: model.quantity,
        price_without_vat: model.price_without_vat,
        comment: model.comment,
        status: status_wire_name(&model.status),
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

/// List request-row members across all groups
#[utoipa::path(
    get,
    path = "/api/v1/request-rows",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Members per page (default: 20)"),
    ),
    responses(
        (status = 200, description = "Members retrieved", body = ApiResponse<PaginatedResponse<RequestRowResponse>>),
    )
)]
pub async fn list_request_rows(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<RequestRowResponse>>>, ServiceError> {
    let (members, total) = state
        .services
        .request_rows
        .list_members(query.page, query.limit)
        .await?;

    let total_pages = (total + query.limit - 1) / query.limit;
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: members.into_iter().map(map_member).collect(),
        total,
        page: query.page,
        limit: query.limit,
        total_pages,
    })))
}

/// Fetch one group with all its members
#[utoipa::path(
    get,
    path = "/api/v1/request-rows/{group_id}",
    params(("group_id" = i32, Path, description = "Group id")),
    responses(
        (status = 200, description = "Group retrieved", body = ApiResponse<GroupResponse>),
        (status = 404, description = "Group not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<i32>,
) -> Result<Json<ApiResponse<GroupResponse>>, ServiceError> {
    let members = state.services.request_rows.get_group(group_id).await?;

    Ok(Json(ApiResponse::success(GroupResponse {
        group_id,
        members: members.into_iter().map(map_member).collect(),
    })))
}

/// Transition every member of a group, all-or-nothing
#[utoipa::path(
    post,
    path = "/api/v1/request-rows/{group_id}/status",
    params(("group_id" = i32, Path, description = "Group id")),
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Group status updated", body = ApiResponse<GroupResponse>),
        (status = 400, description = "Invalid or repeated status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Group not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock for a member", body = crate::errors::ErrorResponse),
    )
)]
pub async fn update_group_status(
    State(state): State<AppState>,
    Path(group_id): Path<i32>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<Json<ApiResponse<GroupResponse>>, ServiceError> {
    let target = map_status_str(&payload.status)?;
    let members = state
        .services
        .status
        .transition_group(group_id, target)
        .await?;

    Ok(Json(ApiResponse::success(GroupResponse {
        group_id,
        members: members.into_iter().map(map_member).collect(),
    })))
}
