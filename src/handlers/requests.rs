use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::request_rows::{map_member, GroupResponse};
use super::{map_status_str, status_wire_name};
use crate::entities::request;
use crate::errors::ServiceError;
use crate::services::filter::FilterSelection;
use crate::services::requests::{CreatedRequest, GroupTarget, NewRequest};
use crate::{ApiResponse, AppState, PaginatedResponse};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RequestResponse {
    pub request_id: i64,
    pub employee_id: i64,
    pub item_id: i64,
    pub unit_of_measurement: String,
    pub quantity: i32,
    pub price_without_vat: Decimal,
    pub comment: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

pub(crate) fn map_request(model: request::Model) -> RequestResponse {
    RequestResponse {
        request_id: model.request_id,
        employee_id: model.employee_id,
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

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRequestPayload {
    pub employee_id: i64,
    pub item_id: i64,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[serde(default)]
    pub comment: String,
    /// Where the request lands; omitted means standalone.
    #[serde(default)]
    pub target: GroupTarget,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum CreateRequestResult {
    Standalone(RequestResponse),
    Grouped(GroupResponse),
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusPayload {
    /// `new`, `approved` or `rejected`
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RequestListQuery {
    #[serde(default = "crate::default_page")]
    pub page: u64,
    #[serde(default = "crate::default_limit")]
    pub limit: u64,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    /// Pre-encoded filter code, e.g. `p10-50;sn,a`. Overrides the explicit
    /// bound parameters below.
    pub filter: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_quantity: Option<i32>,
    pub max_quantity: Option<i32>,
    /// Comma-separated status flags, at most two.
    pub status: Option<String>,
}

fn selection_from_query(query: &RequestListQuery) -> Result<FilterSelection, ServiceError> {
    if let Some(code) = query.filter.as_deref() {
        return FilterSelection::parse(code);
    }

    let mut selection = FilterSelection::default();
    match (query.min_price, query.max_price) {
        (Some(min), Some(max)) => selection.price = Some((min, max)),
        (None, None) => {}
        _ => {
            return Err(ServiceError::InvalidInput(
                "Price filter needs both min_price and max_price".to_string(),
            ))
        }
    }
    match (query.min_quantity, query.max_quantity) {
        (Some(min), Some(max)) => selection.quantity = Some((min, max)),
        (None, None) => {}
        _ => {
            return Err(ServiceError::InvalidInput(
                "Quantity filter needs both min_quantity and max_quantity".to_string(),
            ))
        }
    }
    if let Some(flags) = query.status.as_deref() {
        for flag in flags.split(',').filter(|s| !s.is_empty()) {
            let status = map_status_str(flag)?;
            if !selection.statuses.contains(&status) {
                selection.statuses.push(status);
            }
        }
    }
    selection.validate()?;
    Ok(selection)
}

/// List requests with filtering and pagination
#[utoipa::path(
    get,
    path = "/api/v1/requests",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
        ("sort_by" = Option<String>, Query, description = "Column to sort by"),
        ("sort_order" = Option<String>, Query, description = "asc or desc"),
        ("filter" = Option<String>, Query, description = "Encoded filter code"),
        ("min_price" = Option<String>, Query, description = "Lower total-price bound"),
        ("max_price" = Option<String>, Query, description = "Upper total-price bound"),
        ("min_quantity" = Option<i32>, Query, description = "Lower quantity bound"),
        ("max_quantity" = Option<i32>, Query, description = "Upper quantity bound"),
        ("status" = Option<String>, Query, description = "Comma-separated status flags (max 2)"),
    ),
    responses(
        (status = 200, description = "Requests retrieved", body = ApiResponse<PaginatedResponse<RequestResponse>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse),
    )
)]
pub async fn list_requests(
    State(state): State<AppState>,
    Query(query): Query<RequestListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<RequestResponse>>>, ServiceError> {
    let selection = selection_from_query(&query)?;

    let (requests, total) = state
        .services
        .requests
        .list_requests(
            &selection,
            query.page,
            query.limit,
            query.sort_by.as_deref(),
            query.sort_order.as_deref(),
        )
        .await?;

    let total_pages = (total + query.limit - 1) / query.limit;
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: requests.into_iter().map(map_request).collect(),
        total,
        page: query.page,
        limit: query.limit,
        total_pages,
    })))
}

/// Create a request, standalone or grouped
#[utoipa::path(
    post,
    path = "/api/v1/requests",
    request_body = CreateRequestPayload,
    responses(
        (status = 201, description = "Request created", body = ApiResponse<CreateRequestResult>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item, request or group not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Grouping failed", body = crate::errors::ErrorResponse),
    )
)]
pub async fn create_request(
    State(state): State<AppState>,
    Json(payload): Json<CreateRequestPayload>,
) -> Result<(StatusCode, Json<ApiResponse<CreateRequestResult>>), ServiceError> {
    payload.validate()?;

    let new = NewRequest {
        employee_id: payload.employee_id,
        item_id: payload.item_id,
        quantity: payload.quantity,
        comment: payload.comment,
    };

    let created = state
        .services
        .requests
        .create_grouped_request(new, payload.target)
        .await?;

    let result = match created {
        CreatedRequest::Standalone(model) => CreateRequestResult::Standalone(map_request(model)),
        CreatedRequest::Grouped { group_id, members } => {
            CreateRequestResult::Grouped(GroupResponse {
                group_id,
                members: members.into_iter().map(map_member).collect(),
            })
        }
    };

    Ok((StatusCode::CREATED, Json(ApiResponse::success(result))))
}

/// Fetch one request
#[utoipa::path(
    get,
    path = "/api/v1/requests/{id}",
    params(("id" = i64, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request retrieved", body = ApiResponse<RequestResponse>),
        (status = 404, description = "Request not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<RequestResponse>>, ServiceError> {
    let found = state.services.requests.get_request(id).await?;
    Ok(Json(ApiResponse::success(map_request(found))))
}

/// Transition a standalone request's status
#[utoipa::path(
    post,
    path = "/api/v1/requests/{id}/status",
    params(("id" = i64, Path, description = "Request id")),
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<RequestResponse>),
        (status = 400, description = "Invalid or repeated status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Request not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
    )
)]
pub async fn update_request_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<Json<ApiResponse<RequestResponse>>, ServiceError> {
    let target = map_status_str(&payload.status)?;
    let updated = state.services.status.transition_request(id, target).await?;
    Ok(Json(ApiResponse::success(map_request(updated))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn base_query() -> RequestListQuery {
        RequestListQuery {
            page: 1,
            limit: 20,
            sort_by: None,
            sort_order: None,
            filter: None,
            min_price: None,
            max_price: None,
            min_quantity: None,
            max_quantity: None,
            status: None,
        }
    }

    #[test]
    fn encoded_filter_takes_precedence() {
        let mut query = base_query();
        query.filter = Some("p10-50;sn,a".to_string());
        query.min_price = Some(dec!(999));

        let selection = selection_from_query(&query).unwrap();
        assert_eq!(selection.price, Some((dec!(10), dec!(50))));
        assert_eq!(selection.statuses.len(), 2);
    }

    #[test]
    fn half_open_price_bounds_are_rejected() {
        let mut query = base_query();
        query.min_price = Some(dec!(10));
        assert_matches!(
            selection_from_query(&query),
            Err(ServiceError::InvalidInput(_))
        );
    }

    #[test]
    fn status_flags_accept_spelled_out_names() {
        let mut query = base_query();
        query.status = Some("new,approved".to_string());
        let selection = selection_from_query(&query).unwrap();
        assert_eq!(selection.statuses.len(), 2);
    }
}
