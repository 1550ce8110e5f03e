mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;
use stockroom_api::entities::RequestStatus;
use stockroom_api::errors::ServiceError;
use stockroom_api::services::grouping;
use stockroom_api::services::requests::{CreatedRequest, GroupTarget, NewRequest};

use common::TestApp;

fn new_request(item_id: i64, quantity: i32) -> NewRequest {
    NewRequest {
        employee_id: 1,
        item_id,
        quantity,
        comment: String::new(),
    }
}

#[tokio::test]
async fn approving_a_request_decrements_stock() {
    let app = TestApp::new().await;
    let item = app.seed_item("Widget", 10, dec!(2.50)).await;
    let request_id = app.seed_request(item.item_id, 4).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/requests/{request_id}/status"),
            Some(json!({"status": "approved"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = common::json_body(response).await;
    assert_eq!(body["data"]["status"], "approved");

    assert_eq!(app.item_quantity(item.item_id).await, 6);
}

#[tokio::test]
async fn approving_beyond_stock_changes_nothing() {
    let app = TestApp::new().await;
    let item = app.seed_item("Widget", 3, dec!(1.00)).await;
    let request_id = app.seed_request(item.item_id, 5).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/requests/{request_id}/status"),
            Some(json!({"status": "approved"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(app.item_quantity(item.item_id).await, 3);
    let request = app
        .state
        .services
        .requests
        .get_request(request_id)
        .await
        .expect("request still exists");
    assert_eq!(request.status, RequestStatus::New.as_str());
}

#[tokio::test]
async fn re_approving_an_approved_request_is_rejected() {
    let app = TestApp::new().await;
    let item = app.seed_item("Widget", 10, dec!(1.00)).await;
    let request_id = app.seed_request(item.item_id, 4).await;

    let first = app
        .request(
            Method::POST,
            &format!("/api/v1/requests/{request_id}/status"),
            Some(json!({"status": "approved"})),
        )
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .request(
            Method::POST,
            &format!("/api/v1/requests/{request_id}/status"),
            Some(json!({"status": "approved"})),
        )
        .await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);

    // The guard kept the decrement from applying twice.
    assert_eq!(app.item_quantity(item.item_id).await, 6);
}

#[tokio::test]
async fn rejecting_has_no_stock_effect() {
    let app = TestApp::new().await;
    let item = app.seed_item("Widget", 10, dec!(1.00)).await;
    let request_id = app.seed_request(item.item_id, 4).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/requests/{request_id}/status"),
            Some(json!({"status": "rejected"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(app.item_quantity(item.item_id).await, 10);
}

#[tokio::test]
async fn reopening_does_not_restore_stock() {
    let app = TestApp::new().await;
    let item = app.seed_item("Widget", 10, dec!(1.00)).await;
    let request_id = app.seed_request(item.item_id, 4).await;

    for status in ["approved", "new", "approved"] {
        let response = app
            .request(
                Method::POST,
                &format!("/api/v1/requests/{request_id}/status"),
                Some(json!({"status": status})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Approval after a reopen decrements again; reopening never gives stock
    // back.
    assert_eq!(app.item_quantity(item.item_id).await, 2);
}

#[tokio::test]
async fn group_batch_approval_is_all_or_nothing() {
    let app = TestApp::new().await;
    let bolt = app.seed_item("Bolt", 10, dec!(1.00)).await;
    let nut = app.seed_item("Nut", 1, dec!(1.00)).await;
    let washer = app.seed_item("Washer", 10, dec!(1.00)).await;

    // Build a 3-member group: promote a standalone bolt request, append a
    // nut line (short on stock) and a washer line.
    let standalone = app.seed_request(bolt.item_id, 2).await;
    let created = app
        .state
        .services
        .requests
        .create_grouped_request(new_request(nut.item_id, 5), GroupTarget::ExistingRequest(standalone))
        .await
        .expect("promotion should succeed");
    let group_id = match created {
        CreatedRequest::Grouped { group_id, .. } => group_id,
        other => panic!("expected grouped outcome, got {other:?}"),
    };
    app.state
        .services
        .requests
        .create_grouped_request(new_request(washer.item_id, 1), GroupTarget::ExistingGroup(group_id))
        .await
        .expect("append should succeed");

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/request-rows/{group_id}/status"),
            Some(json!({"status": "approved"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Member 2 was short on stock, so nothing moved: not the statuses of the
    // other members, not any quantity.
    let members = app
        .state
        .services
        .request_rows
        .get_group(group_id)
        .await
        .expect("group exists");
    assert_eq!(members.len(), 3);
    for member in &members {
        assert_eq!(member.status, RequestStatus::New.as_str());
    }
    assert_eq!(app.item_quantity(bolt.item_id).await, 10);
    assert_eq!(app.item_quantity(nut.item_id).await, 1);
    assert_eq!(app.item_quantity(washer.item_id).await, 10);
}

#[tokio::test]
async fn group_batch_approval_decrements_every_member() {
    let app = TestApp::new().await;
    let bolt = app.seed_item("Bolt", 10, dec!(1.00)).await;
    let nut = app.seed_item("Nut", 8, dec!(1.00)).await;

    let standalone = app.seed_request(bolt.item_id, 2).await;
    let created = app
        .state
        .services
        .requests
        .create_grouped_request(new_request(nut.item_id, 5), GroupTarget::ExistingRequest(standalone))
        .await
        .expect("promotion should succeed");
    let group_id = match created {
        CreatedRequest::Grouped { group_id, .. } => group_id,
        other => panic!("expected grouped outcome, got {other:?}"),
    };

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/request-rows/{group_id}/status"),
            Some(json!({"status": "approved"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let members = app
        .state
        .services
        .request_rows
        .get_group(group_id)
        .await
        .expect("group exists");
    for member in &members {
        assert_eq!(member.status, RequestStatus::Approved.as_str());
    }
    assert_eq!(app.item_quantity(bolt.item_id).await, 8);
    assert_eq!(app.item_quantity(nut.item_id).await, 3);
}

#[tokio::test]
async fn allocator_hands_out_sequential_ids_and_positions() {
    let app = TestApp::new().await;
    let item = app.seed_item("Widget", 100, dec!(1.00)).await;

    // Four promotions leave four distinct groups behind.
    for _ in 0..4 {
        let standalone = app.seed_request(item.item_id, 1).await;
        grouping::promote_to_group(&*app.state.db, standalone)
            .await
            .expect("promotion should succeed");
    }

    let conn = &*app.state.db;
    assert_eq!(grouping::next_group_id(conn).await.unwrap(), 5);

    // Group 1 currently has its promoted member only; grow it to two and the
    // next position is 3.
    app.state
        .services
        .requests
        .create_grouped_request(new_request(item.item_id, 2), GroupTarget::ExistingGroup(1))
        .await
        .expect("append should succeed");
    assert_eq!(grouping::next_position(conn, 1).await.unwrap(), 3);
}

#[tokio::test]
async fn promotion_moves_standalone_request_into_new_group() {
    let app = TestApp::new().await;
    let widget = app.seed_item("Widget", 50, dec!(2.00)).await;

    let standalone = app.seed_request(widget.item_id, 5).await;
    let created = app
        .state
        .services
        .requests
        .create_grouped_request(new_request(widget.item_id, 3), GroupTarget::ExistingRequest(standalone))
        .await
        .expect("promotion should succeed");

    let (group_id, members) = match created {
        CreatedRequest::Grouped { group_id, members } => (group_id, members),
        other => panic!("expected grouped outcome, got {other:?}"),
    };

    assert_eq!(members.len(), 2);
    assert_eq!(members[0].position, 1);
    assert_eq!(members[0].quantity, 5);
    assert_eq!(members[1].position, 2);
    assert_eq!(members[1].quantity, 3);
    assert_eq!(members[1].price_without_vat, dec!(6.00));

    // The standalone request no longer exists anywhere but the group.
    let lookup = app.state.services.requests.get_request(standalone).await;
    assert!(matches!(lookup, Err(ServiceError::NotFound(_))));

    let stored = app
        .state
        .services
        .request_rows
        .get_group(group_id)
        .await
        .expect("group exists");
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn appending_to_a_missing_group_is_not_found() {
    let app = TestApp::new().await;
    let item = app.seed_item("Widget", 10, dec!(1.00)).await;

    let result = app
        .state
        .services
        .requests
        .create_grouped_request(new_request(item.item_id, 1), GroupTarget::ExistingGroup(99))
        .await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn transitioning_an_empty_group_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/request-rows/42/status",
            Some(json!({"status": "rejected"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
