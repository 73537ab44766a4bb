use actix_web::{http::StatusCode, test::TestRequest};
use mercadopago_tools::MercadoPagoApiError;
use sale_reconciler::{
    db_types::{OrderId, OrderStatusType, ProductId},
    ReconcilerDatabase,
};

use super::{
    helpers::{
        drop_db,
        notification_body,
        payment_info,
        seed_consignment_order,
        send,
        signed_request,
        test_db,
        verifier,
        webhook_request,
    },
    mocks::MockPaymentProvider,
};
use crate::{data_objects::JsonResponse, signature::SignatureVerifier};

fn approving_provider() -> MockPaymentProvider {
    let mut provider = MockPaymentProvider::new();
    provider
        .expect_fetch_payment_info()
        .withf(|id| id == "123")
        .returning(|_| Ok(payment_info("123", "approved", "o1")));
    provider
}

#[actix_web::test]
async fn health_check() {
    let db = test_db().await;
    let (status, body) =
        send(&db, MockPaymentProvider::new(), verifier(), TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
    drop_db(db).await;
}

#[actix_web::test]
async fn invalid_signature_is_rejected() {
    let db = test_db().await;
    seed_consignment_order(&db).await;
    let mut provider = MockPaymentProvider::new();
    provider.expect_fetch_payment_info().never();
    // Signed for a different payment id than the one in the body
    let req = signed_request(notification_body("payment", "123"), "req-1", "999");
    let (status, body) = send(&db, provider, verifier(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Webhook signature is invalid or was not provided"}"#);
    let order = db.fetch_order(&OrderId::from("o1")).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::PendingPayment);
    assert!(order.external_payment_id.is_none());
    drop_db(db).await;
}

#[actix_web::test]
async fn missing_signature_is_rejected() {
    let db = test_db().await;
    let mut provider = MockPaymentProvider::new();
    provider.expect_fetch_payment_info().never();
    let req = webhook_request(notification_body("payment", "123")).insert_header(("x-request-id", "req-1"));
    let (status, _) = send(&db, provider, verifier(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    drop_db(db).await;
}

#[actix_web::test]
async fn data_id_can_come_from_the_query_string() {
    let db = test_db().await;
    let mut provider = MockPaymentProvider::new();
    provider.expect_fetch_payment_info().never();
    let req = signed_request(r#"{"type": "merchant_order", "data": {}}"#.to_string(), "req-1", "123")
        .uri("/webhooks/mercadopago?data.id=123&type=payment");
    let (status, body) = send(&db, provider, verifier(), req).await;
    // Passes the signature check, but the body itself is not a valid notification
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Payload deserialization error"), "{body}");
    drop_db(db).await;
}

#[actix_web::test]
async fn valid_signature_finalizes_the_order() {
    let db = test_db().await;
    seed_consignment_order(&db).await;
    let req = signed_request(notification_body("payment", "123"), "req-1", "123");
    let (status, body) = send(&db, approving_provider(), verifier(), req).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(response.success, "{body}");

    let order = db.fetch_order(&OrderId::from("o1")).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Finalized);
    assert_eq!(order.external_payment_id.as_ref().map(|p| p.as_str()), Some("123"));
    assert_eq!(order.external_payment_status.as_deref(), Some("approved"));
    let product = db.fetch_product(&ProductId::from("p1")).await.unwrap().unwrap();
    assert_eq!(product.stock_quantity, 4);
    assert!(product.sold);
    let credits = db.fetch_credits_for_order(&OrderId::from("o1")).await.unwrap();
    assert_eq!(credits.len(), 1);
    assert_eq!(credits[0].amount.to_string(), "60.00");
    drop_db(db).await;
}

#[actix_web::test]
async fn redelivery_is_acknowledged_without_side_effects() {
    let db = test_db().await;
    seed_consignment_order(&db).await;
    for request_id in ["req-1", "req-2"] {
        let req = signed_request(notification_body("payment", "123"), request_id, "123");
        let (status, _) = send(&db, approving_provider(), verifier(), req).await;
        assert_eq!(status, StatusCode::OK);
    }
    let product = db.fetch_product(&ProductId::from("p1")).await.unwrap().unwrap();
    assert_eq!(product.stock_quantity, 4);
    let credits = db.fetch_credits_for_order(&OrderId::from("o1")).await.unwrap();
    assert_eq!(credits.len(), 1);
    drop_db(db).await;
}

#[actix_web::test]
async fn no_secret_skips_the_signature_check() {
    let db = test_db().await;
    seed_consignment_order(&db).await;
    let req = webhook_request(notification_body("payment", "123"));
    let (status, _) = send(&db, approving_provider(), SignatureVerifier::new(None), req).await;
    assert_eq!(status, StatusCode::OK);
    let order = db.fetch_order(&OrderId::from("o1")).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Finalized);
    drop_db(db).await;
}

#[actix_web::test]
async fn other_notification_types_are_acknowledged() {
    let db = test_db().await;
    let mut provider = MockPaymentProvider::new();
    provider.expect_fetch_payment_info().never();
    let req = signed_request(notification_body("merchant_order", "mo-1"), "req-1", "mo-1");
    let (status, body) = send(&db, provider, verifier(), req).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(response.success);
    assert!(response.message.contains("merchant_order"), "{body}");
    drop_db(db).await;
}

#[actix_web::test]
async fn classification_failure_is_still_acknowledged() {
    let db = test_db().await;
    seed_consignment_order(&db).await;
    let mut provider = MockPaymentProvider::new();
    provider
        .expect_fetch_payment_info()
        .times(1)
        .returning(|_| Err(MercadoPagoApiError::Timeout("deadline elapsed".into())));
    let req = signed_request(notification_body("payment", "123"), "req-1", "123");
    let (status, body) = send(&db, provider, verifier(), req).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(!response.success);
    let order = db.fetch_order(&OrderId::from("o1")).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::PendingPayment);
    drop_db(db).await;
}

#[actix_web::test]
async fn reconciliation_failure_is_still_acknowledged() {
    let db = test_db().await;
    let mut provider = MockPaymentProvider::new();
    // Nothing was seeded, so the referenced order does not exist
    provider.expect_fetch_payment_info().returning(|_| Ok(payment_info("123", "approved", "o1")));
    let req = signed_request(notification_body("payment", "123"), "req-1", "123");
    let (status, body) = send(&db, provider, verifier(), req).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(!response.success);
    assert!(response.message.contains("o1"), "{body}");
    drop_db(db).await;
}

#[actix_web::test]
async fn unparsable_body_is_a_bad_request() {
    let db = test_db().await;
    let mut provider = MockPaymentProvider::new();
    provider.expect_fetch_payment_info().never();
    let (status, body) =
        send(&db, provider, SignatureVerifier::new(None), webhook_request("{not json".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Payload deserialization error"), "{body}");
    drop_db(db).await;
}

#[actix_web::test]
async fn unhandled_status_is_acknowledged() {
    let db = test_db().await;
    seed_consignment_order(&db).await;
    let mut provider = MockPaymentProvider::new();
    provider.expect_fetch_payment_info().returning(|_| Ok(payment_info("123", "in_mediation", "o1")));
    let req = signed_request(notification_body("payment", "123"), "req-1", "123");
    let (status, body) = send(&db, provider, verifier(), req).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(response.success, "{body}");
    let order = db.fetch_order(&OrderId::from("o1")).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::PendingPayment);
    assert!(order.external_payment_id.is_none());
    drop_db(db).await;
}

fn provider_reporting(status: &'static str) -> MockPaymentProvider {
    let mut provider = MockPaymentProvider::new();
    provider
        .expect_fetch_payment_info()
        .withf(|id| id == "pay123")
        .times(1)
        .returning(move |_| Ok(payment_info("pay123", status, "o1")));
    provider
}

#[actix_web::test]
async fn string_payment_ids_run_the_full_lifecycle() {
    let db = test_db().await;
    seed_consignment_order(&db).await;
    for (request_id, status) in [("req-1", "approved"), ("req-2", "approved"), ("req-3", "refunded")] {
        let req = signed_request(notification_body("payment", "pay123"), request_id, "pay123");
        let (code, body) = send(&db, provider_reporting(status), verifier(), req).await;
        assert_eq!(code, StatusCode::OK);
        let response: JsonResponse = serde_json::from_str(&body).unwrap();
        assert!(response.success, "{body}");
    }
    let order = db.fetch_order(&OrderId::from("o1")).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Refunded);
    assert_eq!(order.external_payment_id.as_ref().map(|p| p.as_str()), Some("pay123"));
    let product = db.fetch_product(&ProductId::from("p1")).await.unwrap().unwrap();
    assert_eq!(product.stock_quantity, 5);
    assert!(!product.sold);
    let credits = db.fetch_credits_for_order(&OrderId::from("o1")).await.unwrap();
    assert_eq!(credits.len(), 1);
    assert_eq!(credits[0].amount.to_string(), "60.00");
    drop_db(db).await;
}

#[actix_web::test]
async fn path_like_payment_ids_are_never_fetched() {
    let db = test_db().await;
    let mut provider = MockPaymentProvider::new();
    provider.expect_fetch_payment_info().never();
    let req = webhook_request(notification_body("payment", "../v1/x"));
    let (status, body) = send(&db, provider, SignatureVerifier::new(None), req).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(!response.success);
    assert!(response.message.contains("not a valid payment id"), "{body}");
    drop_db(db).await;
}
