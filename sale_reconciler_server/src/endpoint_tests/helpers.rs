use actix_web::{
    body::to_bytes,
    http::{header::ContentType, StatusCode},
    test,
    test::TestRequest,
    web,
    App,
};
use csr_common::Secret;
use log::*;
use mercadopago_tools::PaymentInfo;
use sale_reconciler::{
    db_types::{Money, NewOrder},
    events::EventProducers,
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seed::{seed_customer, seed_order, seed_product, seed_supplier},
    },
    ReconcilerApi,
    ReconcilerDatabase,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

use super::mocks::MockPaymentProvider;
use crate::{
    middleware::SignatureMiddlewareFactory,
    routes::{health, MercadopagoWebhookRoute},
    signature::{sign_notification, SignatureVerifier},
};

pub const SECRET: &str = "whsec-endpoint-tests";

pub fn verifier() -> SignatureVerifier {
    SignatureVerifier::new(Some(Secret::new(SECRET.to_string())))
}

pub async fn test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

pub async fn drop_db(mut db: SqliteDatabase) {
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    Sqlite::drop_database(db.url()).await.expect("Error dropping test database");
}

/// Order `o1` for `ana@example.com`: one unit of consignment product `p1` (stock 5, supplier `s1` at 60%) for 100.00.
pub async fn seed_consignment_order(db: &SqliteDatabase) {
    seed_customer(db, "c1", "Ana Souza", Some("ana@example.com")).await;
    seed_supplier(db, "s1", "Atelier Barro", 60.0).await;
    seed_product(db, "p1", "Ceramic vase", 10_000, 5, Some("s1")).await;
    let order = NewOrder::new("o1".into(), Some("c1".into())).with_line("p1".into(), 1, Money::from(10_000));
    seed_order(db, order).await;
}

pub fn payment_info(id: &str, status: &str, reference: &str) -> PaymentInfo {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "status": status,
        "transaction_amount": 100.0,
        "currency_id": "BRL",
        "date_created": "2024-05-02T14:15:00Z",
        "date_approved": "2024-05-02T14:15:03Z",
        "payer": { "email": "payer@example.com" },
        "external_reference": reference
    }))
    .expect("Invalid payment info")
}

pub fn notification_body(kind: &str, data_id: &str) -> String {
    serde_json::json!({
        "action": format!("{kind}.updated"),
        "api_version": "v1",
        "data": { "id": data_id },
        "date_created": "2024-05-02T14:15:05Z",
        "id": 112233445566u64,
        "live_mode": false,
        "type": kind,
        "user_id": "98765"
    })
    .to_string()
}

pub fn webhook_request(body: String) -> TestRequest {
    TestRequest::post().uri("/webhooks/mercadopago").insert_header(ContentType::json()).set_payload(body)
}

/// A webhook request signed with [`SECRET`].
pub fn signed_request(body: String, request_id: &str, data_id: &str) -> TestRequest {
    let signature = sign_notification(SECRET, request_id, data_id, 1_714_659_305).expect("Could not sign");
    webhook_request(body).insert_header(("x-signature", signature)).insert_header(("x-request-id", request_id))
}

/// Runs the request through an app wired the same way as the server. Errors raised by middleware are rendered into
/// responses, as the HTTP server would.
pub async fn send(
    db: &SqliteDatabase,
    provider: MockPaymentProvider,
    verifier: SignatureVerifier,
    req: TestRequest,
) -> (StatusCode, String) {
    let api = ReconcilerApi::new(db.clone(), EventProducers::default());
    let app = App::new().app_data(web::Data::new(api)).app_data(web::Data::new(provider)).service(health).service(
        web::scope("/webhooks")
            .wrap(SignatureMiddlewareFactory::new(verifier))
            .service(MercadopagoWebhookRoute::<SqliteDatabase, MockPaymentProvider>::new()),
    );
    let service = test::init_service(app).await;
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = to_bytes(res.into_body()).await.expect("Could not read error body");
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}
