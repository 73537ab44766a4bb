use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use mercadopago_tools::MercadoPagoApi;
use sale_reconciler::{events::EventProducers, ReconcilerApi, SqliteDatabase};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    middleware::SignatureMiddlewareFactory,
    notifications::{create_event_handlers, ConfirmationMailer},
    routes::{health, MercadopagoWebhookRoute},
    signature::SignatureVerifier,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let mailer = match config.mailer.clone().map(ConfirmationMailer::new).transpose() {
        Ok(mailer) => mailer,
        Err(e) => {
            warn!("📧️ Could not create the confirmation mailer. Order confirmations will not be sent. {e}");
            None
        },
    };
    let handlers = create_event_handlers(config.event_buffer_size, mailer);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let provider = MercadoPagoApi::new(config.mercadopago.clone())
        .map_err(|e| ServerError::InitializeError(format!("Could not create the Mercado Pago client. {e}")))?;
    let srv = create_server_instance(config, db, provider, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    provider: MercadoPagoApi,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let verifier = SignatureVerifier::new(config.webhook_secret.clone());
    if !verifier.is_enabled() {
        warn!("🔐️ Webhook signature checks are DISABLED");
    }
    let srv = HttpServer::new(move || {
        let reconciler_api = ReconcilerApi::new(db.clone(), producers.clone());
        let webhook_scope = web::scope("/webhooks")
            .wrap(SignatureMiddlewareFactory::new(verifier.clone()))
            .service(MercadopagoWebhookRoute::<SqliteDatabase, MercadoPagoApi>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("csr::access_log"))
            .app_data(web::Data::new(reconciler_api))
            .app_data(web::Data::new(provider.clone()))
            .service(health)
            .service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("💻️ Listening on {}:{}", config.host, config.port);
    Ok(srv)
}
