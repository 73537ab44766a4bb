//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any long, non-cpu-bound operation (e.g. I/O, database operations,
//! etc.) should be expressed as futures or asynchronous functions.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use sale_reconciler::{ReconcilerApi, ReconcilerDatabase};

use crate::{
    data_objects::{JsonResponse, PaymentNotification},
    errors::ServerError,
    integrations::mercadopago::{classify_notification, Classification, PaymentInfoProvider},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(mercadopago_webhook => Post "/mercadopago" impl ReconcilerDatabase, PaymentInfoProvider);
/// Receives payment notifications from Mercado Pago.
///
/// The signature middleware has already authenticated the request by the time it gets here. Once the body has been
/// parsed, the response is always 200, including when classification or reconciliation fails. Those failures are
/// logged at error level.
pub async fn mercadopago_webhook<B, P>(
    body: web::Bytes,
    api: web::Data<ReconcilerApi<B>>,
    provider: web::Data<P>,
) -> Result<HttpResponse, ServerError>
where
    B: ReconcilerDatabase,
    P: PaymentInfoProvider,
{
    trace!("💻️ Received Mercado Pago webhook request");
    let notification = serde_json::from_slice::<PaymentNotification>(&body).map_err(|e| {
        warn!("💻️ Could not deserialize webhook payload. {e}");
        ServerError::CouldNotDeserializePayload(e.to_string())
    })?;
    debug!(
        "💻️ Notification {} ({}) for {}",
        notification.id.as_deref().unwrap_or("-"),
        notification.action.as_deref().unwrap_or(notification.notification_type.as_str()),
        notification.data.id
    );
    let event = match classify_notification(&notification, provider.get_ref()).await {
        Ok(Classification::Event(event)) => event,
        Ok(Classification::Ignored(reason)) => return Ok(HttpResponse::Ok().json(JsonResponse::success(reason))),
        Err(e) => {
            error!(
                "💻️ Could not classify notification for payment {}. {e} Retryable: {}",
                notification.data.id,
                e.is_retryable()
            );
            let msg = JsonResponse::failure(format!("Notification received but not processed. {e}"));
            return Ok(HttpResponse::Ok().json(msg));
        },
    };
    let response = match api.reconcile(event).await {
        Ok(outcome) => JsonResponse::success(outcome),
        Err(e) => {
            // Already logged by the reconciler
            JsonResponse::failure(format!("Notification received but not processed. {e}"))
        },
    };
    Ok(HttpResponse::Ok().json(response))
}
