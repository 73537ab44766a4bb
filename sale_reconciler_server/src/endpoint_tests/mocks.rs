use mercadopago_tools::{MercadoPagoApiError, PaymentInfo};
use mockall::mock;

use crate::integrations::mercadopago::PaymentInfoProvider;

mock! {
    pub PaymentProvider {}
    impl PaymentInfoProvider for PaymentProvider {
        async fn fetch_payment_info(&self, payment_id: &str) -> Result<PaymentInfo, MercadoPagoApiError>;
    }
}
