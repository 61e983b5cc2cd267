// [libs/infra/uplink/src/code_delivery.rs]
/*!
 * =================================================================
 * APARATO: CODE DELIVERY UPLINK (V2.1 - OUT-OF-BAND DISPATCH)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ENTREGA DE CÓDIGOS DE DESAFÍO (EMAIL / SMS)
 *
 * El código viaja una sola vez hacia el backend de entrega; el motor
 * retiene únicamente el hash salado. El backend decide el transporte
 * según el formato del destino (email vs E.164).
 * =================================================================
 */

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, instrument, warn};
use veritas_domain_protocols::{CodeDeliveryPort, PortFault};

use crate::errors::UplinkError;
use crate::forge_network_client;

/// Cliente del backend externo de entrega de códigos.
pub struct HttpCodeDelivery {
    network_client: Client,
    delivery_base_endpoint: String,
}

impl HttpCodeDelivery {
    pub fn new(base_url: String) -> Result<Self, UplinkError> {
        Ok(Self {
            network_client: forge_network_client("Veritas-CodeDelivery-Uplink/V2.1")?,
            delivery_base_endpoint: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[instrument(skip(self, code))]
    pub async fn dispatch(&self, target: &str, code: &str, ttl_minutes: i64) -> Result<(), UplinkError> {
        let target_url = format!("{}/api/v1/challenges/send", self.delivery_base_endpoint);

        let response = self
            .network_client
            .post(&target_url)
            .json(&json!({
                "target": target,
                "code": code,
                "ttl_minutes": ttl_minutes,
            }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!("📨 [DELIVERY_ACK]: Challenge accepted for [{}].", target);
            Ok(())
        } else {
            warn!("⚠️ [DELIVERY_REJECTION]: Backend returned {} for [{}].", status, target);
            Err(UplinkError::Rejection { status: status.as_u16() })
        }
    }
}

#[async_trait]
impl CodeDeliveryPort for HttpCodeDelivery {
    async fn send_code(&self, target: &str, code: &str, ttl_minutes: i64) -> Result<(), PortFault> {
        self.dispatch(target, code, ttl_minutes)
            .await
            .map_err(|uplink_fault| PortFault::Unavailable(uplink_fault.to_string()))
    }
}
