// [libs/infra/uplink/src/notification.rs]
/*!
 * =================================================================
 * APARATO: NOTIFICATION SINK UPLINK (V2.2 - AT-LEAST-ONCE)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: DESPACHO DE NOTIFICACIONES DE LA PLATAFORMA
 *
 * El motor jamás bloquea transiciones de estado esperando la entrega:
 * el llamador despacha con reintento acotado fuera de la ruta crítica.
 * Un 409 (Conflict) del sumidero se interpreta como entrega previa
 * exitosa, preservando la semántica at-least-once.
 * =================================================================
 */

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use tracing::{debug, instrument, warn};
use uuid::Uuid;
use veritas_domain_protocols::{NotificationPort, PortFault};

use crate::errors::UplinkError;
use crate::forge_network_client;

/// Cliente del sumidero externo de notificaciones.
pub struct HttpNotificationSink {
    network_client: Client,
    sink_base_endpoint: String,
}

impl HttpNotificationSink {
    pub fn new(base_url: String) -> Result<Self, UplinkError> {
        Ok(Self {
            network_client: forge_network_client("Veritas-Notification-Uplink/V2.2")?,
            sink_base_endpoint: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Ráfaga única hacia el sumidero; el triaje decide la semántica.
    #[instrument(skip(self, payload))]
    pub async fn dispatch(
        &self,
        subject_id: Uuid,
        kind: &str,
        payload: &serde_json::Value,
    ) -> Result<(), UplinkError> {
        let target_url = format!("{}/api/v1/notifications", self.sink_base_endpoint);

        let response = self
            .network_client
            .post(&target_url)
            .json(&json!({
                "subject_id": subject_id,
                "kind": kind,
                "payload": payload,
            }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::CONFLICT {
            debug!("📬 [NOTIFY_ACK]: Kind [{}] accepted for [{}].", kind, subject_id);
            Ok(())
        } else {
            warn!("⚠️ [NOTIFY_REJECTION]: Sink returned {} for kind [{}].", status, kind);
            Err(UplinkError::Rejection { status: status.as_u16() })
        }
    }
}

#[async_trait]
impl NotificationPort for HttpNotificationSink {
    async fn deliver(
        &self,
        subject_id: Uuid,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<(), PortFault> {
        self.dispatch(subject_id, kind, &payload)
            .await
            .map_err(|uplink_fault| PortFault::Unavailable(uplink_fault.to_string()))
    }
}
