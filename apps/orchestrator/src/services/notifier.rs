// [apps/orchestrator/src/services/notifier.rs]
/*!
 * =================================================================
 * APARATO: NOTIFICATION RELAY SERVICE (V3.1 - OFF-CRITICAL-PATH)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: DESPACHO DESACOPLADO DE NOTIFICACIONES
 *
 * El motor jamás bloquea una transición de estado esperando al
 * sumidero: el relevo despacha en una tarea desprendida con reintento
 * acotado, y el fallo final solo deja rastro forense (at-least-once).
 * =================================================================
 */

use std::sync::Arc;

use tracing::{debug, error};
use uuid::Uuid;
use veritas_domain_protocols::{retry_with_backoff, NotificationPort, RetryPolicy};

/// Relevo de notificaciones fuera de la ruta crítica.
#[derive(Clone)]
pub struct NotificationRelay {
    notification_sink: Arc<dyn NotificationPort>,
    retry_policy: RetryPolicy,
}

impl NotificationRelay {
    pub fn new(notification_sink: Arc<dyn NotificationPort>, retry_policy: RetryPolicy) -> Self {
        Self { notification_sink, retry_policy }
    }

    /**
     * Despacha una notificación en una tarea desprendida.
     *
     * # Logic:
     * El llamador ya comprometió el evento causante en el journal; la
     * entrega ocurre después y jamás retrocede el estado ante fallo.
     */
    pub fn dispatch_detached(&self, subject_id: Uuid, kind: &'static str, payload: serde_json::Value) {
        let sink = Arc::clone(&self.notification_sink);
        let policy = self.retry_policy;

        tokio::spawn(async move {
            let verdict = retry_with_backoff(policy, kind, || {
                sink.deliver(subject_id, kind, payload.clone())
            })
            .await;

            match verdict {
                Ok(()) => debug!("📬 [NOTIFY_RELAY]: Kind [{}] delivered for [{}].", kind, subject_id),
                Err(delivery_fault) => error!(
                    "❌ [NOTIFY_RELAY]: Kind [{}] abandoned for [{}] after bounded retry: {}.",
                    kind, subject_id, delivery_fault
                ),
            }
        });
    }
}
