// [libs/infra/uplink/src/lib.rs]
/*!
 * =================================================================
 * APARATO: COLLABORATOR UPLINK ROOT (V2.1 - EXTERNAL SEAMS)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CLIENTES HTTP HACIA LOS COLABORADORES DEL MOTOR
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE ATTEMPT SEMANTICS: Cada cliente ejecuta UNA ráfaga HTTP con
 *    triaje semántico de estatus; la política de reintento con retroceso
 *    vive en el llamador (protocolos y orquestador), evitando el doble
 *    reintento anidado.
 * 2. HARDENED CLIENTS: Timeouts estratégicos y keep-alive para enlaces
 *    de larga distancia.
 * =================================================================
 */

/// Catálogo de fallos del enlace externo.
pub mod errors;

/// Sumidero de notificaciones de la plataforma.
pub mod notification;

/// Entrega de códigos de desafío (email / SMS).
pub mod code_delivery;

/// Cola de revisión documental humana.
pub mod review_queue;

pub use code_delivery::HttpCodeDelivery;
pub use errors::UplinkError;
pub use notification::HttpNotificationSink;
pub use review_queue::HttpReviewQueue;

use std::time::Duration;

/// Forja el cliente de red endurecido compartido por los adaptadores.
pub(crate) fn forge_network_client(user_agent_label: &str) -> Result<reqwest::Client, UplinkError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .user_agent(user_agent_label.to_string())
        .build()
        .map_err(|fault| UplinkError::ClientIgnition(fault.to_string()))
}
