// [apps/orchestrator/src/bootstrap.rs]
/*!
 * =================================================================
 * APARATO: ENGINE BOOTSTRAP SETTINGS (V3.0 - ENVIRONMENT CAPTURE)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L1-APP)
 * RESPONSABILIDAD: CAPTURA SOBERANA DE CONFIGURACIÓN DEL ENTORNO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TOTAL DEFAULTS: Toda perilla de afinación porta un valor nominal;
 *    el motor enciende en un entorno vacío (salvo DATABASE_URL).
 * 2. SINGLE CAPTURE POINT: Ningún otro estrato lee variables de entorno.
 * =================================================================
 */

use veritas_domain_protocols::ProtocolTuning;

/// Configuración operativa del motor de verificación.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Eventos entre marcadores de checkpoint de la proyección.
    pub checkpoint_interval_events: u64,
    /// Ventana de la saga presencial (deadline global de la corrida).
    pub saga_deadline_hours: i64,
    /// Ventana de adjudicación humana de documentos.
    pub review_deadline_days: i64,
    /// Ventana de espera de una atestación.
    pub attestation_deadline_days: i64,
    /// Endpoint del sumidero externo de notificaciones.
    pub notification_endpoint: String,
    /// Endpoint del backend de entrega de códigos.
    pub code_delivery_endpoint: String,
    /// Endpoint de la cola externa de revisión documental.
    pub review_queue_endpoint: String,
    /// Afinación de los protocolos hijos.
    pub tuning: ProtocolTuning,
}

impl EngineSettings {
    /// Valores nominales del motor (también usados por el Proving Grounds).
    pub fn nominal() -> Self {
        Self {
            checkpoint_interval_events: 1000,
            saga_deadline_hours: 72,
            review_deadline_days: 30,
            attestation_deadline_days: 30,
            notification_endpoint: "http://127.0.0.1:8087".into(),
            code_delivery_endpoint: "http://127.0.0.1:8088".into(),
            review_queue_endpoint: "http://127.0.0.1:8089".into(),
            tuning: ProtocolTuning::default(),
        }
    }

    /// Hidrata la configuración desde el espacio de nombres del proceso.
    pub fn capture_from_environment() -> Self {
        let nominal = Self::nominal();

        Self {
            checkpoint_interval_events: read_numeric(
                "VERITAS_CHECKPOINT_INTERVAL",
                nominal.checkpoint_interval_events,
            ),
            saga_deadline_hours: read_numeric("VERITAS_SAGA_DEADLINE_HOURS", nominal.saga_deadline_hours),
            review_deadline_days: read_numeric("VERITAS_REVIEW_DEADLINE_DAYS", nominal.review_deadline_days),
            attestation_deadline_days: read_numeric(
                "VERITAS_ATTESTATION_DEADLINE_DAYS",
                nominal.attestation_deadline_days,
            ),
            notification_endpoint: std::env::var("VERITAS_NOTIFICATION_URL")
                .unwrap_or(nominal.notification_endpoint),
            code_delivery_endpoint: std::env::var("VERITAS_CODE_DELIVERY_URL")
                .unwrap_or(nominal.code_delivery_endpoint),
            review_queue_endpoint: std::env::var("VERITAS_REVIEW_QUEUE_URL")
                .unwrap_or(nominal.review_queue_endpoint),
            tuning: ProtocolTuning {
                code_ttl_minutes: read_numeric("VERITAS_CODE_TTL_MINUTES", 30),
                code_attempts: read_numeric("VERITAS_CODE_ATTEMPTS", 5),
                token_ttl_hours: read_numeric("VERITAS_TOKEN_TTL_HOURS", 72),
                ..ProtocolTuning::default()
            },
        }
    }
}

fn read_numeric<T: std::str::FromStr>(variable: &str, fallback: T) -> T {
    std::env::var(variable)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(fallback)
}
