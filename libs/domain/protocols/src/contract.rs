// [libs/domain/protocols/src/contract.rs]
/*!
 * =================================================================
 * APARATO: CHILD PROTOCOL CONTRACT (V4.0 - COMMON CAPABILITY SET)
 * CLASIFICACIÓN: DOMAIN CONTRACTS (ESTRATO L2)
 * RESPONSABILIDAD: SEÑALES, DESENLACES, CONTEXTO Y DESPACHO ESTÁTICO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CAPABILITY SET: Todo protocolo comparte el contrato (start, signal,
 *    cancel, outcome) a través de 'execute_method' y el buzón de señales.
 * 2. REPLY CHANNELS: Las señales que exigen respuesta síncrona portan su
 *    canal 'oneshot'; el protocolo responde sin bloquear su bucle.
 * 3. RESULT OVER EXCEPTIONS: Los desenlaces son valores explícitos;
 *    ningún fallo de saga viaja como pánico o excepción de control.
 * =================================================================
 */

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tracing::warn;
use uuid::Uuid;
use veritas_domain_models::{DenialReason, FailureReason, VerificationMethod};
use veritas_domain_scoring::catalog::{self, ProtocolFamily};

use crate::backoff::RetryPolicy;
use crate::ports::{
    CodeDeliveryPort, JournalPort, NotificationPort, ReviewQueuePort, TokenStorePort,
    VerifierDirectoryPort,
};
use crate::{attestation, code_challenge, human_review, platform_record, two_party};

/// Respuesta síncrona a una señal entrante.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalAck {
    Accepted,
    Rejected(SignalRejection),
}

/// Rechazo tipado de una señal; el gateway lo traduce al llamador.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalRejection {
    TokenUnknown,
    TokenExpired,
    VerifierDenied(DenialReason),
    /// Código errado; porta los intentos restantes.
    CodeMismatch { remaining_attempts: u32 },
    AttestorDenied,
    /// El protocolo no espera esta clase de señal en su estado actual.
    NotAwaiting,
}

/// Señal dirigida a una corrida de protocolo hijo.
#[derive(Debug)]
pub enum ProtocolSignal {
    CodeEntered {
        code: String,
        reply: oneshot::Sender<SignalAck>,
    },
    VerifierConfirmation {
        token_hex: String,
        verifier_id: Uuid,
        evidence: serde_json::Value,
        reply: oneshot::Sender<SignalAck>,
    },
    ReviewDecision {
        approved: bool,
        reason: Option<String>,
    },
    Attestation {
        attestor_id: Uuid,
        statement: String,
        reply: oneshot::Sender<SignalAck>,
    },
    /// Cancelación cooperativa emitida por el orquestador padre.
    Cancel,
}

/// Desenlace terminal único de una corrida de protocolo.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolOutcome {
    Completed {
        /// Referencia opaca de evidencia para la compleción.
        evidence_ref: String,
        /// Carga estructurada adicional (ids de verificadores, veredictos).
        data: serde_json::Value,
    },
    Failed(FailureReason),
    Cancelled,
}

/// Afinación operativa de los protocolos. Inyectada desde el bootstrap.
#[derive(Debug, Clone, Copy)]
pub struct ProtocolTuning {
    /// Vigencia del código de desafío desde su despacho.
    pub code_ttl_minutes: i64,
    /// Intentos de código permitidos antes del agotamiento.
    pub code_attempts: u32,
    /// Vigencia de los tokens QR de la saga presencial.
    pub token_ttl_hours: i64,
    /// Reintento de efectos colaterales de avance (entrega, encolado).
    pub side_effect_retry: RetryPolicy,
    /// Reintento de pasos de compensación de la saga.
    pub compensation_retry: RetryPolicy,
}

impl Default for ProtocolTuning {
    fn default() -> Self {
        Self {
            code_ttl_minutes: 30,
            code_attempts: 5,
            token_ttl_hours: 72,
            side_effect_retry: RetryPolicy::default(),
            compensation_retry: RetryPolicy::default(),
        }
    }
}

/// Manojo de puertos hacia los colaboradores externos.
#[derive(Clone)]
pub struct Collaborators {
    pub code_delivery: Arc<dyn CodeDeliveryPort>,
    pub review_queue: Arc<dyn ReviewQueuePort>,
    pub token_store: Arc<dyn TokenStorePort>,
    pub verifier_directory: Arc<dyn VerifierDirectoryPort>,
    pub journal: Arc<dyn JournalPort>,
    pub notifications: Arc<dyn NotificationPort>,
}

/// Contexto inmutable de una corrida de protocolo hijo.
#[derive(Clone)]
pub struct ProtocolContext {
    pub subject_id: Uuid,
    pub protocol_run_id: Uuid,
    pub method: VerificationMethod,
    pub deadline: DateTime<Utc>,
    pub collaborators: Collaborators,
    pub tuning: ProtocolTuning,
}

/// Despacho estático método → familia de protocolo.
///
/// La familia proviene de la tabla del catálogo; aquí solo se enruta la
/// ejecución hacia la máquina de estados correspondiente.
pub async fn execute_method(
    context: ProtocolContext,
    params: serde_json::Value,
    signals: mpsc::Receiver<ProtocolSignal>,
) -> ProtocolOutcome {
    match catalog::policy(context.method).family {
        ProtocolFamily::CodeChallenge => code_challenge::execute(context, params, signals).await,
        ProtocolFamily::TwoPartySaga => two_party::execute(context, signals).await,
        ProtocolFamily::HumanReview => human_review::execute(context, params, signals).await,
        ProtocolFamily::Attestation => attestation::execute(context, signals).await,
        ProtocolFamily::PlatformRecord => platform_record::execute(context, params).await,
    }
}

/// Responde una señal sin interrumpir el bucle del protocolo si el
/// llamador ya abandonó su espera.
pub(crate) fn respond(reply: oneshot::Sender<SignalAck>, ack: SignalAck) {
    if reply.send(ack).is_err() {
        warn!("📪 [PROTOCOL_REPLY]: Caller abandoned the signal reply channel.");
    }
}
